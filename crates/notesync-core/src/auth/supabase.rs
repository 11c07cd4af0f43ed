//! GoTrue client for the hosted auth service.

use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::{
    validate_credentials, validate_email, AuthError, AuthProvider, AuthResult, AuthSession,
    AuthUser, SessionPersistence, SignUpOutcome,
};
use crate::config::ClientConfig;
use crate::util::{http_base_url, unix_timestamp_now};

/// Auth endpoints talk to GoTrue with the anon key; the user's token is only
/// sent on logout.
#[derive(Clone)]
pub struct SupabaseAuthClient<S: SessionPersistence> {
    auth_url: String,
    anon_key: String,
    client: Client,
    store: S,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct RecoverRequest<'a> {
    email: &'a str,
}

impl<S: SessionPersistence> SupabaseAuthClient<S> {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>, store: S) -> AuthResult<Self> {
        Self::with_auth_url(normalize_auth_url(url.as_ref())?, anon_key, store)
    }

    /// The project URL was validated by `ClientConfig`.
    pub fn from_config(config: &ClientConfig, store: S) -> AuthResult<Self> {
        Self::with_auth_url(config.auth_url(), config.supabase_anon_key.clone(), store)
    }

    fn with_auth_url(auth_url: String, anon_key: impl Into<String>, store: S) -> AuthResult<Self> {
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Supabase anon key must not be empty",
            ));
        }

        Ok(Self {
            auth_url,
            anon_key,
            client: Client::builder().build()?,
            store,
        })
    }

    /// Exchange a refresh token for a new session and persist it.
    pub async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Refresh token must not be empty",
            ));
        }

        self.grant("refresh_token", &RefreshGrant { refresh_token })
            .await
    }

    /// `POST /token?grant_type=…`; the response must carry a full session.
    async fn grant(&self, grant_type: &str, body: &impl Serialize) -> AuthResult<AuthSession> {
        let response = self
            .post("token", Some(grant_type), body)
            .await?
            .json::<TokenResponse>()
            .await?;
        let session = response.into_session()?.ok_or_else(|| {
            AuthError::Api(format!(
                "Auth response for grant '{grant_type}' did not include an active session"
            ))
        })?;
        self.store.save_session(&session)?;
        Ok(session)
    }

    async fn post(
        &self,
        endpoint: &str,
        grant_type: Option<&str>,
        body: &impl Serialize,
    ) -> AuthResult<Response> {
        let mut request = self
            .client
            .post(format!("{}/{endpoint}", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(body);
        if let Some(grant_type) = grant_type {
            request = request.query(&[("grant_type", grant_type)]);
        }
        ensure_success(request.send().await?, &[]).await
    }
}

impl<S: SessionPersistence> AuthProvider for SupabaseAuthClient<S> {
    async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        let Some(stored) = self.store.load_session()? else {
            return Ok(None);
        };
        if !stored.is_expired() {
            return Ok(Some(stored));
        }

        match self.refresh_session(&stored.refresh_token).await {
            Ok(refreshed) => {
                tracing::debug!(user_id = %refreshed.user.id, "Refreshed persisted session");
                Ok(Some(refreshed))
            }
            Err(error) => {
                tracing::warn!("Failed to refresh persisted session: {}", error);
                self.store.clear_session()?;
                Ok(None)
            }
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignUpOutcome> {
        validate_credentials(email, password)?;

        let credentials = Credentials {
            email: email.trim(),
            password,
        };
        let response = self
            .post("signup", None, &credentials)
            .await?
            .json::<TokenResponse>()
            .await?;
        let Some(session) = response.into_session()? else {
            return Ok(SignUpOutcome::ConfirmationRequired);
        };
        self.store.save_session(&session)?;
        Ok(SignUpOutcome::SignedIn(session))
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        validate_credentials(email, password)?;

        let credentials = Credentials {
            email: email.trim(),
            password,
        };
        self.grant("password", &credentials).await
    }

    async fn sign_out(&self, session: &AuthSession) -> AuthResult<()> {
        // Local state goes regardless of what the server says.
        self.store.clear_session()?;

        let response = self
            .client
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;
        // An already revoked token is as good as a successful logout.
        ensure_success(response, &[StatusCode::UNAUTHORIZED]).await?;
        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> AuthResult<()> {
        validate_email(email)?;

        self.post(
            "recover",
            None,
            &RecoverRequest {
                email: email.trim(),
            },
        )
        .await?;
        Ok(())
    }
}

async fn ensure_success(response: Response, tolerated: &[StatusCode]) -> AuthResult<Response> {
    let status = response.status();
    if status.is_success() || tolerated.contains(&status) {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AuthError::Api(parse_api_error(status, &body)))
}

/// Project URL or an explicit `/auth/v1` URL, normalized to the latter.
pub fn normalize_auth_url(url: &str) -> AuthResult<String> {
    let base = http_base_url(url).map_err(AuthError::InvalidConfiguration)?;
    if base.ends_with("/auth/v1") {
        Ok(base)
    } else {
        Ok(format!("{base}/auth/v1"))
    }
}

#[derive(Debug, Default, Deserialize)]
struct TokenFields {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
}

impl TokenFields {
    fn or(self, other: Self) -> Self {
        Self {
            access_token: self.access_token.or(other.access_token),
            refresh_token: self.refresh_token.or(other.refresh_token),
            expires_at: self.expires_at.or(other.expires_at),
            expires_in: self.expires_in.or(other.expires_in),
        }
    }

    fn is_empty(&self) -> bool {
        self.access_token.is_none()
            && self.refresh_token.is_none()
            && self.expires_at.is_none()
            && self.expires_in.is_none()
    }

    fn expiry(&self) -> Option<i64> {
        self.expires_at.or_else(|| {
            self.expires_in
                .map(|seconds| unix_timestamp_now().saturating_add(seconds))
        })
    }
}

/// Token and sign-up responses. Depending on the project settings the
/// session arrives at the top level, nested under `session`, or not at all
/// (sign-up awaiting email confirmation, with the user object at the top).
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(flatten)]
    tokens: TokenFields,
    user: Option<GoTrueUser>,
    session: Option<NestedSession>,
    id: Option<String>,
    email: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct NestedSession {
    #[serde(flatten)]
    tokens: TokenFields,
    user: Option<GoTrueUser>,
}

impl TokenResponse {
    fn into_session(self) -> AuthResult<Option<AuthSession>> {
        let (nested_tokens, nested_user) = self
            .session
            .map_or_else(Default::default, |nested| (nested.tokens, nested.user));
        let tokens = self.tokens.or(nested_tokens);
        let bare_user = self.id.map(|id| GoTrueUser {
            id,
            email: self.email,
            created_at: self.created_at,
        });
        let user = self.user.or(nested_user).or(bare_user).map(AuthUser::from);

        if tokens.is_empty() && user.is_some() {
            return Ok(None);
        }

        let expires_at = tokens.expiry();
        match (tokens.access_token, tokens.refresh_token, expires_at, user) {
            (Some(access_token), Some(refresh_token), Some(expires_at), Some(user)) => {
                Ok(Some(AuthSession {
                    access_token,
                    refresh_token,
                    expires_at,
                    user,
                }))
            }
            _ => Err(AuthError::Api(
                "Auth response did not include enough session fields".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl From<GoTrueUser> for AuthUser {
    fn from(user: GoTrueUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoTrueError {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl GoTrueError {
    fn text(self) -> Option<String> {
        self.message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    }
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    let code = status.as_u16();
    let text = serde_json::from_str::<GoTrueError>(body)
        .ok()
        .and_then(GoTrueError::text)
        .unwrap_or_else(|| body.trim().to_string());
    if text.is_empty() {
        format!("HTTP {code}")
    } else {
        format!("{text} ({code})")
    }
}
