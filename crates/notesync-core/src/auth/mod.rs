//! Remote authentication: session types, the provider seam and its clients.

mod memory;
mod supabase;

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::unix_timestamp_now;

pub use memory::{MemoryAuthProvider, MemorySessionStore};
pub use supabase::{normalize_auth_url, SupabaseAuthClient};

const EXPIRY_SKEW_SECONDS: i64 = 60;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl AuthUser {
    /// Text before the `@` of the email, used as a fallback display name.
    #[must_use]
    pub fn email_local_part(&self) -> Option<&str> {
        self.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    ConfirmationRequired,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("{0}")]
    InvalidInput(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Api(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Where a signed-in session is kept between runs.
pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// Operations consumed from the remote auth service.
#[allow(async_fn_in_trait)]
pub trait AuthProvider {
    /// Current session, refreshed when expired; `None` when signed out.
    async fn restore_session(&self) -> AuthResult<Option<AuthSession>>;

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignUpOutcome>;

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession>;

    async fn sign_out(&self, session: &AuthSession) -> AuthResult<()>;

    /// Send a password recovery email.
    async fn request_password_reset(&self, email: &str) -> AuthResult<()>;
}

pub(crate) fn validate_email(email: &str) -> AuthResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AuthError::InvalidInput("Email is required".to_string()));
    }
    if !EMAIL_PATTERN.is_match(email) {
        return Err(AuthError::InvalidInput(
            "Enter a valid email address".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_credentials(email: &str, password: &str) -> AuthResult<()> {
    validate_email(email)?;
    if password.trim().is_empty() {
        return Err(AuthError::InvalidInput("Password is required".to_string()));
    }
    Ok(())
}
