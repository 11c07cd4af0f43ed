//! In-memory auth provider
//!
//! Behaves like the hosted service for a single process: accounts, email
//! confirmation and one persisted session. Will be destroyed on shutdown.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use super::{
    validate_credentials, validate_email, AuthError, AuthProvider, AuthResult, AuthSession,
    AuthUser, SessionPersistence, SignUpOutcome,
};
use crate::util::unix_timestamp_now;

const SESSION_LIFETIME_SECONDS: i64 = 3600;

/// Session persistence that keeps the session in process memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySessionStore {
    session: Arc<Mutex<Option<AuthSession>>>,
}

impl MemorySessionStore {
    fn guard(&self) -> AuthResult<MutexGuard<'_, Option<AuthSession>>> {
        self.session
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }
}

impl SessionPersistence for MemorySessionStore {
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        Ok(self.guard()?.clone())
    }

    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        *self.guard()? = Some(session.clone());
        Ok(())
    }

    fn clear_session(&self) -> AuthResult<()> {
        *self.guard()? = None;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Account {
    user: AuthUser,
    password: String,
    confirmed: bool,
}

#[derive(Debug, Default)]
struct MemoryAuthState {
    accounts: HashMap<String, Account>,
    reset_requests: Vec<String>,
    unavailable: bool,
}

/// An in-memory stand-in for the remote auth service.
#[derive(Clone, Debug)]
pub struct MemoryAuthProvider {
    state: Arc<Mutex<MemoryAuthState>>,
    store: MemorySessionStore,
    require_confirmation: bool,
}

impl MemoryAuthProvider {
    /// Sign-ups must be confirmed with `confirm_email` before signing in.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryAuthState::default())),
            store: MemorySessionStore::default(),
            require_confirmation: true,
        }
    }

    /// Sign-ups are confirmed immediately and return a session.
    pub fn auto_confirm() -> Self {
        Self {
            require_confirmation: false,
            ..Self::new()
        }
    }

    /// Mark the account for `email` as confirmed.
    pub fn confirm_email(&self, email: &str) -> AuthResult<()> {
        let mut state = self.lock()?;
        let account = state
            .accounts
            .get_mut(&normalize_email(email))
            .ok_or_else(|| AuthError::Api("User not found".to_string()))?;
        account.confirmed = true;
        Ok(())
    }

    /// Make every call fail as if the service were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) -> AuthResult<()> {
        self.lock()?.unavailable = unavailable;
        Ok(())
    }

    /// Emails that asked for a password reset, oldest first.
    pub fn reset_requests(&self) -> AuthResult<Vec<String>> {
        Ok(self.lock()?.reset_requests.clone())
    }

    /// Backdate the persisted session so the next restore refreshes it.
    pub fn expire_session(&self) -> AuthResult<()> {
        let Some(mut session) = self.store.load_session()? else {
            return Ok(());
        };
        session.expires_at = unix_timestamp_now() - 1;
        self.store.save_session(&session)
    }

    fn lock(&self) -> AuthResult<MutexGuard<'_, MemoryAuthState>> {
        self.state
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }

    fn ensure_available(state: &MemoryAuthState) -> AuthResult<()> {
        if state.unavailable {
            return Err(AuthError::Api("Service unavailable (503)".to_string()));
        }
        Ok(())
    }

    fn issue_session(user: &AuthUser) -> AuthSession {
        AuthSession {
            access_token: format!("access-{}", Uuid::now_v7()),
            refresh_token: format!("refresh-{}", Uuid::now_v7()),
            expires_at: unix_timestamp_now() + SESSION_LIFETIME_SECONDS,
            user: user.clone(),
        }
    }
}

impl Default for MemoryAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthProvider for MemoryAuthProvider {
    async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        Self::ensure_available(&*self.lock()?)?;
        let Some(stored) = self.store.load_session()? else {
            return Ok(None);
        };
        if !stored.is_expired() {
            return Ok(Some(stored));
        }

        let session = Self::issue_session(&stored.user);
        self.store.save_session(&session)?;
        Ok(Some(session))
    }

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignUpOutcome> {
        validate_credentials(email, password)?;
        let key = normalize_email(email);

        let user = {
            let mut state = self.lock()?;
            Self::ensure_available(&state)?;
            if state.accounts.contains_key(&key) {
                return Err(AuthError::Api("User already registered (422)".to_string()));
            }
            let user = AuthUser {
                id: Uuid::now_v7().to_string(),
                email: Some(key.clone()),
                created_at: Some(Utc::now()),
            };
            state.accounts.insert(
                key,
                Account {
                    user: user.clone(),
                    password: password.to_string(),
                    confirmed: !self.require_confirmation,
                },
            );
            user
        };

        if self.require_confirmation {
            return Ok(SignUpOutcome::ConfirmationRequired);
        }
        let session = Self::issue_session(&user);
        self.store.save_session(&session)?;
        Ok(SignUpOutcome::SignedIn(session))
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        validate_credentials(email, password)?;

        let user = {
            let state = self.lock()?;
            Self::ensure_available(&state)?;
            let account = state
                .accounts
                .get(&normalize_email(email))
                .filter(|account| account.password == password)
                .ok_or_else(|| AuthError::Api("Invalid login credentials (400)".to_string()))?;
            if !account.confirmed {
                return Err(AuthError::Api("Email not confirmed (400)".to_string()));
            }
            account.user.clone()
        };

        let session = Self::issue_session(&user);
        self.store.save_session(&session)?;
        Ok(session)
    }

    async fn sign_out(&self, _session: &AuthSession) -> AuthResult<()> {
        self.store.clear_session()?;
        Self::ensure_available(&*self.lock()?)
    }

    async fn request_password_reset(&self, email: &str) -> AuthResult<()> {
        validate_email(email)?;
        let mut state = self.lock()?;
        Self::ensure_available(&state)?;
        state.reset_requests.push(normalize_email(email));
        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_in_requires_confirmation() {
        let auth = MemoryAuthProvider::new();
        let outcome = auth.sign_up("a@example.com", "secret123").await.unwrap();
        assert_eq!(outcome, SignUpOutcome::ConfirmationRequired);

        let error = auth.sign_in("a@example.com", "secret123").await.unwrap_err();
        assert!(error.to_string().contains("Email not confirmed"));

        auth.confirm_email("a@example.com").unwrap();
        let session = auth.sign_in("a@example.com", "secret123").await.unwrap();
        assert_eq!(session.user.email.as_deref(), Some("a@example.com"));
        assert!(auth.restore_session().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let auth = MemoryAuthProvider::auto_confirm();
        auth.sign_up("a@example.com", "secret123").await.unwrap();
        let error = auth.sign_in("a@example.com", "wrong").await.unwrap_err();
        assert!(error.to_string().contains("Invalid login credentials"));
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_rejected() {
        let auth = MemoryAuthProvider::new();
        auth.sign_up("a@example.com", "secret123").await.unwrap();
        assert!(auth.sign_up("A@example.com", "secret123").await.is_err());
    }

    #[tokio::test]
    async fn sign_out_clears_persisted_session() {
        let auth = MemoryAuthProvider::auto_confirm();
        let SignUpOutcome::SignedIn(session) =
            auth.sign_up("a@example.com", "secret123").await.unwrap()
        else {
            panic!("auto-confirm should sign in");
        };
        auth.sign_out(&session).await.unwrap();
        assert!(auth.restore_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_session_is_refreshed_on_restore() {
        let auth = MemoryAuthProvider::auto_confirm();
        let SignUpOutcome::SignedIn(session) =
            auth.sign_up("a@example.com", "secret123").await.unwrap()
        else {
            panic!("auto-confirm should sign in");
        };
        auth.expire_session().unwrap();

        let restored = auth.restore_session().await.unwrap().unwrap();
        assert_eq!(restored.user, session.user);
        assert_ne!(restored.access_token, session.access_token);
        assert!(!restored.is_expired());
        assert_eq!(auth.restore_session().await.unwrap(), Some(restored));
    }
}
