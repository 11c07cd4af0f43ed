//! Keychain-backed session persistence for CLI profiles.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

use notesync_core::auth::{AuthError, AuthResult, AuthSession, SessionPersistence};
use notesync_core::auth::SupabaseAuthClient;
use notesync_core::config::ClientConfig;

/// Auth client persisting its session in the OS keychain.
pub type CliAuthClient = SupabaseAuthClient<SessionStore>;

/// Serialized session for one CLI profile, keyed by `supabase_session:{profile}`.
#[derive(Clone, Debug)]
pub struct SessionStore {
    account: String,
}

impl SessionStore {
    pub fn new(profile_name: &str) -> Self {
        Self {
            account: format!("supabase_session:{profile_name}"),
        }
    }
}

impl SessionPersistence for SessionStore {
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        secret::read(&self.account)?
            .map(|raw| serde_json::from_str(&raw).map_err(AuthError::from))
            .transpose()
    }

    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        secret::write(&self.account, &serde_json::to_string(session)?)
    }

    fn clear_session(&self) -> AuthResult<()> {
        secret::remove(&self.account)
    }
}

#[cfg(not(test))]
mod secret {
    use keyring::Entry;
    use notesync_core::auth::{AuthError, AuthResult};

    const SERVICE: &str = "notesync-cli";

    fn keychain_error(error: &keyring::Error) -> AuthError {
        AuthError::SecureStorage(error.to_string())
    }

    fn entry(account: &str) -> AuthResult<Entry> {
        Entry::new(SERVICE, account).map_err(|error| keychain_error(&error))
    }

    pub fn read(account: &str) -> AuthResult<Option<String>> {
        match entry(account)?.get_password() {
            Ok(raw) => Ok(Some(raw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(keychain_error(&error)),
        }
    }

    pub fn write(account: &str, raw: &str) -> AuthResult<()> {
        entry(account)?
            .set_password(raw)
            .map_err(|error| keychain_error(&error))
    }

    pub fn remove(account: &str) -> AuthResult<()> {
        match entry(account)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(keychain_error(&error)),
        }
    }
}


pub fn auth_client_for_profile(profile_name: &str, config: &ClientConfig) -> AuthResult<CliAuthClient> {
    SupabaseAuthClient::from_config(config, SessionStore::new(profile_name))
}

pub fn clear_stored_session(profile_name: &str) -> AuthResult<()> {
    SessionStore::new(profile_name).clear_session()
}
