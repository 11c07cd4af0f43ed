//! Client configuration for the hosted backend.
//!
//! Provides `ClientConfig`, the public endpoint and anon key needed to reach
//! the auth, row and object services. Secret credentials must never be stored
//! here: the anon key is safe to ship and row access is enforced server-side.

use std::env;

use serde::{Deserialize, Serialize};

use crate::util::{http_base_url, normalize_text_option};
use crate::{Error, Result};

pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_AVATAR_BUCKET: &str = "NOTESYNC_AVATAR_BUCKET";

/// Bucket holding profile avatars unless configured otherwise.
pub const DEFAULT_AVATAR_BUCKET: &str = "profile-images";

/// Endpoints and public key for the hosted backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Project base URL without a trailing slash.
    pub supabase_url: String,
    /// Public anon key sent as `apikey` on every request.
    pub supabase_anon_key: String,
    /// Object storage bucket for avatar uploads.
    #[serde(default = "default_avatar_bucket")]
    pub avatar_bucket: String,
}

fn default_avatar_bucket() -> String {
    DEFAULT_AVATAR_BUCKET.to_string()
}

impl ClientConfig {
    /// Build a validated configuration.
    pub fn new(
        supabase_url: impl AsRef<str>,
        supabase_anon_key: impl AsRef<str>,
        avatar_bucket: Option<String>,
    ) -> Result<Self> {
        let supabase_url = normalize_base_url(supabase_url.as_ref())?;
        let supabase_anon_key = supabase_anon_key.as_ref().trim().to_string();
        if supabase_anon_key.is_empty() {
            return Err(Error::Config(
                "Supabase anon key must not be empty".to_string(),
            ));
        }
        let avatar_bucket = normalize_text_option(avatar_bucket)
            .map(|bucket| bucket.trim_matches('/').to_string())
            .filter(|bucket| !bucket.is_empty())
            .unwrap_or_else(default_avatar_bucket);

        Ok(Self {
            supabase_url,
            supabase_anon_key,
            avatar_bucket,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Returns `Ok(None)` when neither the URL nor the key is set.
    /// Returns an error when only a partial configuration is provided.
    pub fn from_env() -> Result<Option<Self>> {
        parse_config(|key| env::var(key).ok())
    }

    /// GoTrue endpoint.
    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.supabase_url)
    }

    /// PostgREST endpoint.
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.supabase_url)
    }

    /// Storage API endpoint.
    pub fn storage_url(&self) -> String {
        format!("{}/storage/v1", self.supabase_url)
    }
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<ClientConfig>> {
    let url = normalize_text_option(lookup(ENV_SUPABASE_URL));
    let anon_key = normalize_text_option(lookup(ENV_SUPABASE_ANON_KEY));
    let bucket = normalize_text_option(lookup(ENV_AVATAR_BUCKET));

    match (url, anon_key) {
        (None, None) => Ok(None),
        (Some(url), Some(anon_key)) => ClientConfig::new(url, anon_key, bucket).map(Some),
        (Some(_), None) => Err(Error::Config(format!(
            "configuration is incomplete. Missing: {ENV_SUPABASE_ANON_KEY}"
        ))),
        (None, Some(_)) => Err(Error::Config(format!(
            "configuration is incomplete. Missing: {ENV_SUPABASE_URL}"
        ))),
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    http_base_url(raw).map_err(|reason| Error::Config(reason.to_string()))
}
