//! Persistent CLI profile configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use notesync_core::config::{
    ClientConfig, ENV_AVATAR_BUCKET, ENV_SUPABASE_ANON_KEY, ENV_SUPABASE_URL,
};
use notesync_core::util::normalize_text_option;
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "cli-config.json";
const ENV_PROFILE: &str = "NOTESYNC_PROFILE";
const FALLBACK_PROFILE: &str = "default";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfilesConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, CliProfile>,
}

/// Backend settings for one named profile. Blank values count as unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfile {
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
    #[serde(default)]
    pub avatar_bucket: Option<String>,
}

/// A single field of [`CliProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSetting {
    SupabaseUrl,
    SupabaseAnonKey,
    AvatarBucket,
}

impl ProfileSetting {
    pub const ALL: [Self; 3] = [Self::SupabaseUrl, Self::SupabaseAnonKey, Self::AvatarBucket];

    /// Field name as written in the config file.
    pub const fn key(self) -> &'static str {
        match self {
            Self::SupabaseUrl => "supabase_url",
            Self::SupabaseAnonKey => "supabase_anon_key",
            Self::AvatarBucket => "avatar_bucket",
        }
    }

    /// Environment variable consulted by `config init`.
    pub const fn env_key(self) -> &'static str {
        match self {
            Self::SupabaseUrl => ENV_SUPABASE_URL,
            Self::SupabaseAnonKey => ENV_SUPABASE_ANON_KEY,
            Self::AvatarBucket => ENV_AVATAR_BUCKET,
        }
    }

    pub const fn is_required(self) -> bool {
        !matches!(self, Self::AvatarBucket)
    }
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> Result<PathBuf, String> {
    dirs::config_dir()
        .map(|dir| dir.join("notesync").join(CONFIG_FILE_NAME))
        .ok_or_else(|| "Failed to resolve CLI config directory".to_string())
}

pub fn normalize_profile_name(value: Option<&str>) -> Option<String> {
    normalize_text_option(value.map(ToString::to_string))
}

fn file_error(action: &str, path: &Path, error: impl std::fmt::Display) -> String {
    format!("Failed to {action} {}: {error}", path.display())
}

impl CliProfilesConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path()?)
    }

    /// A missing file is an empty configuration.
    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| file_error("read config at", path, error))?;
        let mut config: Self = serde_json::from_str(&raw)
            .map_err(|error| file_error("parse config at", path, error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path()?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|error| file_error("create config directory", parent, error))?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized).map_err(|error| file_error("write config at", path, error))
    }

    /// Explicit name, then `NOTESYNC_PROFILE`, then the active profile.
    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        self.resolve_profile_name_with_env(explicit, std::env::var(ENV_PROFILE).ok().as_deref())
    }

    fn resolve_profile_name_with_env(&self, explicit: Option<&str>, env: Option<&str>) -> String {
        [explicit, env, self.active_profile.as_deref()]
            .into_iter()
            .find_map(normalize_profile_name)
            .unwrap_or_else(|| FALLBACK_PROFILE.to_string())
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn profile_mut_or_default(&mut self, name: &str) -> &mut CliProfile {
        self.profiles.entry(name.to_string()).or_default()
    }

    fn normalize(&mut self) {
        self.active_profile = normalize_profile_name(self.active_profile.as_deref());
        for profile in self.profiles.values_mut() {
            profile.normalize();
        }
    }
}

impl CliProfile {
    fn slot_mut(&mut self, setting: ProfileSetting) -> &mut Option<String> {
        match setting {
            ProfileSetting::SupabaseUrl => &mut self.supabase_url,
            ProfileSetting::SupabaseAnonKey => &mut self.supabase_anon_key,
            ProfileSetting::AvatarBucket => &mut self.avatar_bucket,
        }
    }

    /// Trimmed value, `None` when unset or blank.
    pub fn get(&self, setting: ProfileSetting) -> Option<&str> {
        let value = match setting {
            ProfileSetting::SupabaseUrl => self.supabase_url.as_deref(),
            ProfileSetting::SupabaseAnonKey => self.supabase_anon_key.as_deref(),
            ProfileSetting::AvatarBucket => self.avatar_bucket.as_deref(),
        };
        value
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn set(&mut self, setting: ProfileSetting, value: Option<String>) {
        *self.slot_mut(setting) = normalize_text_option(value);
    }

    /// Client configuration, when both URL and key are set.
    pub fn client_config(&self) -> notesync_core::Result<Option<ClientConfig>> {
        let (Some(url), Some(key)) = (
            self.get(ProfileSetting::SupabaseUrl),
            self.get(ProfileSetting::SupabaseAnonKey),
        ) else {
            return Ok(None);
        };
        let bucket = self.get(ProfileSetting::AvatarBucket).map(ToString::to_string);
        ClientConfig::new(url, key, bucket).map(Some)
    }

    /// Names of required fields that are still unset.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        ProfileSetting::ALL
            .into_iter()
            .filter(|setting| setting.is_required() && self.get(*setting).is_none())
            .map(ProfileSetting::key)
            .collect()
    }

    fn normalize(&mut self) {
        for setting in ProfileSetting::ALL {
            let value = self.slot_mut(setting).take();
            self.set(setting, value);
        }
    }
}
