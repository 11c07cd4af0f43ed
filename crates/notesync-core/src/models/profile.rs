//! Profile model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of the `profiles` table, one per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Same value as the owning user's id
    pub id: String,
    /// Display name; empty until the user sets one
    #[serde(default, deserialize_with = "null_as_empty")]
    pub full_name: String,
    /// Public URL of the current avatar
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// The row inserted on a user's first profile visit.
    #[must_use]
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            id: user_id.into(),
            full_name: String::new(),
            avatar_url: None,
            updated_at: Utc::now(),
        }
    }
}

/// Subset of the profile shown in the navigation bar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub full_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl From<&Profile> for ProfileSummary {
    fn from(profile: &Profile) -> Self {
        Self {
            full_name: profile.full_name.clone(),
            avatar_url: profile.avatar_url.clone(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
