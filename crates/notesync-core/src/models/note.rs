//! Note model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// A unique identifier for a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(Uuid);

impl NoteId {
    /// Create a new unique note ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NoteId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A row of the `notes` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Server-generated identifier
    pub id: NoteId,
    /// Owning user id
    pub user_id: String,
    pub title: String,
    pub content: String,
    /// Server-generated creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Note {
    /// Card colour derived from the title.
    #[must_use]
    pub fn card_color(&self) -> CardColor {
        card_color_for_title(&self.title)
    }
}

/// Title and content accepted for create/update.
///
/// Both fields are trimmed and must be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

impl NoteDraft {
    pub fn new(title: &str, content: &str) -> Result<Self> {
        let title = title.trim();
        let content = content.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("Note title cannot be empty".into()));
        }
        if content.is_empty() {
            return Err(Error::InvalidInput("Note content cannot be empty".into()));
        }
        Ok(Self {
            title: title.to_string(),
            content: content.to_string(),
        })
    }
}

/// Fixed palette used to tint note cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardColor {
    Purple,
    Teal,
    Blue,
    Indigo,
    Sky,
    Violet,
    Emerald,
    Red,
}

impl CardColor {
    /// Palette order; the index is what `card_color_for_title` selects.
    pub const PALETTE: [Self; 8] = [
        Self::Purple,
        Self::Teal,
        Self::Blue,
        Self::Indigo,
        Self::Sky,
        Self::Violet,
        Self::Emerald,
        Self::Red,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Purple => "purple",
            Self::Teal => "teal",
            Self::Blue => "blue",
            Self::Indigo => "indigo",
            Self::Sky => "sky",
            Self::Violet => "violet",
            Self::Emerald => "emerald",
            Self::Red => "red",
        }
    }
}

/// Palette index for a title: first UTF-16 code unit (0 when empty) modulo
/// the palette size.
#[must_use]
pub fn card_palette_index(title: &str) -> usize {
    let code = title.encode_utf16().next().unwrap_or(0);
    usize::from(code) % CardColor::PALETTE.len()
}

/// Card colour for a title.
#[must_use]
pub fn card_color_for_title(title: &str) -> CardColor {
    CardColor::PALETTE[card_palette_index(title)]
}
