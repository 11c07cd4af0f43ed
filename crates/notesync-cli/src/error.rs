use std::io;

use notesync_core::routes::Route;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] notesync_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No note content provided")]
    EmptyContent,
    #[error("Note title and content cannot be empty")]
    EmptyEditedContent,
    #[error("Note ID cannot be empty")]
    EmptyNoteId,
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("{0}")]
    InvalidAvatar(String),
    #[error("{}", redirect_message(.0))]
    Redirect(Route),
}

impl CliError {
    /// Missing or invalid backend configuration, from either layer.
    pub fn config_message(&self) -> Option<&str> {
        match self {
            Self::Config(message) | Self::Core(notesync_core::Error::Config(message)) => {
                Some(message.as_str())
            }
            _ => None,
        }
    }
}

/// User-facing text for a view that sent us elsewhere.
pub fn redirect_message(route: &Route) -> String {
    match route {
        Route::SignIn { message: Some(message) } => message.clone(),
        Route::SignIn { message: None } => {
            "Not signed in. Run `notesync auth login --email <email> --password <password>`."
                .to_string()
        }
        Route::Profile { .. } => format!("Your profile is at {route}"),
        other => format!("Continue at {other}"),
    }
}
