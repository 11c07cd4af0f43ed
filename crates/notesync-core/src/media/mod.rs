//! Avatar image validation and object naming.

use std::path::Path;

use thiserror::Error;

use crate::{Error, Result};

/// MIME types accepted for avatars.
pub const ALLOWED_IMAGE_TYPES: [&str; 6] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
    "image/bmp",
];

/// Largest accepted avatar, inclusive.
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Why an avatar file was refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRejection {
    #[error("File must be a valid image (JPEG, PNG, GIF, etc.)")]
    UnsupportedType,

    #[error("Image size must be less than 5MB")]
    TooLarge,
}

impl From<ImageRejection> for Error {
    fn from(rejection: ImageRejection) -> Self {
        Self::InvalidInput(rejection.to_string())
    }
}

/// A file picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarUpload {
    /// Original file name, used for its extension.
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl AvatarUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a local file, guessing its MIME type from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                Error::InvalidInput(format!("Unsupported file name: {}", path.display()))
            })?
            .to_string();
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self::new(file_name, content_type, bytes))
    }

    pub const fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Check type then size.
pub fn validate_image(file: &AvatarUpload) -> std::result::Result<(), ImageRejection> {
    let content_type = file.content_type.trim().to_ascii_lowercase();
    if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
        return Err(ImageRejection::UnsupportedType);
    }
    if file.size() > MAX_AVATAR_BYTES {
        return Err(ImageRejection::TooLarge);
    }
    Ok(())
}

/// `avatars/{user_id}/{timestamp_ms}.{ext}`
///
/// The extension is the text after the last dot of the original name. Names
/// without one fall back to an extension for the MIME type.
pub fn avatar_object_path(user_id: &str, file: &AvatarUpload, timestamp_ms: i64) -> String {
    format!("avatars/{user_id}/{timestamp_ms}.{}", file_extension(file))
}

fn file_extension(file: &AvatarUpload) -> String {
    if let Some((_, ext)) = file.file_name.rsplit_once('.') {
        if !ext.is_empty() {
            return ext.to_string();
        }
    }
    mime_guess::get_mime_extensions_str(&file.content_type)
        .and_then(|extensions| extensions.first())
        .map_or_else(|| "bin".to_string(), ToString::to_string)
}
