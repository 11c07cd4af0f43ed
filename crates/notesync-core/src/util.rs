//! Small helpers shared by the config, auth and remote modules.

use chrono::Utc;

/// Longest excerpt of a response body carried in an error message.
pub const ERROR_EXCERPT_CHARS: usize = 180;

/// Trimmed text, or `None` when missing or blank.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Validate a project base URL and strip trailing slashes.
///
/// The error is a user-facing reason, wrapped by the caller in its own
/// error type.
pub fn http_base_url(raw: &str) -> Result<String, &'static str> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err("Supabase URL must not be empty");
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err("Supabase URL must include http:// or https://");
    }
    Ok(trimmed.to_string())
}

/// Response body shortened for inclusion in an error.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(ERROR_EXCERPT_CHARS).collect()
}

pub fn unix_timestamp_now() -> i64 {
    Utc::now().timestamp()
}

/// Milliseconds since the epoch; used to name uploaded objects.
pub fn unix_timestamp_millis_now() -> i64 {
    Utc::now().timestamp_millis()
}
