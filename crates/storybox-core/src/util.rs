//! Shared utility functions used across multiple modules.

use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use regex::Regex;

use crate::error::{Error, Result};

static DATA_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:([A-Za-z0-9.+/-]+);base64,([A-Za-z0-9+/=\s]*)$").expect("Invalid regex")
});

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Current Unix timestamp in milliseconds.
pub fn unix_millis_now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Parse an RFC 3339 timestamp into Unix milliseconds.
pub fn parse_timestamp_millis(value: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|date_time| date_time.timestamp_millis())
}

/// Encode bytes as a `data:` URL so binary content survives JSON storage.
pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", BASE64_STANDARD.encode(bytes))
}

/// Decode a `data:<mime>;base64,<payload>` URL into its mime type and bytes.
pub fn decode_data_url(value: &str) -> Result<(String, Vec<u8>)> {
    let captures = DATA_URL
        .captures(value.trim())
        .ok_or_else(|| Error::InvalidInput("not a base64 data URL".into()))?;
    let payload: String = captures[2].split_whitespace().collect();
    let bytes = BASE64_STANDARD
        .decode(payload)
        .map_err(|error| Error::InvalidInput(format!("invalid base64 payload: {error}")))?;
    Ok((captures[1].to_string(), bytes))
}
