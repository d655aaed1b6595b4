//! Decoding of the story API's response envelope.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::fetch::FetchResponse;
use crate::util::compact_text;

/// Fields every API response carries.
#[derive(Debug, Deserialize)]
struct Envelope {
    error: bool,
    #[serde(default)]
    message: String,
}

/// Best human-readable message from an error response
fn error_message(response: &FetchResponse) -> String {
    match serde_json::from_slice::<Envelope>(&response.body) {
        Ok(envelope) if !envelope.message.is_empty() => envelope.message,
        _ => compact_text(&response.text()),
    }
}

/// Map a non-success status onto the error taxonomy
pub(super) fn check_status(response: &FetchResponse) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    let message = error_message(response);
    Err(match response.status {
        400 => Error::Validation(message),
        401 | 403 => Error::Unauthorized(message),
        status => Error::Api(format!("HTTP {status}: {message}")),
    })
}

/// Decode a success body, refusing envelopes that flag an error
pub(super) fn decode<T: DeserializeOwned>(response: &FetchResponse) -> Result<T> {
    let envelope: Envelope = response.json()?;
    if envelope.error {
        return Err(Error::Api(if envelope.message.is_empty() {
            "request failed".to_string()
        } else {
            envelope.message
        }));
    }
    response.json()
}
