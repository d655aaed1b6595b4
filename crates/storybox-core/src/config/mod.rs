//! Client configuration.
//!
//! Values come from an optional JSON file, then environment overrides.
//! Only public endpoints and keys belong here; tokens live in the store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

pub const DEFAULT_API_BASE_URL: &str = "https://story-api.dicoding.dev/v1";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

pub const ENV_API_URL: &str = "STORYBOX_API_URL";
pub const ENV_VAPID_PUBLIC_KEY: &str = "STORYBOX_VAPID_PUBLIC_KEY";
pub const ENV_DB_PATH: &str = "STORYBOX_DB_PATH";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// URL-safe base64 application server key
    #[serde(default)]
    pub vapid_public_key: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            vapid_public_key: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            db_path: None,
        }
    }
}

impl ClientConfig {
    /// Parse a JSON config document and normalize it.
    pub fn parse(payload: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(payload)
            .map_err(|error| Error::Config(format!("invalid config JSON: {error}")))?;
        config.normalized()
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(payload) => Self::parse(&payload),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(error) => Err(Error::Config(format!(
                "failed to read {}: {error}",
                path.display()
            ))),
        }
    }

    /// Apply `STORYBOX_*` overrides read through `lookup`.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = normalize_text_option(lookup(ENV_API_URL)) {
            self.api_base_url = url;
        }
        if let Some(key) = normalize_text_option(lookup(ENV_VAPID_PUBLIC_KEY)) {
            self.vapid_public_key = Some(key);
        }
        if let Some(path) = normalize_text_option(lookup(ENV_DB_PATH)) {
            self.db_path = Some(PathBuf::from(path));
        }
        self.normalized()
    }

    /// Load `path` and apply process environment overrides.
    pub fn resolve(path: &Path) -> Result<Self> {
        Self::load_from_path(path)?.with_env_overrides(|name| std::env::var(name).ok())
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn normalized(mut self) -> Result<Self> {
        self.api_base_url = normalize_http_url(&self.api_base_url, "api_base_url")?;
        self.vapid_public_key = normalize_text_option(self.vapid_public_key.take());
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(self)
    }
}

fn normalize_http_url(raw: &str, field: &str) -> Result<String> {
    let value = normalize_text_option(Some(raw.to_string()))
        .ok_or_else(|| Error::Config(format!("config field '{field}' is required")))?;
    if is_http_url(&value) {
        Ok(value.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(format!(
            "config field '{field}' must include http:// or https://"
        )))
    }
}
