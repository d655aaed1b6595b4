//! Key/value setting model

use serde::{Deserialize, Serialize};

use crate::db::{Collection, Key, Record};

/// Setting holding the API access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Setting holding the signed-in user's id.
pub const CURRENT_USER_KEY: &str = "currentUserId";

/// Generic key/value pair, last write wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingRecord {
    pub key: String,
    pub value: serde_json::Value,
    /// Unix ms
    pub updated_at: i64,
}

impl Record for SettingRecord {
    const COLLECTION: Collection = Collection::Settings;

    fn key(&self) -> Option<Key> {
        Some(Key::from(self.key.as_str()))
    }
}
