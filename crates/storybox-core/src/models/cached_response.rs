//! Mirrored API response model

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

use crate::db::{Collection, Index, Key, Record};

/// Most recent successful response body for one request identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedResponse {
    /// Request identity, e.g. `GET https://host/v1/stories?location=1`
    pub request_key: String,
    #[serde(default)]
    pub content_type: Option<String>,
    pub body: serde_json::Value,
    /// Unix ms
    pub cached_at: i64,
}

impl Record for CachedResponse {
    const COLLECTION: Collection = Collection::CachedResponses;

    fn key(&self) -> Option<Key> {
        Some(Key::from(self.request_key.as_str()))
    }

    fn index_value(&self, index: Index) -> Value {
        match index {
            Index::CachedAt => Value::Integer(self.cached_at),
            _ => Value::Null,
        }
    }
}
