//! Offline outbox action model

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

use crate::db::{Collection, Index, Key, Record};

/// Kind of mutation captured while offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    AddStory,
    /// Written by a newer client; kept pending, never replayed
    #[serde(other)]
    Unsupported,
}

impl ActionType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AddStory => "add_story",
            Self::Unsupported => "unsupported",
        }
    }
}

/// One pending offline mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedAction {
    /// Auto-incremented by the store; zero until enqueued
    pub id: i64,
    pub action_type: ActionType,
    /// Captured at enqueue time and never rewritten
    pub payload: serde_json::Value,
    /// Enqueue timestamp (Unix ms)
    pub timestamp: i64,
    pub synced: bool,
    #[serde(default)]
    pub synced_at: Option<i64>,
    /// Replay attempts made so far
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl Record for QueuedAction {
    const COLLECTION: Collection = Collection::OfflineActions;

    fn key(&self) -> Option<Key> {
        (self.id > 0).then_some(Key::Integer(self.id))
    }

    fn assign_generated_key(&mut self, key: i64) {
        self.id = key;
    }

    fn index_value(&self, index: Index) -> Value {
        match index {
            Index::Timestamp => Value::Integer(self.timestamp),
            Index::Synced => Value::Integer(i64::from(self.synced)),
            _ => Value::Null,
        }
    }
}

/// Payload of an [`ActionType::AddStory`] action.
///
/// The photo travels as a base64 data URL so it survives process restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddStoryPayload {
    pub draft_id: String,
    pub description: String,
    pub photo_data_url: String,
    pub photo_file_name: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    pub created_at: i64,
}
