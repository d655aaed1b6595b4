//! Cached identity model

use serde::{Deserialize, Serialize};

use crate::db::{Collection, Key, Record};

/// Identity info cached on login, never deleted automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    /// When this copy was written to the local store (Unix ms)
    pub cached_at: i64,
}

impl Record for UserRecord {
    const COLLECTION: Collection = Collection::Users;

    fn key(&self) -> Option<Key> {
        Some(Key::from(self.user_id.as_str()))
    }
}
