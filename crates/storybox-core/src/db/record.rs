//! Typed records stored in the durable store

use std::fmt;

use rusqlite::types::{ToSql, ToSqlOutput, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::schema::{Collection, Index};

/// Primary key of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Text(String),
    Integer(i64),
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for Key {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => f.write_str(value),
            Self::Integer(value) => write!(f, "{value}"),
        }
    }
}

impl ToSql for Key {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Text(value) => value.to_sql(),
            Self::Integer(value) => value.to_sql(),
        }
    }
}

/// A value persisted in one collection.
///
/// Records are stored as JSON; index columns are filled from
/// [`Record::index_value`] on every write.
pub trait Record: Serialize + DeserializeOwned + Clone {
    const COLLECTION: Collection;

    /// Primary key, or `None` when the store should generate one
    fn key(&self) -> Option<Key>;

    /// Receive the key generated by an auto-increment collection
    fn assign_generated_key(&mut self, _key: i64) {}

    /// Value of a secondary index column
    fn index_value(&self, _index: Index) -> Value {
        Value::Null
    }
}
