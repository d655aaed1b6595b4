//! Story model

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{Collection, Index, Key, Record};
use crate::error::{Error, Result};

/// Prefix distinguishing client-generated draft ids from server ids.
pub const DRAFT_ID_PREFIX: &str = "draft_";

/// Maximum photo size accepted by the story API (1 MiB).
pub const MAX_PHOTO_BYTES: usize = 1024 * 1024;

/// Generate a new draft id, time-sortable via UUID v7.
#[must_use]
pub fn new_draft_id() -> String {
    format!("{DRAFT_ID_PREFIX}{}", Uuid::now_v7())
}

/// Whether an id was generated locally for an unsynced draft.
pub fn is_draft_id(id: &str) -> bool {
    id.starts_with(DRAFT_ID_PREFIX)
}

/// A validated latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// Validate ranges: latitude in [-90, 90], longitude in [-180, 180].
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(Error::Validation(format!(
                "latitude {lat} is outside [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(Error::Validation(format!(
                "longitude {lon} is outside [-180, 180]"
            )));
        }
        Ok(Self { lat, lon })
    }

    /// Build from optional parts; both must be present or both absent.
    pub fn from_parts(lat: Option<f64>, lon: Option<f64>) -> Result<Option<Self>> {
        match (lat, lon) {
            (Some(lat), Some(lon)) => Self::new(lat, lon).map(Some),
            (None, None) => Ok(None),
            _ => Err(Error::Validation(
                "lat and lon must be provided together".into(),
            )),
        }
    }
}

/// A pin for the story map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub story_id: String,
    pub title: String,
    pub position: Coordinates,
}

/// A story post, either mirrored from the server or drafted locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRecord {
    /// Server-assigned id, or a `draft_` id for local drafts
    pub id: String,
    pub author_name: String,
    #[serde(default)]
    pub author_id: Option<String>,
    pub description: String,
    /// Photo URL, or a base64 data URL for drafts
    pub photo_reference: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    /// When this copy was written to the local store (Unix ms)
    #[serde(default)]
    pub cached_at: Option<i64>,
    #[serde(default)]
    pub is_draft: bool,
}

impl StoryRecord {
    /// Validated coordinates, if the story carries any.
    ///
    /// Out-of-range values are logged and treated as absent.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match Coordinates::from_parts(self.lat, self.lon) {
            Ok(coordinates) => coordinates,
            Err(error) => {
                tracing::warn!("Story {} has unusable coordinates: {}", self.id, error);
                None
            }
        }
    }

    /// Map marker for this story, when it has valid coordinates.
    pub fn marker(&self) -> Option<MapMarker> {
        let position = self.coordinates()?;
        Some(MapMarker {
            story_id: self.id.clone(),
            title: self.author_name.clone(),
            position,
        })
    }

    /// First line of the description, truncated to `max_len` characters
    #[must_use]
    pub fn preview(&self, max_len: usize) -> String {
        self.description
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(max_len)
            .collect()
    }
}

impl Record for StoryRecord {
    const COLLECTION: Collection = Collection::Stories;

    fn key(&self) -> Option<Key> {
        Some(Key::from(self.id.as_str()))
    }

    fn index_value(&self, index: Index) -> Value {
        match index {
            Index::CreatedAt => Value::Integer(self.created_at),
            Index::AuthorId => self
                .author_id
                .clone()
                .map_or(Value::Null, Value::Text),
            _ => Value::Null,
        }
    }
}

/// Photo attached to a new story.
#[derive(Clone, PartialEq, Eq)]
pub struct Photo {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for Photo {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Photo")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A story submission, before the server has seen it.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStory {
    pub description: String,
    pub photo: Photo,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl NewStory {
    /// Reject input the server would refuse, before any network attempt.
    pub fn validate(&self) -> Result<Option<Coordinates>> {
        if self.description.trim().is_empty() {
            return Err(Error::Validation("description is required".into()));
        }
        if self.photo.bytes.is_empty() {
            return Err(Error::Validation("photo is required".into()));
        }
        if self.photo.bytes.len() > MAX_PHOTO_BYTES {
            return Err(Error::PayloadTooLarge {
                size: self.photo.bytes.len(),
                limit: MAX_PHOTO_BYTES,
            });
        }
        Coordinates::from_parts(self.lat, self.lon)
    }
}
