//! Story API client

use serde::Deserialize;
use uuid::Uuid;

use super::envelope::{check_status, decode};
use super::{StoryList, StoryService};
use crate::error::{Error, Result};
use crate::fetch::{Fetch, FetchRequest, FilePart, MultipartBody, RequestBody};
use crate::models::{NewStory, StoryRecord, MAX_PHOTO_BYTES};
use crate::util::{is_http_url, parse_timestamp_millis, unix_millis_now};

/// `StoryService` over HTTP, against any [`Fetch`] transport.
#[derive(Debug, Clone)]
pub struct HttpStoryService<F> {
    fetcher: F,
    base_url: String,
}

impl<F: Fetch> HttpStoryService<F> {
    pub fn new(fetcher: F, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }

    fn stories_url(&self) -> String {
        format!("{}/stories", self.base_url)
    }

    fn resolve_photo_url(&self, photo_url: &str) -> String {
        if is_http_url(photo_url) || photo_url.starts_with("data:") {
            photo_url.to_string()
        } else {
            format!("{}/{}", self.base_url, photo_url.trim_start_matches('/'))
        }
    }

    fn into_record(&self, story: ApiStory) -> Result<StoryRecord> {
        let created_at = parse_timestamp_millis(&story.created_at).ok_or_else(|| {
            Error::MalformedResponse(format!(
                "story {} has an invalid createdAt '{}'",
                story.id, story.created_at
            ))
        })?;
        Ok(StoryRecord {
            photo_reference: self.resolve_photo_url(&story.photo_url),
            id: story.id,
            author_name: story.name,
            author_id: None,
            description: story.description,
            created_at,
            lat: story.lat,
            lon: story.lon,
            cached_at: None,
            is_draft: false,
        })
    }
}

fn require_token(token: Option<&str>) -> Result<&str> {
    token
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| Error::Unauthorized("authentication required".into()))
}

impl<F: Fetch> StoryService for HttpStoryService<F> {
    async fn fetch_stories_with_location(&self, token: Option<&str>) -> Result<StoryList> {
        let token = require_token(token)?;
        let request =
            FetchRequest::get(format!("{}?location=1", self.stories_url())).with_bearer(Some(token));

        let response = self.fetcher.fetch(&request).await?;
        check_status(&response)?;

        let body: StoryListBody = decode(&response)?;
        let stories = body
            .list_story
            .into_iter()
            .map(|story| self.into_record(story))
            .collect::<Result<Vec<_>>>()?;
        Ok(StoryList {
            stories,
            source: response.source,
        })
    }

    async fn post_story(&self, token: Option<&str>, story: &NewStory) -> Result<StoryRecord> {
        let coordinates = story.validate()?;
        let token = require_token(token)?;

        let mut fields = vec![("description".to_string(), story.description.trim().to_string())];
        if let Some(coordinates) = coordinates {
            fields.push(("lat".to_string(), coordinates.lat.to_string()));
            fields.push(("lon".to_string(), coordinates.lon.to_string()));
        }
        let body = MultipartBody {
            fields,
            file: Some(FilePart {
                field: "photo".into(),
                file_name: story.photo.file_name.clone(),
                mime_type: story.photo.mime_type.clone(),
                bytes: story.photo.bytes.clone(),
            }),
        };
        let request = FetchRequest::post(self.stories_url(), RequestBody::Multipart(body))
            .with_bearer(Some(token));

        let response = self.fetcher.fetch(&request).await?;
        if response.status == 413 {
            return Err(Error::PayloadTooLarge {
                size: story.photo.bytes.len(),
                limit: MAX_PHOTO_BYTES,
            });
        }
        check_status(&response)?;

        let ack: PostAck = decode(&response)?;
        if let Some(created) = ack.story {
            return self.into_record(created);
        }

        // The API acknowledges without echoing the story; the next refresh
        // replaces this record with the server's copy.
        tracing::debug!("Story accepted without an echoed record: {}", ack.message);
        Ok(StoryRecord {
            id: Uuid::now_v7().to_string(),
            author_name: String::new(),
            author_id: None,
            description: story.description.trim().to_string(),
            photo_reference: String::new(),
            created_at: unix_millis_now(),
            lat: coordinates.map(|coordinates| coordinates.lat),
            lon: coordinates.map(|coordinates| coordinates.lon),
            cached_at: None,
            is_draft: false,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiStory {
    id: String,
    name: String,
    description: String,
    photo_url: String,
    created_at: String,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoryListBody {
    list_story: Vec<ApiStory>,
}

#[derive(Debug, Deserialize)]
struct PostAck {
    #[serde(default)]
    message: String,
    #[serde(default)]
    story: Option<ApiStory>,
}
