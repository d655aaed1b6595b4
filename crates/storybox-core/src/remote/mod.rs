//! Remote collaborators: the story API, its auth endpoints and push registration.

mod auth;
mod envelope;
mod push;
mod story;

pub use auth::{AuthClient, LoginResult};
pub use push::HttpPushRegistrar;
pub use story::HttpStoryService;

use crate::error::Result;
use crate::fetch::ResponseSource;
use crate::models::{NewStory, StoryRecord};

/// Stories returned by the service, tagged with where the response came from
#[derive(Debug, Clone, PartialEq)]
pub struct StoryList {
    pub stories: Vec<StoryRecord>,
    pub source: ResponseSource,
}

impl StoryList {
    pub const fn live(stories: Vec<StoryRecord>) -> Self {
        Self {
            stories,
            source: ResponseSource::Network,
        }
    }

    pub const fn is_cached(&self) -> bool {
        matches!(self.source, ResponseSource::Cache { .. })
    }
}

/// Remote source of truth for stories.
///
/// Implementations own their timeouts.
#[allow(async_fn_in_trait)]
pub trait StoryService {
    /// Fetch every story that carries a location.
    ///
    /// A transport that answers from a local mirror reports it through
    /// [`StoryList::source`]. Fails with `Unauthorized` on a missing or rejected token and with
    /// `Network` on transport failure.
    async fn fetch_stories_with_location(&self, token: Option<&str>) -> Result<StoryList>;

    /// Publish a story.
    ///
    /// Fails with `Validation` or `PayloadTooLarge` before any network
    /// attempt when the submission is unacceptable.
    async fn post_story(&self, token: Option<&str>, story: &NewStory) -> Result<StoryRecord>;
}

impl<T: StoryService> StoryService for std::sync::Arc<T> {
    async fn fetch_stories_with_location(&self, token: Option<&str>) -> Result<StoryList> {
        (**self).fetch_stories_with_location(token).await
    }

    async fn post_story(&self, token: Option<&str>, story: &NewStory) -> Result<StoryRecord> {
        (**self).post_story(token, story).await
    }
}
