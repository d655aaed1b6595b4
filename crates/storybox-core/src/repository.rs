//! Story reads and writes with offline fallback.
//!
//! Reads prefer the live service and mirror what they get; when the network
//! is unreachable the mirror is served. Writes made while offline (or that
//! fail in transit) become drafts plus an outbox action, committed together.

use crate::connectivity::Connectivity;
use crate::db::{Collection, Index, Store, TransactionMode};
use crate::error::{Error, Result};
use crate::models::{
    new_draft_id, ActionType, AddStoryPayload, MapMarker, NewStory, QueuedAction, StoryRecord,
    UserRecord,
};
use crate::outbox::Outbox;
use crate::outcome::BestEffort;
use crate::remote::StoryService;
use crate::session::Session;
use crate::util::{encode_data_url, unix_millis_now};

/// Author shown on stories posted without a cached identity
pub const ANONYMOUS_AUTHOR: &str = "You";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    Live,
    /// Served from the mirror because the network was unreachable
    Cached,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoryFeed {
    /// Newest first, drafts included
    pub stories: Vec<StoryRecord>,
    pub source: FeedSource,
    /// Outcome of mirroring a live result
    pub mirror: BestEffort,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PostOutcome {
    Published(StoryRecord),
    /// Saved locally; will sync when connectivity returns
    SavedOffline {
        draft: StoryRecord,
        action: QueuedAction,
    },
}

impl PostOutcome {
    pub const fn story(&self) -> &StoryRecord {
        match self {
            Self::Published(story) | Self::SavedOffline { draft: story, .. } => story,
        }
    }

    pub const fn is_offline(&self) -> bool {
        matches!(self, Self::SavedOffline { .. })
    }
}

/// Stamp a server-acknowledged story with the local author when the server
/// did not echo one.
pub(crate) fn fill_author(story: &mut StoryRecord, user: Option<&UserRecord>) {
    if story.author_name.is_empty() {
        story.author_name = user.map_or_else(|| ANONYMOUS_AUTHOR.to_string(), |user| user.name.clone());
    }
    if story.author_id.is_none() {
        story.author_id = user.map(|user| user.user_id.clone());
    }
}

#[derive(Debug)]
pub struct StoryRepository<S> {
    store: Store,
    outbox: Outbox,
    session: Session,
    service: S,
    connectivity: Connectivity,
}

impl<S: StoryService> StoryRepository<S> {
    pub fn new(store: Store, service: S, connectivity: Connectivity) -> Self {
        Self {
            outbox: Outbox::new(store.clone()),
            session: Session::new(store.clone()),
            store,
            service,
            connectivity,
        }
    }

    pub const fn service(&self) -> &S {
        &self.service
    }

    /// Refresh from the service, falling back to the mirror while offline.
    ///
    /// A response the transport answered from its own cache is never
    /// mirrored back: it may predate stories stored since. Transport
    /// failures fall back only when the client believes it is offline, and
    /// an empty mirror surfaces them as `Offline`. `Unauthorized` is never
    /// masked by cached data.
    pub async fn fetch_stories(&self) -> Result<StoryFeed> {
        let token = self.session.access_token().await?;
        match self.service.fetch_stories_with_location(token.as_deref()).await {
            Ok(list) if list.is_cached() => {
                tracing::info!("Story list answered from cache, keeping local mirror");
                let mut stories = self.stories(None).await?;
                if stories.is_empty() {
                    stories = newest_first(list.stories);
                }
                Ok(StoryFeed {
                    stories,
                    source: FeedSource::Cached,
                    mirror: BestEffort::Skipped,
                })
            }
            Ok(list) => {
                let mirror = BestEffort::absorb(
                    "Failed to mirror stories",
                    self.replace_mirror(&list.stories).await,
                );
                let stories = if mirror.is_ok() {
                    self.stories(None).await?
                } else {
                    newest_first(list.stories)
                };
                Ok(StoryFeed {
                    stories,
                    source: FeedSource::Live,
                    mirror,
                })
            }
            Err(error) if error.is_network() && !self.connectivity.is_online() => {
                let cached = self.stories(None).await?;
                if cached.is_empty() {
                    return Err(match error {
                        Error::Network(reason) => Error::Offline(reason),
                        other => other,
                    });
                }
                tracing::warn!("Offline, serving {} cached stories: {}", cached.len(), error);
                Ok(StoryFeed {
                    stories: cached,
                    source: FeedSource::Cached,
                    mirror: BestEffort::Skipped,
                })
            }
            Err(error) => Err(error),
        }
    }

    /// Replace every non-draft story with the server's list
    async fn replace_mirror(&self, stories: &[StoryRecord]) -> Result<()> {
        let cached_at = unix_millis_now();
        let mut tx = self
            .store
            .transaction(&[Collection::Stories], TransactionMode::ReadWrite)
            .await?;
        let existing: Vec<StoryRecord> = tx.get_all()?;
        for stale in existing
            .iter()
            .filter(|story| !story.is_draft && !stories.iter().any(|fresh| fresh.id == story.id))
        {
            tx.delete(Collection::Stories, &stale.id)?;
        }
        for story in stories {
            let mut story = story.clone();
            story.cached_at = Some(cached_at);
            story.is_draft = false;
            tx.put(&story)?;
        }
        tx.commit()?;
        tracing::debug!("Mirrored {} stories", stories.len());
        Ok(())
    }

    /// Stored stories, newest first
    pub async fn stories(&self, limit: Option<usize>) -> Result<Vec<StoryRecord>> {
        let mut stories: Vec<StoryRecord> = self.store.get_all_by_index(Index::CreatedAt).await?;
        stories.reverse();
        if let Some(limit) = limit {
            stories.truncate(limit);
        }
        Ok(stories)
    }

    pub async fn story(&self, id: &str) -> Result<Option<StoryRecord>> {
        self.store.get(id).await
    }

    /// Drafts waiting for their outbox action to sync, oldest first
    pub async fn drafts(&self) -> Result<Vec<StoryRecord>> {
        let stories: Vec<StoryRecord> = self.store.get_all_by_index(Index::CreatedAt).await?;
        Ok(stories.into_iter().filter(|story| story.is_draft).collect())
    }

    /// Delete a stored story. Deleting a draft also withdraws its queued post.
    pub async fn delete_story(&self, id: &str) -> Result<bool> {
        let mut tx = self
            .store
            .transaction(
                &[Collection::Stories, Collection::OfflineActions],
                TransactionMode::ReadWrite,
            )
            .await?;
        let removed = tx.delete(Collection::Stories, id)?;
        let withdrawn = Outbox::discard_drafts_in(&mut tx, |draft_id| draft_id == id)?;
        tx.commit()?;
        if withdrawn > 0 {
            tracing::info!("Withdrew {} queued post(s) for draft {}", withdrawn, id);
        }
        Ok(removed)
    }

    /// Delete every stored story along with the queued posts of any drafts
    pub async fn clear_stories(&self) -> Result<usize> {
        let mut tx = self
            .store
            .transaction(
                &[Collection::Stories, Collection::OfflineActions],
                TransactionMode::ReadWrite,
            )
            .await?;
        let removed = tx.clear(Collection::Stories)?;
        Outbox::discard_drafts_in(&mut tx, |_| true)?;
        tx.commit()?;
        Ok(removed)
    }

    /// Delete mirrored stories created before `cutoff` (Unix ms); drafts are kept
    pub async fn prune_older_than(&self, cutoff: i64) -> Result<usize> {
        let mut tx = self
            .store
            .transaction(&[Collection::Stories], TransactionMode::ReadWrite)
            .await?;
        let stories: Vec<StoryRecord> = tx.get_all()?;
        let mut removed = 0;
        for story in stories
            .iter()
            .filter(|story| !story.is_draft && story.created_at < cutoff)
        {
            if tx.delete(Collection::Stories, &story.id)? {
                removed += 1;
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    /// Map markers for stored stories with usable coordinates
    pub async fn markers(&self) -> Result<Vec<MapMarker>> {
        Ok(self
            .stories(None)
            .await?
            .iter()
            .filter_map(StoryRecord::marker)
            .collect())
    }

    /// Publish a story, or save it as a draft when the network is unavailable.
    ///
    /// Invalid submissions are rejected before anything is stored or sent.
    pub async fn post_story(&self, submission: NewStory) -> Result<PostOutcome> {
        submission.validate()?;

        if !self.connectivity.is_online() {
            tracing::info!("Offline, saving story as draft");
            return self.save_offline(&submission).await;
        }

        let token = self.session.access_token().await?;
        match self.service.post_story(token.as_deref(), &submission).await {
            Ok(mut story) => {
                let user = self.session.current_user().await?;
                fill_author(&mut story, user.as_ref());
                story.cached_at = Some(unix_millis_now());
                BestEffort::absorb("Failed to mirror posted story", self.store.put(&story).await);
                Ok(PostOutcome::Published(story))
            }
            Err(error) if error.is_network() => {
                tracing::warn!("Posting failed in transit, saving draft: {}", error);
                self.save_offline(&submission).await
            }
            Err(error) => Err(error),
        }
    }

    async fn save_offline(&self, submission: &NewStory) -> Result<PostOutcome> {
        let user = self.session.current_user().await?;
        let created_at = unix_millis_now();
        let description = submission.description.trim().to_string();
        let photo_data_url =
            encode_data_url(&submission.photo.mime_type, &submission.photo.bytes);

        let draft = StoryRecord {
            id: new_draft_id(),
            author_name: user
                .as_ref()
                .map_or_else(|| ANONYMOUS_AUTHOR.to_string(), |user| user.name.clone()),
            author_id: user.as_ref().map(|user| user.user_id.clone()),
            description: description.clone(),
            photo_reference: photo_data_url.clone(),
            created_at,
            lat: submission.lat,
            lon: submission.lon,
            cached_at: Some(created_at),
            is_draft: true,
        };
        let payload = AddStoryPayload {
            draft_id: draft.id.clone(),
            description,
            photo_data_url,
            photo_file_name: submission.photo.file_name.clone(),
            lat: submission.lat,
            lon: submission.lon,
            created_at,
        };

        let mut tx = self
            .store
            .transaction(
                &[Collection::Stories, Collection::OfflineActions],
                TransactionMode::ReadWrite,
            )
            .await?;
        let draft = tx.put(&draft)?;
        let action = Outbox::enqueue_in(&mut tx, ActionType::AddStory, &payload)?;
        tx.commit()?;

        tracing::info!("Saved draft {} (action {})", draft.id, action.id);
        Ok(PostOutcome::SavedOffline { draft, action })
    }

    /// Outbox shared with the sync engine
    pub const fn outbox(&self) -> &Outbox {
        &self.outbox
    }
}

fn newest_first(mut stories: Vec<StoryRecord>) -> Vec<StoryRecord> {
    stories.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    stories
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::CachedFetcher;
    use crate::models::{is_draft_id, Photo};
    use crate::remote::{HttpStoryService, LoginResult};
    use crate::testing::{server_story, Failure, FakeFetch, FakeStoryService};
    use crate::util::decode_data_url;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn api_story(id: &str, day: u32) -> serde_json::Value {
        json!({
            "id": id,
            "name": "Dimas",
            "description": format!("Story {id}"),
            "photoUrl": format!("https://story-api.test/images/{id}.jpg"),
            "createdAt": format!("2024-01-{day:02}T08:00:00.000Z"),
            "lat": -6.2,
            "lon": 106.8
        })
    }

    struct Fixture {
        repo: StoryRepository<Arc<FakeStoryService>>,
        service: Arc<FakeStoryService>,
        store: Store,
        connectivity: Connectivity,
    }

    async fn fixture(service: FakeStoryService, online: bool) -> Fixture {
        let store = Store::open_in_memory().unwrap();
        Session::new(store.clone())
            .sign_in(
                &LoginResult {
                    user_id: Some("user-1".into()),
                    name: "Dimas".into(),
                    token: "token".into(),
                },
                "dimas@example.com",
            )
            .await
            .unwrap();
        let service = Arc::new(service);
        let connectivity = Connectivity::new(online);
        let repo = StoryRepository::new(store.clone(), Arc::clone(&service), connectivity.clone());
        Fixture {
            repo,
            service,
            store,
            connectivity,
        }
    }

    fn submission() -> NewStory {
        NewStory {
            description: "Offline sunset".into(),
            photo: Photo {
                file_name: "sunset.jpg".into(),
                mime_type: "image/jpeg".into(),
                bytes: vec![0xFF, 0xD8, 0xFF, 0x00, 0x10],
            },
            lat: Some(90.0),
            lon: Some(180.0),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fetch_mirrors_and_lists_newest_first() {
        let f = fixture(
            FakeStoryService::with_stories(vec![server_story("old", 1_000), server_story("new", 2_000)]),
            true,
        )
        .await;
        assert_eq!(f.store.count(Collection::Stories).await.unwrap(), 0);

        let feed = f.repo.fetch_stories().await.unwrap();

        assert_eq!(feed.source, FeedSource::Live);
        assert_eq!(feed.mirror, BestEffort::Ok);
        let stored = f.repo.stories(None).await.unwrap();
        let ids: Vec<_> = stored.iter().map(|story| story.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert!(stored.iter().all(|story| story.cached_at.is_some()));
        assert_eq!(feed.stories, stored);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn refresh_replaces_stale_mirror_but_keeps_drafts() {
        let f = fixture(FakeStoryService::with_stories(vec![server_story("a", 1)]), false).await;
        f.repo.post_story(submission()).await.unwrap();
        f.store.put(&server_story("gone", 5)).await.unwrap();
        f.connectivity.set_online(true);

        f.repo.fetch_stories().await.unwrap();

        let stored = f.repo.stories(None).await.unwrap();
        assert!(stored.iter().any(|story| story.id == "a"));
        assert!(stored.iter().any(|story| story.is_draft));
        assert!(!stored.iter().any(|story| story.id == "gone"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_network_failure_serves_mirror() {
        let f = fixture(FakeStoryService::with_stories(vec![server_story("a", 1)]), true).await;
        f.repo.fetch_stories().await.unwrap();

        f.connectivity.set_online(false);
        f.service.fail_fetch(Some(Failure::Network));
        let feed = f.repo.fetch_stories().await.unwrap();

        assert_eq!(feed.source, FeedSource::Cached);
        assert_eq!(feed.mirror, BestEffort::Skipped);
        assert_eq!(feed.stories.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn online_network_failure_is_not_served_from_mirror() {
        let f = fixture(FakeStoryService::with_stories(vec![server_story("a", 1)]), true).await;
        f.repo.fetch_stories().await.unwrap();

        f.service.fail_fetch(Some(Failure::Network));
        let error = f.repo.fetch_stories().await.unwrap_err();

        assert!(matches!(error, Error::Network(_)));
        assert_eq!(f.repo.stories(None).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_failure_with_empty_mirror_is_tagged_offline() {
        let f = fixture(FakeStoryService::new(), false).await;
        f.service.fail_fetch(Some(Failure::Network));

        let error = f.repo.fetch_stories().await.unwrap_err();
        assert!(matches!(error, Error::Offline(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cached_response_keeps_newer_local_stories() {
        let store = Store::open_in_memory().unwrap();
        Session::new(store.clone())
            .sign_in(
                &LoginResult {
                    user_id: Some("user-1".into()),
                    name: "Dimas".into(),
                    token: "token".into(),
                },
                "dimas@example.com",
            )
            .await
            .unwrap();
        let connectivity = Connectivity::new(true);
        let service = HttpStoryService::new(
            CachedFetcher::new(FakeFetch::new(), store.clone(), connectivity.clone()),
            "https://api.test/v1",
        );
        let repo = StoryRepository::new(store.clone(), service, connectivity.clone());
        let transport = repo.service().fetcher().inner();

        transport.push_json(200, json!({ "error": false, "listStory": [api_story("a", 1)] }));
        repo.fetch_stories().await.unwrap();
        transport.push_json(
            200,
            json!({ "error": false, "listStory": [api_story("a", 1), api_story("b", 2)] }),
        );
        repo.fetch_stories().await.unwrap();
        let mirrored_b = repo.story("b").await.unwrap().unwrap();
        store.put(&server_story("c", 4_102_444_800_000)).await.unwrap();

        connectivity.set_online(false);
        transport.push_network_error();
        let feed = repo.fetch_stories().await.unwrap();

        assert_eq!(feed.source, FeedSource::Cached);
        assert_eq!(feed.mirror, BestEffort::Skipped);
        let ids: Vec<_> = feed.stories.iter().map(|story| story.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
        assert_eq!(repo.story("b").await.unwrap(), Some(mirrored_b));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unauthorized_is_not_masked_by_mirror() {
        let f = fixture(FakeStoryService::with_stories(vec![server_story("a", 1)]), true).await;
        f.repo.fetch_stories().await.unwrap();

        f.service.fail_fetch(Some(Failure::Unauthorized));
        let error = f.repo.fetch_stories().await.unwrap_err();
        assert!(matches!(error, Error::Unauthorized(_)));
        assert_eq!(f.service.fetch_calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_post_creates_draft_and_action_without_network() {
        let f = fixture(FakeStoryService::new(), false).await;

        let outcome = f.repo.post_story(submission()).await.unwrap();

        let PostOutcome::SavedOffline { draft, action } = outcome else {
            panic!("expected a draft");
        };
        assert!(f.service.posted().is_empty());
        assert!(is_draft_id(&draft.id));
        assert!(draft.is_draft);
        assert_eq!(draft.author_name, "Dimas");
        assert!(!action.synced);
        assert_eq!(action.action_type, ActionType::AddStory);

        let payload: AddStoryPayload = serde_json::from_value(action.payload.clone()).unwrap();
        assert_eq!(payload.draft_id, draft.id);
        let (_, bytes) = decode_data_url(&payload.photo_data_url).unwrap();
        assert_eq!(bytes, submission().photo.bytes);

        assert_eq!(f.repo.outbox().pending().await.unwrap(), vec![action]);
        assert_eq!(f.repo.story(&draft.id).await.unwrap(), Some(draft));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn transit_failure_falls_back_to_draft() {
        let f = fixture(FakeStoryService::new(), true).await;
        f.service.fail_posts(Some(Failure::Network));

        let outcome = f.repo.post_story(submission()).await.unwrap();

        assert!(outcome.is_offline());
        assert_eq!(f.service.posted().len(), 1);
        assert_eq!(f.repo.outbox().pending().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rejected_post_is_not_drafted() {
        let f = fixture(FakeStoryService::new(), true).await;
        f.service.fail_posts(Some(Failure::Rejected));

        let error = f.repo.post_story(submission()).await.unwrap_err();

        assert!(matches!(error, Error::Api(_)));
        assert!(f.repo.outbox().pending().await.unwrap().is_empty());
        assert!(f.repo.stories(None).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn invalid_post_is_rejected_before_anything_else() {
        let f = fixture(FakeStoryService::new(), false).await;
        let mut invalid = submission();
        invalid.lat = Some(91.0);

        let error = f.repo.post_story(invalid).await.unwrap_err();

        assert!(matches!(error, Error::Validation(_)));
        assert!(f.repo.outbox().pending().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn online_post_is_published_and_mirrored() {
        let f = fixture(FakeStoryService::new(), true).await;

        let outcome = f.repo.post_story(submission()).await.unwrap();

        let PostOutcome::Published(story) = outcome else {
            panic!("expected a published story");
        };
        assert!(!story.is_draft);
        assert_eq!(f.repo.story(&story.id).await.unwrap(), Some(story));
        assert!(f.repo.outbox().pending().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn prune_keeps_drafts_and_recent_stories() {
        let f = fixture(FakeStoryService::new(), false).await;
        f.store.put(&server_story("old", 1_000)).await.unwrap();
        f.store.put(&server_story("recent", 5_000)).await.unwrap();
        let mut old_draft = server_story("draft_old", 500);
        old_draft.is_draft = true;
        f.store.put(&old_draft).await.unwrap();

        assert_eq!(f.repo.prune_older_than(2_000).await.unwrap(), 1);

        let ids: Vec<_> = f
            .repo
            .stories(None)
            .await
            .unwrap()
            .into_iter()
            .map(|story| story.id)
            .collect();
        assert_eq!(ids, vec!["recent".to_string(), "draft_old".to_string()]);
        assert_eq!(f.repo.drafts().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn markers_skip_out_of_range_coordinates() {
        let f = fixture(FakeStoryService::new(), false).await;
        f.store.put(&server_story("ok", 1)).await.unwrap();
        let mut bad = server_story("bad", 2);
        bad.lat = Some(91.0);
        f.store.put(&bad).await.unwrap();

        let markers = f.repo.markers().await.unwrap();

        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].story_id, "ok");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stories_limit_and_delete() {
        let f = fixture(FakeStoryService::new(), false).await;
        for n in 0..3 {
            f.store.put(&server_story(&format!("s{n}"), n)).await.unwrap();
        }

        assert_eq!(f.repo.stories(Some(2)).await.unwrap().len(), 2);
        assert!(f.repo.delete_story("s0").await.unwrap());
        assert_eq!(f.repo.clear_stories().await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn deleting_a_draft_withdraws_its_queued_post() {
        let f = fixture(FakeStoryService::new(), false).await;
        let kept = f.repo.post_story(submission()).await.unwrap();
        let deleted = f.repo.post_story(submission()).await.unwrap();

        assert!(f.repo.delete_story(&deleted.story().id).await.unwrap());

        let pending = f.repo.outbox().pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        let payload: AddStoryPayload = serde_json::from_value(pending[0].payload.clone()).unwrap();
        assert_eq!(payload.draft_id, kept.story().id);
        assert_eq!(f.repo.story(&deleted.story().id).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn clearing_stories_withdraws_queued_posts() {
        let f = fixture(FakeStoryService::new(), false).await;
        f.repo.post_story(submission()).await.unwrap();
        f.store.put(&server_story("s1", 1)).await.unwrap();

        assert_eq!(f.repo.clear_stories().await.unwrap(), 2);

        assert!(f.repo.outbox().pending().await.unwrap().is_empty());
        assert!(f.repo.drafts().await.unwrap().is_empty());
    }
}
