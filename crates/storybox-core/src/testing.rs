//! In-process fakes for the remote collaborators.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::connectivity::Connectivity;
use crate::error::{Error, Result};
use crate::fetch::{Fetch, FetchRequest, FetchResponse};
use crate::models::{NewStory, PushSubscription, StoryRecord, SubscriptionKeys};
use crate::push::{Permission, PushPlatform, PushRegistrar};
use crate::remote::{StoryList, StoryService};
use crate::util::unix_millis_now;

/// Scripted transport: answers requests from a queue, in order.
#[derive(Default)]
pub struct FakeFetch {
    responses: Mutex<VecDeque<Result<FetchResponse>>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl FakeFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: Result<FetchResponse>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn push_json(&self, status: u16, body: serde_json::Value) {
        self.push(Ok(FetchResponse::network(
            status,
            Some("application/json".into()),
            serde_json::to_vec(&body).unwrap(),
        )));
    }

    pub fn push_network_error(&self) {
        self.push(Err(Error::Network("connection refused".into())));
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Fetch for FakeFetch {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Network("no scripted response".into())))
    }
}

/// How a fake remote call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Network,
    Unauthorized,
    Rejected,
}

impl Failure {
    fn error(self) -> Error {
        match self {
            Self::Network => Error::Network("connection reset".into()),
            Self::Unauthorized => Error::Unauthorized("invalid token".into()),
            Self::Rejected => Error::Api("HTTP 500: rejected".into()),
        }
    }
}

/// In-memory story API.
#[derive(Default)]
pub struct FakeStoryService {
    stories: Mutex<Vec<StoryRecord>>,
    fetch_failure: Mutex<Option<Failure>>,
    post_failure: Mutex<Option<Failure>>,
    failing_descriptions: Mutex<Vec<String>>,
    posted: Mutex<Vec<NewStory>>,
    fetch_calls: AtomicUsize,
    succeeded: AtomicUsize,
    gate: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
    disconnect_after: Mutex<Option<(usize, Connectivity)>>,
}

impl FakeStoryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stories(stories: Vec<StoryRecord>) -> Self {
        let service = Self::default();
        *service.stories.lock().unwrap() = stories;
        service
    }

    pub fn fail_fetch(&self, failure: Option<Failure>) {
        *self.fetch_failure.lock().unwrap() = failure;
    }

    pub fn fail_posts(&self, failure: Option<Failure>) {
        *self.post_failure.lock().unwrap() = failure;
    }

    /// Reject posts with this exact description
    pub fn fail_description(&self, description: &str) {
        self.failing_descriptions
            .lock()
            .unwrap()
            .push(description.to_string());
    }

    /// Block every post until `release` is notified, signalling `entered` first
    pub fn gate_posts(&self, entered: Arc<Notify>, release: Arc<Notify>) {
        *self.gate.lock().unwrap() = Some((entered, release));
    }

    /// Flip `connectivity` offline once `count` posts have succeeded
    pub fn disconnect_after(&self, count: usize, connectivity: Connectivity) {
        *self.disconnect_after.lock().unwrap() = Some((count, connectivity));
    }

    pub fn posted(&self) -> Vec<NewStory> {
        self.posted.lock().unwrap().clone()
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

pub fn server_story(id: &str, created_at: i64) -> StoryRecord {
    StoryRecord {
        id: id.to_string(),
        author_name: "Dimas".into(),
        author_id: None,
        description: format!("Story {id}"),
        photo_reference: format!("https://story-api.test/images/{id}.jpg"),
        created_at,
        lat: Some(-6.2),
        lon: Some(106.8),
        cached_at: None,
        is_draft: false,
    }
}

impl StoryService for FakeStoryService {
    async fn fetch_stories_with_location(&self, token: Option<&str>) -> Result<StoryList> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = *self.fetch_failure.lock().unwrap() {
            return Err(failure.error());
        }
        if token.is_none() {
            return Err(Error::Unauthorized("authentication required".into()));
        }
        Ok(StoryList::live(self.stories.lock().unwrap().clone()))
    }

    async fn post_story(&self, _token: Option<&str>, story: &NewStory) -> Result<StoryRecord> {
        story.validate()?;

        let gate = self.gate.lock().unwrap().clone();
        if let Some((entered, release)) = gate {
            entered.notify_one();
            release.notified().await;
        }

        self.posted.lock().unwrap().push(story.clone());
        if let Some(failure) = *self.post_failure.lock().unwrap() {
            return Err(failure.error());
        }
        if self
            .failing_descriptions
            .lock()
            .unwrap()
            .contains(&story.description)
        {
            return Err(Failure::Rejected.error());
        }

        let record = {
            let mut stories = self.stories.lock().unwrap();
            let mut record = server_story(&format!("story-{}", stories.len() + 1), unix_millis_now());
            record.description = story.description.clone();
            record.lat = story.lat;
            record.lon = story.lon;
            stories.push(record.clone());
            record
        };

        let succeeded = self.succeeded.fetch_add(1, Ordering::SeqCst) + 1;
        let disconnect = self.disconnect_after.lock().unwrap().clone();
        if let Some((count, connectivity)) = disconnect {
            if succeeded >= count {
                connectivity.set_online(false);
            }
        }
        Ok(record)
    }
}

/// Scriptable platform push manager.
pub struct FakePushPlatform {
    supported: bool,
    permission: Mutex<Permission>,
    request_result: Permission,
    existing: Mutex<Option<PushSubscription>>,
    subscribe_calls: AtomicUsize,
    unsubscribe_calls: AtomicUsize,
}

impl FakePushPlatform {
    pub fn new(permission: Permission, request_result: Permission) -> Self {
        Self {
            supported: true,
            permission: Mutex::new(permission),
            request_result,
            existing: Mutex::new(None),
            subscribe_calls: AtomicUsize::new(0),
            unsubscribe_calls: AtomicUsize::new(0),
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new(Permission::Denied, Permission::Denied)
        }
    }

    pub fn subscription_for(endpoint: &str) -> PushSubscription {
        PushSubscription {
            endpoint: endpoint.to_string(),
            keys: SubscriptionKeys {
                p256dh: "BNcRdreALRFXTkOOUHK1EtK2wtaz5Ry4YfYCA_0QTpQtUbVlUls0VJXg7A8u-Ts1XbjhazAkj7I99e8QcYP7DkM".into(),
                auth: "tBHItJI5svbpez7KI4CCXg".into(),
            },
        }
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }

    pub fn existing_now(&self) -> Option<PushSubscription> {
        self.existing.lock().unwrap().clone()
    }

    pub fn set_existing(&self, subscription: Option<PushSubscription>) {
        *self.existing.lock().unwrap() = subscription;
    }

    /// Simulate the platform dropping the subscription (e.g. browser data cleared)
    pub fn forget_subscription(&self) {
        self.set_existing(None);
    }
}

impl PushPlatform for FakePushPlatform {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn permission(&self) -> Result<Permission> {
        Ok(*self.permission.lock().unwrap())
    }

    async fn request_permission(&self) -> Result<Permission> {
        let mut permission = self.permission.lock().unwrap();
        *permission = self.request_result;
        Ok(*permission)
    }

    async fn existing_subscription(&self) -> Result<Option<PushSubscription>> {
        Ok(self.existing_now())
    }

    async fn subscribe(&self, application_server_key: &[u8]) -> Result<PushSubscription> {
        assert!(!application_server_key.is_empty());
        let n = self.subscribe_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let subscription = Self::subscription_for(&format!("https://push.test/endpoint-{n}"));
        self.set_existing(Some(subscription.clone()));
        Ok(subscription)
    }

    async fn unsubscribe(&self, subscription: &PushSubscription) -> Result<bool> {
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        let mut existing = self.existing.lock().unwrap();
        if existing.as_ref() == Some(subscription) {
            *existing = None;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

/// Notification server stand-in recording every call.
#[derive(Default)]
pub struct FakeRegistrar {
    registered: Mutex<Vec<String>>,
    deregistered: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl FakeRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer like a deployment without the notification endpoint
    pub fn fail_with_not_found(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn registered(&self) -> Vec<String> {
        self.registered.lock().unwrap().clone()
    }

    pub fn deregistered(&self) -> Vec<String> {
        self.deregistered.lock().unwrap().clone()
    }

    fn outcome(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(Error::RemoteRegistrationFailed("HTTP 404: Not Found".into()))
        } else {
            Ok(())
        }
    }
}

impl PushRegistrar for FakeRegistrar {
    async fn register(&self, subscription: &PushSubscription) -> Result<()> {
        self.registered
            .lock()
            .unwrap()
            .push(subscription.endpoint.clone());
        self.outcome()
    }

    async fn deregister(&self, endpoint: &str) -> Result<()> {
        self.deregistered.lock().unwrap().push(endpoint.to_string());
        self.outcome()
    }
}
