//! Data models for Storybox

mod action;
mod cached_response;
mod setting;
mod story;
mod subscription;
mod user;

pub use action::{ActionType, AddStoryPayload, QueuedAction};
pub use cached_response::CachedResponse;
pub use setting::{SettingRecord, ACCESS_TOKEN_KEY, CURRENT_USER_KEY};
pub use story::{
    is_draft_id, new_draft_id, Coordinates, MapMarker, NewStory, Photo, StoryRecord,
    DRAFT_ID_PREFIX, MAX_PHOTO_BYTES,
};
pub use subscription::{PushSubscription, SubscriptionKeys, SubscriptionRecord};
pub use user::UserRecord;
