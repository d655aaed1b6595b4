//! Push subscription lifecycle.
//!
//! [`PushManager`] keeps three things in step: the platform's subscription
//! handle, the local mirror in the `subscriptions` collection, and a
//! best-effort registration with the notification server. The server is
//! never authoritative; its failures are reported, not propagated.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use crate::db::{Collection, Store, TransactionMode};
use crate::error::{Error, Result};
use crate::models::{PushSubscription, SubscriptionRecord};
use crate::outcome::BestEffort;
use crate::util::unix_millis_now;

/// Length of an uncompressed P-256 public key.
const APPLICATION_SERVER_KEY_LEN: usize = 65;

/// Notification permission as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// Not decided yet; asking is allowed
    Prompt,
}

/// Platform notification capability.
#[allow(async_fn_in_trait)]
pub trait PushPlatform {
    fn is_supported(&self) -> bool;

    async fn permission(&self) -> Result<Permission>;

    async fn request_permission(&self) -> Result<Permission>;

    /// Subscription the platform already holds for this client
    async fn existing_subscription(&self) -> Result<Option<PushSubscription>>;

    async fn subscribe(&self, application_server_key: &[u8]) -> Result<PushSubscription>;

    /// Returns whether a subscription was actually cancelled
    async fn unsubscribe(&self, subscription: &PushSubscription) -> Result<bool>;
}

/// Notification server registration; best-effort, never authoritative.
#[allow(async_fn_in_trait)]
pub trait PushRegistrar {
    async fn register(&self, subscription: &PushSubscription) -> Result<()>;

    async fn deregister(&self, endpoint: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushState {
    /// No push capability; there is no way out of this state
    Unsupported,
    Unsubscribed,
    Subscribed(SubscriptionRecord),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOutcome {
    pub record: SubscriptionRecord,
    /// `false` when an existing subscription was returned as-is
    pub created: bool,
    pub remote: BestEffort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsubscribeOutcome {
    pub removed: Option<SubscriptionRecord>,
    pub remote: BestEffort,
}

/// Decode a VAPID public key from URL-safe base64, padding optional.
pub fn decode_application_server_key(key: &str) -> Result<Vec<u8>> {
    let trimmed = key.trim().trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed)
        .map_err(|error| Error::Config(format!("invalid VAPID public key: {error}")))?;
    if bytes.len() != APPLICATION_SERVER_KEY_LEN {
        return Err(Error::Config(format!(
            "VAPID public key must be {APPLICATION_SERVER_KEY_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(bytes)
}

pub struct PushManager<P, R> {
    platform: P,
    registrar: R,
    store: Store,
    application_server_key: Option<Vec<u8>>,
}

impl<P, R> std::fmt::Debug for PushManager<P, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushManager")
            .field("store", &self.store)
            .field(
                "application_server_key",
                &self.application_server_key.as_ref().map(Vec::len),
            )
            .finish_non_exhaustive()
    }
}

impl<P: PushPlatform, R: PushRegistrar> PushManager<P, R> {
    pub const fn new(platform: P, registrar: R, store: Store) -> Self {
        Self {
            platform,
            registrar,
            store,
            application_server_key: None,
        }
    }

    /// Set the VAPID public key used for new subscriptions
    pub fn with_application_server_key(mut self, key: &str) -> Result<Self> {
        self.application_server_key = Some(decode_application_server_key(key)?);
        Ok(self)
    }

    pub const fn platform(&self) -> &P {
        &self.platform
    }

    pub const fn registrar(&self) -> &R {
        &self.registrar
    }

    /// Local mirror of the active subscription
    pub async fn saved(&self) -> Result<Option<SubscriptionRecord>> {
        let mut records: Vec<SubscriptionRecord> = self.store.get_all().await?;
        records.sort_by_key(|record| std::cmp::Reverse(record.saved_at));
        Ok(records.into_iter().next())
    }

    pub async fn state(&self) -> Result<PushState> {
        if !self.platform.is_supported() {
            return Ok(PushState::Unsupported);
        }
        Ok(match self.saved().await? {
            Some(record) => PushState::Subscribed(record),
            None => PushState::Unsubscribed,
        })
    }

    /// Subscribe, asking for permission if needed.
    ///
    /// Already subscribed: the existing record is returned and the server is
    /// not contacted again.
    pub async fn subscribe(&self) -> Result<SubscribeOutcome> {
        match self.state().await? {
            PushState::Unsupported => return Err(Error::PushUnsupported),
            PushState::Subscribed(record) => {
                tracing::debug!("Already subscribed to push at {}", record.endpoint);
                return Ok(SubscribeOutcome {
                    record,
                    created: false,
                    remote: BestEffort::Skipped,
                });
            }
            PushState::Unsubscribed => {}
        }

        let mut permission = self.platform.permission().await?;
        if permission == Permission::Prompt {
            permission = self.platform.request_permission().await?;
        }
        if permission != Permission::Granted {
            return Err(Error::PermissionDenied);
        }

        let subscription = match self.platform.existing_subscription().await? {
            Some(subscription) => subscription,
            None => {
                let key = self.application_server_key.as_deref().ok_or_else(|| {
                    Error::Config("no VAPID public key configured".into())
                })?;
                self.platform.subscribe(key).await?
            }
        };

        let record = self.replace_saved(subscription.clone()).await?;
        tracing::info!("Subscribed to push at {}", record.endpoint);

        let remote = BestEffort::absorb(
            "Push server registration failed",
            self.registrar.register(&subscription).await,
        );
        Ok(SubscribeOutcome {
            record,
            created: true,
            remote,
        })
    }

    /// Cancel the platform handle and forget the local record.
    pub async fn unsubscribe(&self) -> Result<UnsubscribeOutcome> {
        if !self.platform.is_supported() {
            return Err(Error::PushUnsupported);
        }

        let saved = self.saved().await?;
        let handle = match self.platform.existing_subscription().await {
            Ok(handle) => handle,
            Err(error) => {
                tracing::warn!("Could not read platform push subscription: {}", error);
                None
            }
        };
        if let Some(handle) = &handle {
            self.platform.unsubscribe(handle).await?;
        }

        self.store.clear(Collection::Subscriptions).await?;

        let endpoint = saved
            .as_ref()
            .map(|record| record.endpoint.clone())
            .or_else(|| handle.map(|handle| handle.endpoint));
        let remote = match endpoint {
            Some(endpoint) => BestEffort::absorb(
                "Push server deregistration failed",
                self.registrar.deregister(&endpoint).await,
            ),
            None => BestEffort::Skipped,
        };
        if saved.is_some() {
            tracing::info!("Unsubscribed from push");
        }

        Ok(UnsubscribeOutcome {
            removed: saved,
            remote,
        })
    }

    /// Re-attach a saved subscription after restart.
    ///
    /// A saved record without a live platform handle is stale and removed.
    pub async fn resubscribe(&self) -> Result<PushState> {
        if !self.platform.is_supported() {
            return Ok(PushState::Unsupported);
        }
        let Some(saved) = self.saved().await? else {
            return Ok(PushState::Unsubscribed);
        };

        let Some(handle) = self.platform.existing_subscription().await? else {
            tracing::info!("Saved push subscription is no longer valid; clearing it");
            self.store.clear(Collection::Subscriptions).await?;
            return Ok(PushState::Unsubscribed);
        };

        if handle == saved.to_subscription() {
            return Ok(PushState::Subscribed(saved));
        }

        // The platform rotated the subscription
        let record = self.replace_saved(handle.clone()).await?;
        BestEffort::absorb(
            "Push server registration failed",
            self.registrar.register(&handle).await,
        );
        Ok(PushState::Subscribed(record))
    }

    /// Store `subscription` as the only local record
    async fn replace_saved(&self, subscription: PushSubscription) -> Result<SubscriptionRecord> {
        let record = SubscriptionRecord::from_subscription(subscription, unix_millis_now());
        let mut tx = self
            .store
            .transaction(&[Collection::Subscriptions], TransactionMode::ReadWrite)
            .await?;
        tx.clear(Collection::Subscriptions)?;
        let record = tx.put(&record)?;
        tx.commit()?;
        Ok(record)
    }
}
