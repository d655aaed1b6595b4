//! Push subscription model

use serde::{Deserialize, Serialize};

use crate::db::{Collection, Key, Record};

/// Encryption keys of a push subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// Subscription descriptor as handed out by the platform push manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

/// Local mirror of the active push subscription, keyed by endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
    /// Unix ms
    pub saved_at: i64,
}

impl SubscriptionRecord {
    pub fn from_subscription(subscription: PushSubscription, saved_at: i64) -> Self {
        Self {
            endpoint: subscription.endpoint,
            keys: subscription.keys,
            saved_at,
        }
    }

    pub fn to_subscription(&self) -> PushSubscription {
        PushSubscription {
            endpoint: self.endpoint.clone(),
            keys: self.keys.clone(),
        }
    }
}

impl Record for SubscriptionRecord {
    const COLLECTION: Collection = Collection::Subscriptions;

    fn key(&self) -> Option<Key> {
        Some(Key::from(self.endpoint.as_str()))
    }
}
