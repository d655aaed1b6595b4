//! Durable queue of mutations awaiting delivery.
//!
//! Actions are appended with `synced = false` and delivered by the sync
//! engine in enqueue order. Delivered actions keep their row (and audit
//! fields) until the prune step removes them.

use serde::Serialize;

use crate::db::{Collection, Index, Store, Transaction, TransactionMode};
use crate::error::{Error, Result};
use crate::models::{ActionType, AddStoryPayload, QueuedAction};
use crate::util::unix_millis_now;

#[derive(Debug, Clone)]
pub struct Outbox {
    store: Store,
}

impl Outbox {
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// Append an action; no delivery is attempted
    pub async fn enqueue(
        &self,
        action_type: ActionType,
        payload: &impl Serialize,
    ) -> Result<QueuedAction> {
        let mut tx = self
            .store
            .transaction(&[Collection::OfflineActions], TransactionMode::ReadWrite)
            .await?;
        let action = Self::enqueue_in(&mut tx, action_type, payload)?;
        tx.commit()?;
        Ok(action)
    }

    /// Append an action as part of a larger transaction
    pub fn enqueue_in(
        tx: &mut Transaction,
        action_type: ActionType,
        payload: &impl Serialize,
    ) -> Result<QueuedAction> {
        let action = tx.put(&QueuedAction {
            id: 0,
            action_type,
            payload: serde_json::to_value(payload)?,
            timestamp: unix_millis_now(),
            synced: false,
            synced_at: None,
            attempts: 0,
            last_error: None,
        })?;
        tracing::debug!("Queued {} action {}", action_type.as_str(), action.id);
        Ok(action)
    }

    /// Drop unsynced `AddStory` actions whose draft matches `is_discarded`; returns how many
    pub fn discard_drafts_in(
        tx: &mut Transaction,
        is_discarded: impl Fn(&str) -> bool,
    ) -> Result<usize> {
        let pending: Vec<QueuedAction> = tx.get_all_matching(Index::Synced, 0_i64)?;
        let mut removed = 0;
        for action in pending
            .iter()
            .filter(|action| action.action_type == ActionType::AddStory)
        {
            let Ok(payload) = serde_json::from_value::<AddStoryPayload>(action.payload.clone())
            else {
                continue;
            };
            if is_discarded(&payload.draft_id) && tx.delete(Collection::OfflineActions, action.id)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Unsynced actions, oldest first (ties broken by id)
    pub async fn pending(&self) -> Result<Vec<QueuedAction>> {
        let mut actions: Vec<QueuedAction> = self
            .store
            .get_all_matching(Index::Synced, 0_i64)
            .await?;
        actions.sort_by_key(|action| (action.timestamp, action.id));
        Ok(actions)
    }

    /// Every action still stored, synced or not, oldest first
    pub async fn all(&self) -> Result<Vec<QueuedAction>> {
        let mut actions: Vec<QueuedAction> =
            self.store.get_all_by_index(Index::Timestamp).await?;
        actions.sort_by_key(|action| (action.timestamp, action.id));
        Ok(actions)
    }

    pub async fn get(&self, id: i64) -> Result<Option<QueuedAction>> {
        self.store.get(id).await
    }

    /// Flag an action as delivered; it will never be replayed again
    pub async fn mark_synced(&self, id: i64) -> Result<QueuedAction> {
        let mut tx = self
            .store
            .transaction(&[Collection::OfflineActions], TransactionMode::ReadWrite)
            .await?;
        let action = Self::mark_synced_in(&mut tx, id)?;
        tx.commit()?;
        Ok(action)
    }

    pub fn mark_synced_in(tx: &mut Transaction, id: i64) -> Result<QueuedAction> {
        let mut action: QueuedAction = tx
            .get(id)?
            .ok_or_else(|| Error::NotFound(format!("queued action {id}")))?;
        action.synced = true;
        action.synced_at = Some(unix_millis_now());
        action.attempts += 1;
        action.last_error = None;
        tx.put(&action)
    }

    /// Record a failed delivery attempt; the action stays pending
    pub async fn record_failure(&self, id: i64, error: &str) -> Result<QueuedAction> {
        let mut tx = self
            .store
            .transaction(&[Collection::OfflineActions], TransactionMode::ReadWrite)
            .await?;
        let mut action: QueuedAction = tx
            .get(id)?
            .ok_or_else(|| Error::NotFound(format!("queued action {id}")))?;
        action.attempts += 1;
        action.last_error = Some(error.to_string());
        let action = tx.put(&action)?;
        tx.commit()?;
        Ok(action)
    }

    /// Delete every synced action; returns how many were removed
    pub async fn prune_synced(&self) -> Result<usize> {
        let mut tx = self
            .store
            .transaction(&[Collection::OfflineActions], TransactionMode::ReadWrite)
            .await?;
        let synced: Vec<QueuedAction> = tx.get_all_matching(Index::Synced, 1_i64)?;
        for action in &synced {
            tx.delete(Collection::OfflineActions, action.id)?;
        }
        tx.commit()?;

        if !synced.is_empty() {
            tracing::debug!("Pruned {} synced actions", synced.len());
        }
        Ok(synced.len())
    }
}
