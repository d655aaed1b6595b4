//! Outbox replay.
//!
//! A drain walks pending actions oldest first and replays each against the
//! story service. Delivery is at-least-once: an action is only marked
//! synced after the server acknowledged it, in the same transaction that
//! swaps the draft for the server's story.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::connectivity::{Connectivity, ConnectivityWatcher};
use crate::db::{Collection, Store, TransactionMode};
use crate::error::{Error, Result};
use crate::models::{ActionType, AddStoryPayload, NewStory, Photo, QueuedAction, StoryRecord};
use crate::outbox::Outbox;
use crate::outcome::BestEffort;
use crate::remote::StoryService;
use crate::repository::fill_author;
use crate::session::Session;
use crate::state::SyncPhase;
use crate::util::{decode_data_url, unix_millis_now};

/// Summary of one pass over the outbox
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub attempted: usize,
    pub synced: usize,
    /// Action id and the reason it stays pending
    pub failed: Vec<(i64, String)>,
    /// Actions of a type this client cannot replay
    pub skipped: usize,
    /// Connectivity dropped before every action was attempted
    pub aborted_offline: bool,
    /// Synced actions removed after the pass
    pub pruned: usize,
}

impl DrainReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && !self.aborted_offline
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Another drain was in progress; nothing was done
    AlreadyDraining,
    Completed(DrainReport),
}

/// Clears the draining flag however the drain ends
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct SyncEngine<S> {
    store: Store,
    outbox: Outbox,
    session: Session,
    service: S,
    connectivity: Connectivity,
    draining: AtomicBool,
}

impl<S: StoryService> SyncEngine<S> {
    pub fn new(store: Store, service: S, connectivity: Connectivity) -> Self {
        Self {
            outbox: Outbox::new(store.clone()),
            session: Session::new(store.clone()),
            store,
            service,
            connectivity,
            draining: AtomicBool::new(false),
        }
    }

    pub fn phase(&self) -> SyncPhase {
        if self.draining.load(Ordering::SeqCst) {
            SyncPhase::Draining
        } else {
            SyncPhase::Idle
        }
    }

    pub const fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Replay every pending action once.
    ///
    /// Returns `AlreadyDraining` without touching the outbox when a drain is
    /// already running. Per-action failures are recorded and do not stop
    /// the pass; losing connectivity does.
    pub async fn drain(&self) -> Result<DrainOutcome> {
        if self
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Drain already in progress");
            return Ok(DrainOutcome::AlreadyDraining);
        }
        let _guard = DrainGuard(&self.draining);

        let pending = self.outbox.pending().await?;
        let mut report = DrainReport::default();
        if pending.is_empty() {
            return Ok(DrainOutcome::Completed(report));
        }
        tracing::info!("Draining {} pending actions", pending.len());

        let token = self.session.access_token().await?;
        for action in &pending {
            if !self.connectivity.is_online() {
                tracing::info!("Connectivity lost, stopping drain");
                report.aborted_offline = true;
                break;
            }

            match action.action_type {
                ActionType::AddStory => {}
                ActionType::Unsupported => {
                    tracing::warn!("Skipping action {} of unsupported type", action.id);
                    report.skipped += 1;
                    continue;
                }
            }

            report.attempted += 1;
            match self.replay_add_story(action, token.as_deref()).await {
                Ok(story) => {
                    tracing::info!("Synced action {} as story {}", action.id, story.id);
                    report.synced += 1;
                }
                Err(error) => {
                    tracing::warn!("Action {} failed: {}", action.id, error);
                    let reason = error.to_string();
                    BestEffort::absorb(
                        &format!("Failed to record failure of action {}", action.id),
                        self.outbox.record_failure(action.id, &reason).await,
                    );
                    report.failed.push((action.id, reason));
                }
            }
        }

        if report.synced > 0 {
            report.pruned = self.outbox.prune_synced().await?;
        }
        tracing::info!(
            "Drain finished: {} synced, {} failed, {} skipped",
            report.synced,
            report.failed.len(),
            report.skipped
        );
        Ok(DrainOutcome::Completed(report))
    }

    async fn replay_add_story(
        &self,
        action: &QueuedAction,
        token: Option<&str>,
    ) -> Result<StoryRecord> {
        let payload: AddStoryPayload = serde_json::from_value(action.payload.clone())
            .map_err(|error| Error::InvalidInput(format!("action {}: {error}", action.id)))?;
        let (mime_type, bytes) = decode_data_url(&payload.photo_data_url)?;
        let submission = NewStory {
            description: payload.description.clone(),
            photo: Photo {
                file_name: payload.photo_file_name.clone(),
                mime_type,
                bytes,
            },
            lat: payload.lat,
            lon: payload.lon,
        };

        let mut story = self.service.post_story(token, &submission).await?;
        let user = self.session.current_user().await?;
        fill_author(&mut story, user.as_ref());
        story.cached_at = Some(unix_millis_now());
        story.is_draft = false;

        let mut tx = self
            .store
            .transaction(
                &[Collection::Stories, Collection::OfflineActions],
                TransactionMode::ReadWrite,
            )
            .await?;
        tx.delete(Collection::Stories, &payload.draft_id)?;
        let story = tx.put(&story)?;
        Outbox::mark_synced_in(&mut tx, action.id)?;
        tx.commit()?;
        Ok(story)
    }

    /// Drain on every reconnect, and every `interval` while online.
    ///
    /// Returns when the connectivity source is gone.
    pub async fn run(&self, mut watcher: ConnectivityWatcher, interval: Option<Duration>) {
        loop {
            if self.connectivity.is_online() {
                self.drain_logged().await;
            }

            let restored = match interval {
                Some(interval) => tokio::select! {
                    restored = watcher.restored() => restored,
                    () = tokio::time::sleep(interval) => true,
                },
                None => watcher.restored().await,
            };
            if !restored {
                tracing::debug!("Connectivity source closed, stopping sync loop");
                return;
            }
        }
    }

    async fn drain_logged(&self) {
        match self.drain().await {
            Ok(DrainOutcome::Completed(report)) if !report.is_clean() => {
                tracing::warn!("{} actions remain pending", report.failed.len());
            }
            Ok(_) => {}
            Err(error) => tracing::error!("Drain failed: {}", error),
        }
    }
}
