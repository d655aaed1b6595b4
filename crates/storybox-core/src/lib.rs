//! storybox-core - Core library for Storybox
//!
//! Offline-first plumbing for the story client: the durable store, a
//! cache-aside fetcher, the outbox and its sync engine, the push
//! subscription manager, and HTTP clients for the story API.

pub mod cache;
pub mod config;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod export;
pub mod fetch;
pub mod maintenance;
pub mod models;
pub mod outbox;
pub mod outcome;
pub mod push;
pub mod remote;
pub mod repository;
pub mod session;
pub mod state;
pub mod sync;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ClientConfig;
pub use connectivity::{Connectivity, ConnectivityWatcher};
pub use db::{Store, Transaction, TransactionMode};
pub use error::{Error, Result};
pub use models::{NewStory, QueuedAction, StoryRecord};
pub use outbox::Outbox;
pub use outcome::BestEffort;
pub use repository::{PostOutcome, StoryRepository};
pub use session::Session;
pub use sync::{DrainOutcome, DrainReport, SyncEngine};
