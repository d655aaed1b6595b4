//! Storage usage and bulk data removal.

use crate::db::{Collection, Store, TransactionMode};
use crate::error::Result;

/// Collections wiped by [`clear_all_data`]; the push subscription survives
pub const CLEARABLE: [Collection; 5] = [
    Collection::Stories,
    Collection::Users,
    Collection::OfflineActions,
    Collection::Settings,
    Collection::CachedResponses,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageUsage {
    /// Record count per collection, in schema order
    pub counts: Vec<(Collection, usize)>,
    /// Size of the database file, `None` for in-memory stores
    pub database_bytes: Option<u64>,
}

impl StorageUsage {
    pub fn total_records(&self) -> usize {
        self.counts.iter().map(|(_, count)| count).sum()
    }

    pub fn count(&self, collection: Collection) -> usize {
        self.counts
            .iter()
            .find(|(candidate, _)| *candidate == collection)
            .map_or(0, |(_, count)| *count)
    }
}

pub async fn storage_usage(store: &Store) -> Result<StorageUsage> {
    let tx = store
        .transaction(&Collection::ALL, TransactionMode::ReadOnly)
        .await?;
    let counts = Collection::ALL
        .iter()
        .map(|collection| Ok((*collection, tx.count(*collection)?)))
        .collect::<Result<Vec<_>>>()?;
    tx.commit()?;

    let database_bytes = match store.path() {
        Some(path) => Some(std::fs::metadata(path)?.len()),
        None => None,
    };
    Ok(StorageUsage {
        counts,
        database_bytes,
    })
}

/// Remove every cached record, draft and queued action in one transaction.
///
/// Returns how many records were removed.
pub async fn clear_all_data(store: &Store) -> Result<usize> {
    let mut tx = store
        .transaction(&CLEARABLE, TransactionMode::ReadWrite)
        .await?;
    let mut removed = 0;
    for collection in CLEARABLE {
        removed += tx.clear(collection)?;
    }
    tx.commit()?;
    tracing::info!("Cleared {} records", removed);
    Ok(removed)
}
