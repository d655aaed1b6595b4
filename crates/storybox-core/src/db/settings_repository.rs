//! Settings repository implementation

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Collection, Store, Transaction};
use crate::error::Result;
use crate::models::SettingRecord;
use crate::util::unix_millis_now;

/// Trait for key/value settings storage (async)
#[allow(async_fn_in_trait)]
pub trait SettingsRepository {
    /// Read a setting, `None` when unset
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>;

    /// Write a setting, replacing any previous value
    async fn set<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()>;

    /// Remove a setting; returns whether it existed
    async fn remove(&self, key: &str) -> Result<bool>;

    /// Every setting, sorted by key
    async fn all(&self) -> Result<BTreeMap<String, serde_json::Value>>;
}

/// `SettingsRepository` backed by the `settings` collection
#[derive(Debug, Clone)]
pub struct StoreSettingsRepository {
    store: Store,
}

impl StoreSettingsRepository {
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

/// Write a setting as part of a larger transaction
pub fn set_in<T: Serialize>(tx: &mut Transaction, key: &str, value: &T) -> Result<()> {
    tx.put(&SettingRecord {
        key: key.to_string(),
        value: serde_json::to_value(value)?,
        updated_at: unix_millis_now(),
    })?;
    Ok(())
}

impl SettingsRepository for StoreSettingsRepository {
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(record) = self.store.get::<SettingRecord>(key).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_value(record.value)?))
    }

    async fn set<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        self.store
            .put(&SettingRecord {
                key: key.to_string(),
                value: serde_json::to_value(value)?,
                updated_at: unix_millis_now(),
            })
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        self.store.delete(Collection::Settings, key).await
    }

    async fn all(&self) -> Result<BTreeMap<String, serde_json::Value>> {
        let records: Vec<SettingRecord> = self.store.get_all().await?;
        Ok(records
            .into_iter()
            .map(|record| (record.key, record.value))
            .collect())
    }
}
