//! Signed-in identity and access token, persisted in the store.

use crate::db::{
    set_setting_in, Collection, SettingsRepository, Store, StoreSettingsRepository,
    TransactionMode,
};
use crate::error::Result;
use crate::models::{SettingRecord, UserRecord, ACCESS_TOKEN_KEY, CURRENT_USER_KEY};
use crate::remote::LoginResult;
use crate::util::unix_millis_now;

#[derive(Debug, Clone)]
pub struct Session {
    store: Store,
    settings: StoreSettingsRepository,
}

impl Session {
    pub fn new(store: Store) -> Self {
        Self {
            settings: StoreSettingsRepository::new(store.clone()),
            store,
        }
    }

    pub async fn access_token(&self) -> Result<Option<String>> {
        self.settings.get(ACCESS_TOKEN_KEY).await
    }

    pub async fn current_user(&self) -> Result<Option<UserRecord>> {
        let Some(user_id) = self.settings.get::<String>(CURRENT_USER_KEY).await? else {
            return Ok(None);
        };
        self.store.get(user_id).await
    }

    /// Persist the identity and token of a successful login together.
    ///
    /// Logins without a user id are keyed by email. Switching to a different
    /// user drops the response cache, which is not keyed by user.
    pub async fn sign_in(&self, login: &LoginResult, email: &str) -> Result<UserRecord> {
        let email = email.trim();
        let user = UserRecord {
            user_id: login
                .user_id
                .clone()
                .unwrap_or_else(|| email.to_ascii_lowercase()),
            name: login.name.clone(),
            email: (!email.is_empty()).then(|| email.to_string()),
            cached_at: unix_millis_now(),
        };

        let mut tx = self
            .store
            .transaction(
                &[
                    Collection::Users,
                    Collection::Settings,
                    Collection::CachedResponses,
                ],
                TransactionMode::ReadWrite,
            )
            .await?;
        let previous = tx
            .get::<SettingRecord>(CURRENT_USER_KEY)?
            .and_then(|setting| setting.value.as_str().map(ToString::to_string));
        if previous.as_deref() != Some(user.user_id.as_str()) {
            let dropped = tx.clear(Collection::CachedResponses)?;
            if dropped > 0 {
                tracing::info!("Dropped {} cached responses on user switch", dropped);
            }
        }
        tx.put(&user)?;
        set_setting_in(&mut tx, ACCESS_TOKEN_KEY, &login.token)?;
        set_setting_in(&mut tx, CURRENT_USER_KEY, &user.user_id)?;
        tx.commit()?;

        Ok(user)
    }

    /// Forget the token and every cached response; the cached user record is kept.
    ///
    /// Returns whether a token was present.
    pub async fn sign_out(&self) -> Result<bool> {
        let mut tx = self
            .store
            .transaction(
                &[Collection::Settings, Collection::CachedResponses],
                TransactionMode::ReadWrite,
            )
            .await?;
        let had_token = tx.delete(Collection::Settings, ACCESS_TOKEN_KEY)?;
        tx.delete(Collection::Settings, CURRENT_USER_KEY)?;
        tx.clear(Collection::CachedResponses)?;
        tx.commit()?;
        Ok(had_token)
    }
}
