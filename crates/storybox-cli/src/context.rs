//! Per-invocation wiring of config, store and remote clients.

use std::path::{Path, PathBuf};

use storybox_core::cache::CachedFetcher;
use storybox_core::fetch::HttpFetcher;
use storybox_core::push::PushManager;
use storybox_core::remote::{AuthClient, HttpPushRegistrar, HttpStoryService};
use storybox_core::{ClientConfig, Connectivity, Error, Session, Store, StoryRepository, SyncEngine};

use crate::error::CliError;
use crate::platform::FilePushPlatform;

const APP_DIR_NAME: &str = "storybox";
const CONFIG_FILE_NAME: &str = "config.json";
const DB_FILE_NAME: &str = "storybox.db";
const PUSH_HANDLE_FILE_NAME: &str = "push-subscription.json";

pub type StoryClient = HttpStoryService<CachedFetcher<HttpFetcher>>;

pub struct AppContext {
    pub config: ClientConfig,
    pub config_path: PathBuf,
    pub db_path: PathBuf,
    pub connectivity: Connectivity,
    store: Option<Store>,
    http: HttpFetcher,
}

impl AppContext {
    /// Resolve config, open the store and build the HTTP client.
    ///
    /// A store that cannot be opened leaves the context in network-only mode.
    pub fn open(
        cli_db_path: Option<PathBuf>,
        cli_config_path: Option<PathBuf>,
        offline: bool,
    ) -> Result<Self, CliError> {
        let config_path = match cli_config_path {
            Some(path) => path,
            None => default_config_path()?,
        };
        let config = ClientConfig::resolve(&config_path)?;
        let db_path = resolve_db_path(cli_db_path, &config)?;

        let store = match Store::open(&db_path) {
            Ok(store) => Some(store),
            Err(Error::StorageUnavailable(reason)) => {
                tracing::warn!("Local storage unavailable, running network-only: {}", reason);
                None
            }
            Err(error) => return Err(error.into()),
        };

        Ok(Self {
            http: HttpFetcher::new(config.request_timeout())?,
            connectivity: Connectivity::new(!offline),
            config,
            config_path,
            db_path,
            store,
        })
    }

    pub fn store(&self, command: &'static str) -> Result<&Store, CliError> {
        self.store.as_ref().ok_or(CliError::StorageRequired(command))
    }

    pub fn session(&self, command: &'static str) -> Result<Session, CliError> {
        Ok(Session::new(self.store(command)?.clone()))
    }

    pub fn http(&self) -> &HttpFetcher {
        &self.http
    }

    pub fn story_client(&self) -> StoryClient {
        let fetcher = match &self.store {
            Some(store) => {
                CachedFetcher::new(self.http.clone(), store.clone(), self.connectivity.clone())
            }
            None => CachedFetcher::network_only(self.http.clone(), self.connectivity.clone()),
        };
        HttpStoryService::new(fetcher, self.config.api_base_url.clone())
    }

    pub fn auth_client(&self) -> AuthClient<HttpFetcher> {
        AuthClient::new(self.http.clone(), self.config.api_base_url.clone())
    }

    pub fn repository(&self, command: &'static str) -> Result<StoryRepository<StoryClient>, CliError> {
        Ok(StoryRepository::new(
            self.store(command)?.clone(),
            self.story_client(),
            self.connectivity.clone(),
        ))
    }

    pub fn sync_engine(&self, command: &'static str) -> Result<SyncEngine<StoryClient>, CliError> {
        Ok(SyncEngine::new(
            self.store(command)?.clone(),
            self.story_client(),
            self.connectivity.clone(),
        ))
    }

    /// Push manager over the file-backed platform handle.
    ///
    /// `pending` is the subscription a `push subscribe` call hands to the
    /// platform.
    pub async fn push_manager(
        &self,
        pending: Option<storybox_core::models::PushSubscription>,
    ) -> Result<PushManager<FilePushPlatform, HttpPushRegistrar<HttpFetcher>>, CliError> {
        let store = self.store("push")?.clone();
        let token = Session::new(store.clone()).access_token().await?;
        let platform = FilePushPlatform::new(push_handle_path(&self.db_path), pending);
        let registrar =
            HttpPushRegistrar::new(self.http.clone(), self.config.api_base_url.clone(), token);
        let manager = PushManager::new(platform, registrar, store);
        match self.config.vapid_public_key.as_deref() {
            Some(key) => Ok(manager.with_application_server_key(key)?),
            None => Ok(manager),
        }
    }
}

pub fn default_config_path() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or_else(|| CliError::Config("Failed to resolve config directory".into()))
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(DB_FILE_NAME))
        .ok_or_else(|| CliError::Config("Failed to resolve data directory".into()))
}

/// `--db-path`, then config (including `STORYBOX_DB_PATH`), then the data dir
pub fn resolve_db_path(
    cli_db_path: Option<PathBuf>,
    config: &ClientConfig,
) -> Result<PathBuf, CliError> {
    match cli_db_path.or_else(|| config.db_path.clone()) {
        Some(path) => Ok(path),
        None => default_db_path(),
    }
}

pub fn push_handle_path(db_path: &Path) -> PathBuf {
    db_path.with_file_name(PUSH_HANDLE_FILE_NAME)
}
