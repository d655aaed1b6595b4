//! Push platform backed by a JSON handle file.
//!
//! A terminal cannot talk to a browser push service, so the subscription
//! itself is exported from the browser and handed to `push subscribe`. The
//! handle file plays the role of the platform's live subscription: deleting
//! it is what a browser data wipe looks like to `push resubscribe`.

use std::path::{Path, PathBuf};

use storybox_core::models::PushSubscription;
use storybox_core::push::{Permission, PushPlatform};
use storybox_core::{Error, Result};

pub struct FilePushPlatform {
    handle_path: PathBuf,
    pending: Option<PushSubscription>,
}

impl FilePushPlatform {
    pub const fn new(handle_path: PathBuf, pending: Option<PushSubscription>) -> Self {
        Self {
            handle_path,
            pending,
        }
    }

    pub fn handle_path(&self) -> &Path {
        &self.handle_path
    }

    fn read_handle(&self) -> Result<Option<PushSubscription>> {
        match std::fs::read_to_string(&self.handle_path) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }
}

/// Parse a browser-exported subscription (`PushSubscription.toJSON()`)
pub fn load_subscription_file(path: &Path) -> Result<PushSubscription> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|error| {
        Error::InvalidInput(format!(
            "{} is not a push subscription: {error}",
            path.display()
        ))
    })
}

impl PushPlatform for FilePushPlatform {
    fn is_supported(&self) -> bool {
        true
    }

    async fn permission(&self) -> Result<Permission> {
        Ok(Permission::Granted)
    }

    async fn request_permission(&self) -> Result<Permission> {
        Ok(Permission::Granted)
    }

    async fn existing_subscription(&self) -> Result<Option<PushSubscription>> {
        self.read_handle()
    }

    async fn subscribe(&self, _application_server_key: &[u8]) -> Result<PushSubscription> {
        let subscription = self.pending.clone().ok_or_else(|| {
            Error::InvalidInput("no subscription supplied; pass --subscription".into())
        })?;
        if let Some(parent) = self.handle_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.handle_path, serde_json::to_vec_pretty(&subscription)?)?;
        Ok(subscription)
    }

    async fn unsubscribe(&self, subscription: &PushSubscription) -> Result<bool> {
        match self.read_handle()? {
            Some(existing) if existing.endpoint == subscription.endpoint => {
                std::fs::remove_file(&self.handle_path)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
