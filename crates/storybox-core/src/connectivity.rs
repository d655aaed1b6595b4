//! Online/offline signal shared by the fetcher, repository and sync engine.

use std::sync::Arc;

use tokio::sync::watch;

use crate::state::NetworkStatus;

/// Owned connectivity state with change notifications.
///
/// Clones share the same signal. Whoever observes the network (a polling loop,
/// a platform callback) calls [`Connectivity::set_online`]; everything else
/// reads it or subscribes.
#[derive(Debug, Clone)]
pub struct Connectivity {
    sender: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        let (sender, _receiver) = watch::channel(online);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    pub fn status(&self) -> NetworkStatus {
        NetworkStatus::from_online(self.is_online())
    }

    /// Publish a new observation. Returns `true` when the state changed.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.sender.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            tracing::info!("Connectivity changed: {:?}", NetworkStatus::from_online(online));
        }
        changed
    }

    /// Watch for offline to online transitions from the current state on
    pub fn subscribe(&self) -> ConnectivityWatcher {
        let receiver = self.sender.subscribe();
        let last = *receiver.borrow();
        ConnectivityWatcher { receiver, last }
    }
}

/// Yields once per offline to online transition.
#[derive(Debug)]
pub struct ConnectivityWatcher {
    receiver: watch::Receiver<bool>,
    last: bool,
}

impl ConnectivityWatcher {
    /// Wait for the next restore.
    ///
    /// Returns `false` once every [`Connectivity`] handle has been dropped.
    pub async fn restored(&mut self) -> bool {
        loop {
            if self.receiver.changed().await.is_err() {
                return false;
            }
            let online = *self.receiver.borrow_and_update();
            let was_online = std::mem::replace(&mut self.last, online);
            if online && !was_online {
                return true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn set_online_reports_changes_only() {
        let connectivity = Connectivity::new(true);
        assert!(!connectivity.set_online(true));
        assert!(connectivity.set_online(false));
        assert!(!connectivity.is_online());
        assert_eq!(connectivity.status(), NetworkStatus::Offline);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn watcher_fires_on_restore() {
        let connectivity = Connectivity::new(false);
        let mut watcher = connectivity.subscribe();

        connectivity.set_online(true);
        let fired = tokio::time::timeout(Duration::from_secs(1), watcher.restored())
            .await
            .unwrap();
        assert!(fired);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn watcher_ignores_going_offline() {
        let connectivity = Connectivity::new(true);
        let mut watcher = connectivity.subscribe();

        connectivity.set_online(false);
        let result = tokio::time::timeout(Duration::from_millis(50), watcher.restored()).await;
        assert!(result.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn watcher_ends_when_signal_dropped() {
        let connectivity = Connectivity::new(false);
        let mut watcher = connectivity.subscribe();
        drop(connectivity);

        assert!(!watcher.restored().await);
    }
}
