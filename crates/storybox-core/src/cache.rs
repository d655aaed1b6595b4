//! Cache-aside wrapper around any [`Fetch`].
//!
//! Reads go to the network first. Successful JSON responses are mirrored
//! into the `cached_responses` collection; when the network call fails and
//! the client is offline, the last mirrored body for the same request is
//! served instead. Cached values are never raced against the network.

use crate::connectivity::Connectivity;
use crate::db::Store;
use crate::error::{Error, Result};
use crate::fetch::{Fetch, FetchRequest, FetchResponse, ResponseSource};
use crate::models::CachedResponse;
use crate::outcome::BestEffort;
use crate::util::unix_millis_now;

const SYNTHESIZED_CONTENT_TYPE: &str = "application/json";

/// Stale-while-absent fetcher.
#[derive(Debug, Clone)]
pub struct CachedFetcher<F> {
    inner: F,
    store: Option<Store>,
    connectivity: Connectivity,
}

impl<F: Fetch> CachedFetcher<F> {
    pub const fn new(inner: F, store: Store, connectivity: Connectivity) -> Self {
        Self {
            inner,
            store: Some(store),
            connectivity,
        }
    }

    /// Wrapper for when the durable store could not be opened.
    ///
    /// Requests pass straight through; nothing is mirrored or served from cache.
    pub const fn network_only(inner: F, connectivity: Connectivity) -> Self {
        Self {
            inner,
            store: None,
            connectivity,
        }
    }

    pub const fn inner(&self) -> &F {
        &self.inner
    }

    pub const fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    async fn mirror(&self, request: &FetchRequest, response: &FetchResponse) -> BestEffort {
        let Some(store) = &self.store else {
            return BestEffort::Skipped;
        };
        let body = match serde_json::from_slice::<serde_json::Value>(&response.body) {
            Ok(body) => body,
            Err(error) => {
                tracing::debug!("Not mirroring non-JSON response for {}: {}", request.url, error);
                return BestEffort::Skipped;
            }
        };

        let record = CachedResponse {
            request_key: request.cache_key(),
            content_type: response.content_type.clone(),
            body,
            cached_at: unix_millis_now(),
        };
        BestEffort::absorb(
            &format!("Failed to mirror response for {}", request.url),
            store.put(&record).await,
        )
    }

    async fn lookup(&self, request: &FetchRequest) -> Option<CachedResponse> {
        let store = self.store.as_ref()?;
        match store.get::<CachedResponse>(request.cache_key()).await {
            Ok(cached) => cached,
            Err(error) => {
                tracing::warn!("Cache lookup for {} failed: {}", request.url, error);
                None
            }
        }
    }

    async fn fetch_read(&self, request: &FetchRequest) -> Result<FetchResponse> {
        let error = match self.inner.fetch(request).await {
            Ok(mut response) => {
                if response.is_success() {
                    response.mirror = Some(self.mirror(request, &response).await);
                }
                return Ok(response);
            }
            Err(error) => error,
        };

        if !error.is_network() || self.connectivity.is_online() {
            return Err(error);
        }

        let Some(cached) = self.lookup(request).await else {
            return Err(Error::Offline(error.to_string()));
        };

        tracing::info!(
            "Serving cached response for {} (cached at {})",
            request.url,
            cached.cached_at
        );
        Ok(FetchResponse {
            status: 200,
            content_type: Some(
                cached
                    .content_type
                    .unwrap_or_else(|| SYNTHESIZED_CONTENT_TYPE.to_string()),
            ),
            body: serde_json::to_vec(&cached.body)?,
            source: ResponseSource::Cache {
                cached_at: cached.cached_at,
            },
            mirror: None,
        })
    }
}

impl<F: Fetch> Fetch for CachedFetcher<F> {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        if request.is_read() {
            self.fetch_read(request).await
        } else {
            self.inner.fetch(request).await
        }
    }
}
