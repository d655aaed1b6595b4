//! Push subscription registration with the notification server.

use crate::error::{Error, Result};
use crate::fetch::{Fetch, FetchRequest, RequestBody};
use crate::models::PushSubscription;
use crate::push::PushRegistrar;
use crate::util::compact_text;

/// Registers subscriptions at `{base}/notifications/subscribe`.
///
/// The endpoint is optional on some deployments; every failure surfaces as
/// `RemoteRegistrationFailed` for the caller to absorb.
#[derive(Clone)]
pub struct HttpPushRegistrar<F> {
    fetcher: F,
    base_url: String,
    token: Option<String>,
}

impl<F> std::fmt::Debug for HttpPushRegistrar<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPushRegistrar")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl<F: Fetch> HttpPushRegistrar<F> {
    pub fn new(fetcher: F, base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }

    fn url(&self) -> String {
        format!("{}/notifications/subscribe", self.base_url)
    }

    async fn send(&self, request: FetchRequest) -> Result<()> {
        let request = request.with_bearer(self.token.as_deref());
        let response = self
            .fetcher
            .fetch(&request)
            .await
            .map_err(|error| Error::RemoteRegistrationFailed(error.to_string()))?;
        if response.is_success() {
            Ok(())
        } else {
            Err(Error::RemoteRegistrationFailed(format!(
                "HTTP {}: {}",
                response.status,
                compact_text(&response.text())
            )))
        }
    }
}

impl<F: Fetch> PushRegistrar for HttpPushRegistrar<F> {
    async fn register(&self, subscription: &PushSubscription) -> Result<()> {
        let body = serde_json::to_value(subscription)?;
        self.send(FetchRequest::post(self.url(), RequestBody::Json(body)))
            .await
    }

    async fn deregister(&self, endpoint: &str) -> Result<()> {
        let body = serde_json::json!({ "endpoint": endpoint });
        self.send(FetchRequest::delete(self.url(), Some(RequestBody::Json(body))))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Method;
    use crate::models::SubscriptionKeys;
    use crate::testing::FakeFetch;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn subscription() -> PushSubscription {
        PushSubscription {
            endpoint: "https://push.test/abc".into(),
            keys: SubscriptionKeys {
                p256dh: "p256".into(),
                auth: "auth".into(),
            },
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn register_posts_descriptor() {
        let registrar =
            HttpPushRegistrar::new(FakeFetch::new(), "https://api.test/v1", Some("token".into()));
        registrar
            .fetcher()
            .push_json(200, json!({ "error": false, "message": "Success to subscribe" }));

        registrar.register(&subscription()).await.unwrap();

        let requests = registrar.fetcher().requests();
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].url, "https://api.test/v1/notifications/subscribe");
        assert_eq!(
            requests[0].body,
            Some(RequestBody::Json(json!({
                "endpoint": "https://push.test/abc",
                "keys": { "p256dh": "p256", "auth": "auth" }
            })))
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_endpoint_is_registration_failure() {
        let registrar = HttpPushRegistrar::new(FakeFetch::new(), "https://api.test/v1", None);
        registrar.fetcher().push_json(404, json!({ "message": "Not Found" }));

        let error = registrar.deregister("https://push.test/abc").await.unwrap_err();
        assert!(matches!(error, Error::RemoteRegistrationFailed(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn transport_failure_is_registration_failure() {
        let registrar = HttpPushRegistrar::new(FakeFetch::new(), "https://api.test/v1", None);
        registrar.fetcher().push_network_error();

        let error = registrar.register(&subscription()).await.unwrap_err();
        assert!(matches!(error, Error::RemoteRegistrationFailed(_)));
    }
}
