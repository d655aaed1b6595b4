//! Transport abstraction for remote calls.
//!
//! Every HTTP call made by the library goes through [`Fetch`], so the
//! cache-aside policy and the tests can sit between callers and the network.

use std::time::Duration;

use reqwest::multipart;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::outcome::BestEffort;
use crate::util::compact_text;

/// HTTP method of a [`FetchRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

/// File attached to a multipart body.
#[derive(Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for FilePart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilePart")
            .field("field", &self.field)
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Multipart form: text fields plus at most one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartBody {
    pub fields: Vec<(String, String)>,
    pub file: Option<FilePart>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Multipart(MultipartBody),
}

/// A transport-agnostic request.
#[derive(Clone, PartialEq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub bearer: Option<String>,
    pub body: Option<RequestBody>,
}

impl std::fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .field("body", &self.body)
            .finish()
    }
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            bearer: None,
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: RequestBody) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            bearer: None,
            body: Some(body),
        }
    }

    pub fn delete(url: impl Into<String>, body: Option<RequestBody>) -> Self {
        Self {
            method: Method::Delete,
            url: url.into(),
            bearer: None,
            body,
        }
    }

    #[must_use]
    pub fn with_bearer(mut self, token: Option<&str>) -> Self {
        self.bearer = token.map(ToString::to_string);
        self
    }

    /// Whether the request only reads remote state
    pub const fn is_read(&self) -> bool {
        matches!(self.method, Method::Get)
    }

    /// Identity under which a response to this request is mirrored
    pub fn cache_key(&self) -> String {
        format!("{} {}", self.method.as_str(), self.url)
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    /// Synthesized from a mirrored response written at `cached_at` (Unix ms)
    Cache { cached_at: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub source: ResponseSource,
    /// Outcome of mirroring this response, when a mirror was attempted
    pub mirror: Option<BestEffort>,
}

impl FetchResponse {
    pub fn network(status: u16, content_type: Option<String>, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type,
            body,
            source: ResponseSource::Network,
            mirror: None,
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    pub const fn is_cached(&self) -> bool {
        matches!(self.source, ResponseSource::Cache { .. })
    }

    /// Whether the declared content type is JSON
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|value| value.to_ascii_lowercase().contains("json"))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|error| {
            Error::MalformedResponse(format!(
                "HTTP {} body is not the expected JSON ({error}): {}",
                self.status,
                compact_text(&self.text())
            ))
        })
    }
}

/// Capability to perform a remote request.
#[allow(async_fn_in_trait)]
pub trait Fetch {
    /// Perform the request.
    ///
    /// Transport failures are `Error::Network`; any HTTP status, success or
    /// not, is returned as a response.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse>;
}

/// `Fetch` over a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| Error::Network(format!("failed to construct HTTP client: {error}")))?;
        Ok(Self { client })
    }

    fn build(&self, request: &FetchRequest) -> Result<reqwest::RequestBuilder> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };
        builder = builder.header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        match &request.body {
            None => {}
            Some(RequestBody::Json(value)) => builder = builder.json(value),
            Some(RequestBody::Multipart(body)) => {
                let mut form = multipart::Form::new();
                for (name, value) in &body.fields {
                    form = form.text(name.clone(), value.clone());
                }
                if let Some(file) = &body.file {
                    let part = multipart::Part::bytes(file.bytes.clone())
                        .file_name(file.file_name.clone())
                        .mime_str(&file.mime_type)
                        .map_err(|error| {
                            Error::InvalidInput(format!(
                                "invalid mime type '{}': {error}",
                                file.mime_type
                            ))
                        })?;
                    form = form.part(file.field.clone(), part);
                }
                builder = builder.multipart(form);
            }
        }
        Ok(builder)
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        tracing::debug!("{} {}", request.method.as_str(), request.url);

        let response = self.build(request)?.send().await.map_err(|error| {
            Error::Network(format!(
                "{} {} failed: {error}",
                request.method.as_str(),
                request.url
            ))
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|error| Error::Network(format!("failed to read response body: {error}")))?;

        Ok(FetchResponse::network(status, content_type, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_combines_method_and_url() {
        let request = FetchRequest::get("https://api.test/v1/stories?location=1");
        assert_eq!(request.cache_key(), "GET https://api.test/v1/stories?location=1");
        assert!(request.is_read());
        assert!(!FetchRequest::delete("https://api.test", None).is_read());
    }

    #[test]
    fn debug_redacts_bearer_token() {
        let request = FetchRequest::get("https://api.test").with_bearer(Some("secret-token"));
        let debug = format!("{request:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn json_decode_failure_is_malformed_response() {
        let response = FetchResponse::network(200, Some("text/html".into()), b"<html>".to_vec());
        assert!(!response.is_json());
        let error = response.json::<serde_json::Value>().unwrap_err();
        assert!(matches!(error, Error::MalformedResponse(_)));
    }

    #[test]
    fn success_range() {
        assert!(FetchResponse::network(201, None, Vec::new()).is_success());
        assert!(!FetchResponse::network(404, None, Vec::new()).is_success());
    }

    #[test]
    fn multipart_request_builds() {
        let fetcher = HttpFetcher::new(Duration::from_secs(1)).unwrap();
        let request = FetchRequest::post(
            "https://api.test/v1/stories",
            RequestBody::Multipart(MultipartBody {
                fields: vec![("description".into(), "hello".into())],
                file: Some(FilePart {
                    field: "photo".into(),
                    file_name: "photo.jpg".into(),
                    mime_type: "image/jpeg".into(),
                    bytes: vec![1, 2, 3],
                }),
            }),
        );
        assert!(fetcher.build(&request).is_ok());
    }
}
