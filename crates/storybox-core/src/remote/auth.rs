//! Login and registration against the story API.

use serde::Deserialize;

use super::envelope::{check_status, decode};
use crate::error::{Error, Result};
use crate::fetch::{Fetch, FetchRequest, RequestBody};

/// Normalized login response.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginResult {
    pub user_id: Option<String>,
    pub name: String,
    pub token: String,
}

impl std::fmt::Debug for LoginResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResult")
            .field("user_id", &self.user_id)
            .field("name", &self.name)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginPayload {
    #[serde(default)]
    user_id: Option<String>,
    name: String,
    token: String,
}

/// The two login shapes the API has been observed to return.
#[derive(Deserialize)]
#[serde(untagged)]
enum LoginBody {
    Nested {
        #[serde(rename = "loginResult")]
        login_result: LoginPayload,
    },
    Flat(LoginPayload),
}

impl From<LoginBody> for LoginResult {
    fn from(body: LoginBody) -> Self {
        let (LoginBody::Nested {
            login_result: payload,
        }
        | LoginBody::Flat(payload)) = body;
        Self {
            user_id: payload.user_id,
            name: payload.name,
            token: payload.token,
        }
    }
}

/// Client for the unauthenticated account endpoints
#[derive(Debug, Clone)]
pub struct AuthClient<F> {
    fetcher: F,
    base_url: String,
}

impl<F: Fetch> AuthClient<F> {
    pub fn new(fetcher: F, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult> {
        let email = email.trim();
        if email.is_empty() || password.trim().is_empty() {
            return Err(Error::Validation("email and password are required".into()));
        }

        let request = FetchRequest::post(
            format!("{}/login", self.base_url),
            RequestBody::Json(serde_json::json!({
                "email": email,
                "password": password.trim(),
            })),
        );
        let response = self.fetcher.fetch(&request).await?;
        check_status(&response)?;

        let body: LoginBody = decode(&response).map_err(|error| match error {
            Error::MalformedResponse(_) => {
                Error::MalformedResponse("login response carries no token".into())
            }
            other => other,
        })?;
        let result = LoginResult::from(body);
        tracing::info!("Logged in as {}", result.name);
        Ok(result)
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<()> {
        if name.trim().is_empty() || email.trim().is_empty() {
            return Err(Error::Validation("name and email are required".into()));
        }
        if password.len() < 8 {
            return Err(Error::Validation(
                "password must be at least 8 characters".into(),
            ));
        }

        let request = FetchRequest::post(
            format!("{}/register", self.base_url),
            RequestBody::Json(serde_json::json!({
                "name": name.trim(),
                "email": email.trim(),
                "password": password,
            })),
        );
        let response = self.fetcher.fetch(&request).await?;
        check_status(&response)?;
        decode::<serde_json::Value>(&response)?;
        Ok(())
    }
}
