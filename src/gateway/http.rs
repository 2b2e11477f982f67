//! HTTP transport for the auth endpoints.
//!
//! Thin `reqwest` wrapper over `POST {base}/login` and `POST {base}/register`.
//! Response classification lives in `classify_response` so it can be tested
//! without a server.

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;

use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;

use super::{AuthApi, GatewayError};
use crate::config::AuthConfig;
use crate::models::{AuthReply, LoginRequest, RegisterRequest};

pub struct HttpAuthApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    /// Client for `base_url` (e.g. `http://localhost:8080/api/auth`).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::HttpClientBuild`] if the client cannot be built.
    pub fn new(base_url: &str, request_timeout: Duration, connect_timeout: Duration) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| GatewayError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    /// # Errors
    ///
    /// Returns [`GatewayError::HttpClientBuild`] if the client cannot be built.
    pub fn from_config(config: &AuthConfig) -> Result<Self, GatewayError> {
        Self::new(
            &config.api_url,
            Duration::from_secs(config.timeouts.request_secs),
            Duration::from_secs(config.timeouts.connect_secs),
        )
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<AuthReply, GatewayError> {
        let url = endpoint(&self.base_url, path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        tracing::debug!(%url, status = status.as_u16(), "auth endpoint replied");
        classify_response(status, &text)
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, credentials: &LoginRequest) -> Result<AuthReply, GatewayError> {
        self.post("/login", credentials).await
    }

    async fn register(&self, profile: &RegisterRequest) -> Result<AuthReply, GatewayError> {
        self.post("/register", profile).await
    }
}

// =============================================================================
// PARSING
// =============================================================================

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{path}", base_url.trim_end_matches('/'))
}

/// Map an HTTP response onto a reply or a transport error.
fn classify_response(status: StatusCode, body: &str) -> Result<AuthReply, GatewayError> {
    if !status.is_success() {
        return Err(GatewayError::Status { status: status.as_u16(), message: failure_message(status, body) });
    }
    serde_json::from_str(body).map_err(|e| GatewayError::Parse(e.to_string()))
}

/// Prefer the server's `message` field, then a JSON string body, then the raw
/// body, then the reason phrase.
fn failure_message(status: StatusCode, body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct MessageOnly {
        message: String,
    }

    if let Ok(parsed) = serde_json::from_str::<MessageOnly>(body) {
        if !parsed.message.trim().is_empty() {
            return parsed.message;
        }
    }
    if let Ok(text) = serde_json::from_str::<String>(body) {
        if !text.trim().is_empty() {
            return text.trim().to_owned();
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() && !trimmed.starts_with(['{', '"']) {
        return trimmed.to_owned();
    }
    status.canonical_reason().unwrap_or("request failed").to_owned()
}
