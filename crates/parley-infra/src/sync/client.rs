//! Shared HTTP plumbing for the REST shims.
//!
//! The optional API token is wrapped in [`secrecy::SecretString`] and only
//! exposed when building the `Authorization` header.

use std::time::Duration;

use parley_types::config::ServerConfig;
use parley_types::error::SyncError;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

/// reqwest client bound to one server base URL.
///
/// Does not derive `Debug` so the token cannot leak through logs.
#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<SecretString>,
}

impl RestClient {
    pub fn new(config: &ServerConfig, token: Option<SecretString>) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncError::Connection(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Build a client, reading the token from the environment variable named
    /// by `config.token_env` when it is set and non-empty.
    pub fn from_config(config: &ServerConfig) -> Result<Self, SyncError> {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from);
        Self::new(config, token)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Send a request and map transport failures and non-2xx statuses.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, SyncError> {
        let response = request
            .send()
            .await
            .map_err(|e| SyncError::Connection(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(SyncError::NotFound);
        }
        let message = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, body = %message, "server error response");
        Err(SyncError::Server {
            status: status.as_u16(),
            message,
        })
    }

    /// Send a request and decode a JSON body.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, SyncError> {
        let response = self.send(request).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SyncError::Connection(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| SyncError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> ServerConfig {
        ServerConfig {
            base_url: base_url.to_string(),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn url_joins_without_double_slash() {
        let client = RestClient::new(&config("http://localhost:9/api/"), None).unwrap();
        assert_eq!(client.base_url(), "http://localhost:9/api");
        assert_eq!(client.url("/balance"), "http://localhost:9/api/balance");
        assert_eq!(client.url("messages/3"), "http://localhost:9/api/messages/3");
    }

    #[test]
    fn from_config_without_token_env() {
        let config = ServerConfig {
            token_env: "PARLEY_TEST_TOKEN_THAT_IS_NEVER_SET".to_string(),
            ..config("http://localhost:9")
        };
        let client = RestClient::from_config(&config).unwrap();
        assert!(client.token.is_none());
    }
}
