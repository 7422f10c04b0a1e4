//! Remote last-item lookup
//!
//! Queries an authoritative HTTP endpoint for the last known record. This
//! is independent of the in-process store: nothing here reads or writes it.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::RemoteConfig;
use crate::domain::{DecodeError, Record};

/// Errors from the remote lookup
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("API token not found. Set the {0} environment variable or add it to .env.")]
    MissingToken(String),

    #[error("Server returned status {status}")]
    Status { status: u16 },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(#[from] DecodeError),
}

/// Bearer-authenticated client for the last-item endpoint
pub struct LastItemClient {
    url: String,
    token: String,
    http: Client,
}

impl LastItemClient {
    /// Build a client, reading the bearer token from the configured variable
    pub fn from_config(config: &RemoteConfig) -> Result<Self, RemoteError> {
        debug!(url = %config.url, token_env = %config.token_env, "LastItemClient::from_config: called");
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RemoteError::MissingToken(config.token_env.clone()))?;

        Self::new(&config.url, token, Duration::from_millis(config.timeout_ms))
    }

    pub fn new(url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            token: token.into(),
            http,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the last known record from the remote source
    pub async fn fetch_last(&self) -> Result<Record, RemoteError> {
        debug!(url = %self.url, "fetch_last: called");
        let response = self.http.get(&self.url).bearer_auth(&self.token).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %self.url, %status, "Remote lookup returned non-success status");
            return Err(RemoteError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        Ok(Record::decode(&body)?)
    }
}
