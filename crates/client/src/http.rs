//! HTTP client for the dashboard endpoints.

use crate::ws::http_to_ws_scheme;
use anyhow::{Context, Result};
use mcdash_net::{decode_status, PlayerDetail, StatusDecode};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Why a login attempt failed.
#[derive(Debug, Error)]
pub enum LoginError {
    /// The server rejected the password.
    #[error("wrong password")]
    WrongPassword,
    /// The server refuses more sessions.
    #[error("session limit reached")]
    LimitReached,
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Anything the server reported that we do not recognize.
    #[error("login failed: {0}")]
    Unknown(String),
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl LoginResponse {
    fn into_key(self) -> Result<String, LoginError> {
        if self.success {
            return match self.key {
                Some(key) if !key.is_empty() => Ok(key),
                _ => Err(LoginError::Unknown("response carried no key".to_string())),
            };
        }
        match self.error.as_deref() {
            Some("wrong_password") => Err(LoginError::WrongPassword),
            Some("limit") => Err(LoginError::LimitReached),
            Some(other) => Err(LoginError::Unknown(other.to_string())),
            None => Err(LoginError::Unknown("no error reported".to_string())),
        }
    }
}

/// Client for one dashboard server.
#[derive(Debug, Clone)]
pub struct DashboardClient {
    client: Client,
    base_url: String,
}

impl DashboardClient {
    /// Build a client whose every request is bounded by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(client, base_url))
    }

    /// Wrap a pre-configured HTTP client.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// WebSocket URL of the admin hub.
    pub fn hub_url(&self) -> String {
        format!("{}/hub", http_to_ws_scheme(&self.base_url))
    }

    /// Raw body of `GET /status`. An empty body means the game server is offline.
    pub async fn fetch_status_bytes(&self) -> Result<Vec<u8>> {
        let url = format!("{}/status", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;
        if !response.status().is_success() {
            anyhow::bail!("Status request failed: {}", response.status());
        }
        let body = response
            .bytes()
            .await
            .context("Failed to read status body")?;
        debug!(len = body.len(), "Fetched status payload");
        Ok(body.to_vec())
    }

    /// Fetch and decode the status payload; `None` means offline.
    pub async fn fetch_status(&self) -> Result<Option<StatusDecode>> {
        let bytes = self.fetch_status_bytes().await?;
        Ok(decode_status(&bytes))
    }

    /// Fetch `GET /player_<id>.json`.
    pub async fn fetch_player(&self, id: u32) -> Result<PlayerDetail> {
        let url = format!("{}/player_{id}.json", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;
        if !response.status().is_success() {
            anyhow::bail!("Player {id} request failed: {}", response.status());
        }
        let text = response
            .text()
            .await
            .context("Failed to read player body")?;
        PlayerDetail::from_json(&text).with_context(|| format!("Invalid detail for player {id}"))
    }

    /// Exchange the admin password for a session key.
    pub async fn login(&self, password: &str) -> Result<String, LoginError> {
        let url = format!("{}/login", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "password": password }))
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        let parsed: LoginResponse = serde_json::from_str(&text)
            .map_err(|err| LoginError::Unknown(format!("{status}: {err}")))?;
        let key = parsed.into_key()?;
        info!("Login accepted");
        Ok(key)
    }
}
