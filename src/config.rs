use anyhow::{Context, Result};
use mcdash_net::SessionLimits;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/mcdash.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Base URL of the dashboard server.
    pub server_url: String,
    /// Delay between the end of one status request and the start of the next.
    pub poll_interval_ms: u64,
    /// Upper bound for any single HTTP request.
    pub request_timeout_ms: u64,
    /// Pause before reopening a dropped hub connection.
    pub reconnect_delay_ms: u64,
    /// Log lines kept per hub session.
    pub log_capacity: usize,
    /// Commands awaiting a result; the oldest is dropped when full.
    pub pending_command_capacity: usize,
    /// Age at which a pending command is dropped. 0 disables expiry.
    pub pending_command_ttl_secs: u64,
    /// Where `login` stores the session key.
    pub session_key_path: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".to_string(),
            poll_interval_ms: mcdash_net::STATUS_POLL_INTERVAL_MS,
            request_timeout_ms: 5000,
            reconnect_delay_ms: 3000,
            log_capacity: 1000,
            pending_command_capacity: 256,
            pending_command_ttl_secs: 300,
            session_key_path: PathBuf::from("config/session.key"),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<DashboardConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    DashboardConfig::default()
                }
            },
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                } else if path != Path::new(DEFAULT_CONFIG_PATH) {
                    warn!(
                        "Dashboard config not found at {}. Using defaults",
                        path.display()
                    );
                }
                DashboardConfig::default()
            }
        }
    }

    /// Save configuration to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(100))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn session_limits(&self) -> SessionLimits {
        SessionLimits {
            log_capacity: self.log_capacity.max(1),
            pending_capacity: NonZeroUsize::new(self.pending_command_capacity)
                .unwrap_or(NonZeroUsize::MIN),
            pending_ttl: (self.pending_command_ttl_secs > 0)
                .then(|| Duration::from_secs(self.pending_command_ttl_secs)),
        }
    }

    /// Stored session key, if `login` has run.
    pub fn read_session_key(&self) -> Option<String> {
        match fs::read_to_string(&self.session_key_path) {
            Ok(contents) => {
                let key = contents.trim();
                (!key.is_empty()).then(|| key.to_string())
            }
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        "Failed to read session key {}: {err}",
                        self.session_key_path.display()
                    );
                }
                None
            }
        }
    }

    pub fn store_session_key(&self, key: &str) -> Result<()> {
        let path = &self.session_key_path;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, format!("{key}\n"))
            .with_context(|| format!("Failed to write session key {}", path.display()))
    }
}
