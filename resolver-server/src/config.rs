//! Access configuration: the password and API key guarding the service.
//!
//! The values live in a small JSON file. Handlers never read the file; they
//! read a [`SharedAccessConfig`] handle that a background task refreshes from
//! disk and that admin updates write through.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

pub const DEFAULT_ACCESS_PASSWORD: &str = "douyin123";
pub const DEFAULT_API_KEY: &str = "your_api_key_here";
pub const DEFAULT_ACCESS_CONFIG_PATH: &str = "config/api_config.json";
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    pub access_password: String,
    pub api_key: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            access_password: DEFAULT_ACCESS_PASSWORD.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
        }
    }
}

/// JSON file holding the [`AccessConfig`].
#[derive(Debug, Clone)]
pub struct AccessConfigStore {
    path: PathBuf,
}

impl AccessConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<AccessConfig> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| Error::io(&self.path, e))?;
        serde_json::from_str(&raw).map_err(|source| Error::InvalidConfig {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(&self, config: &AccessConfig) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(config).map_err(|source| Error::InvalidConfig {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, json).map_err(|e| Error::io(&self.path, e))
    }

    /// Loads the file, or writes and returns the defaults when it is missing
    /// or unreadable.
    pub fn load_or_init(&self) -> AccessConfig {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Access config unavailable, writing defaults");
                let config = AccessConfig::default();
                if let Err(e) = self.save(&config) {
                    warn!(error = %e, "Failed to persist default access config");
                }
                config
            }
        }
    }
}

/// Live access configuration, shared between handlers.
#[derive(Debug, Clone, Default)]
pub struct SharedAccessConfig {
    inner: Arc<RwLock<AccessConfig>>,
}

impl SharedAccessConfig {
    pub fn new(config: AccessConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    pub fn snapshot(&self) -> AccessConfig {
        self.inner.read().clone()
    }

    pub fn replace(&self, config: AccessConfig) {
        *self.inner.write() = config;
    }

    pub fn password_matches(&self, candidate: &str) -> bool {
        self.inner.read().access_password == candidate
    }

    pub fn api_key_matches(&self, candidate: &str) -> bool {
        self.inner.read().api_key == candidate
    }
}

/// Reloads `shared` from `store` every `interval` until `cancel` fires.
///
/// A file that fails to load leaves the current value in place.
pub fn spawn_refresh(
    store: AccessConfigStore,
    shared: SharedAccessConfig,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Access config refresh stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match store.load() {
                        Ok(config) => {
                            if config != shared.snapshot() {
                                info!(path = %store.path().display(), "Access config reloaded");
                                shared.replace(config);
                            }
                        }
                        Err(e) => warn!(error = %e, "Access config refresh failed"),
                    }
                }
            }
        }
    })
}

/// Process settings read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub access_config_path: PathBuf,
    pub refresh_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            access_config_path: PathBuf::from(DEFAULT_ACCESS_CONFIG_PATH),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

impl ServerConfig {
    /// Supported env vars:
    /// - `ACCESS_CONFIG_PATH` (e.g. "/data/api_config.json")
    /// - `ACCESS_CONFIG_REFRESH_SECS` (e.g. "60")
    pub fn from_env_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("ACCESS_CONFIG_PATH")
            && !path.trim().is_empty()
        {
            config.access_config_path = PathBuf::from(path);
        }

        if let Ok(secs) = std::env::var("ACCESS_CONFIG_REFRESH_SECS")
            && let Ok(parsed) = secs.parse::<u64>()
            && parsed > 0
        {
            config.refresh_interval = Duration::from_secs(parsed);
        }

        config
    }
}
