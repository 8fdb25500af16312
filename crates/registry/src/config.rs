use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use adapter_api::ClientSettings;
use dirs_next::{config_dir, home_dir};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

/// Environment variable that points at an alternate config file.
pub const CONFIG_PATH_ENV: &str = "ADAPTER_REGISTRY_CONFIG_PATH";
/// Environment variable that overrides [`RegistryConfig::api_base`].
pub const API_BASE_ENV: &str = "ADAPTER_API_BASE";
/// Base URL used when neither the config file nor the environment set one.
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:5000/api";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings for reaching the adapter backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Base URL the `/adapters` path is appended to
    pub api_base: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Overrides the default User-Agent header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Permit plain `http` for non-localhost backends
    pub allow_insecure: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: None,
            allow_insecure: false,
        }
    }
}

impl RegistryConfig {
    /// Load from [`default_config_path`] and apply environment overrides.
    ///
    /// A missing file silently yields defaults; an unreadable or malformed
    /// one is logged and also yields defaults.
    pub fn load() -> Self {
        Self::load_from_path(&default_config_path()).with_env_overrides()
    }

    /// Load from an explicit path without consulting the environment.
    pub fn load_from_path(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(error) => {
                warn!(path = %path.display(), %error, "could not read registry config; using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(error) => {
                warn!(path = %path.display(), %error, "malformed registry config; using defaults");
                Self::default()
            }
        }
    }

    /// Apply `ADAPTER_API_BASE` when it is set and non-blank.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(api_base) = env::var(API_BASE_ENV)
            && !api_base.trim().is_empty()
        {
            self.api_base = api_base.trim().to_string();
        }
        self
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to_path(&default_config_path())
    }

    /// Write the config as pretty JSON, creating parent directories.
    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Settings for building the HTTP client.
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.api_base.clone(),
            timeout: self.request_timeout(),
            user_agent: self.user_agent.clone(),
            allow_insecure: self.allow_insecure,
        }
    }
}

/// Get the default path for the registry configuration file.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("adapter-registry")
        .join("config.json")
}

fn expand_tilde(path: &str) -> PathBuf {
    let trimmed = path.trim();
    if trimmed == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = trimmed.strip_prefix("~/")
        && let Some(home) = home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(trimmed)
}
