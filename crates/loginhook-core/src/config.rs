//! Runtime settings for the login hook.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. These are the ambient knobs (browser
//! timeouts, engine API location); the credentials themselves come in
//! through [`crate::AuthConfig`].

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main runtime configuration.
///
/// This is loaded from `~/.config/loginhook/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Browser automation settings
    pub browser: BrowserSettings,
    /// Scanning engine API settings
    pub zap: ZapSettings,
}

impl RuntimeConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file, falling back to defaults if it is absent.
    pub fn load_from(config_path: &Path) -> ConfigResult<Self> {
        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `LOGINHOOK_HEADLESS`: Override browser headless mode (true/false)
    /// - `LOGINHOOK_SETTLE_TIMEOUT_SECS`: Override the post-submit settle timeout
    /// - `LOGINHOOK_ZAP_API_URL`: Override the engine API base URL
    /// - `LOGINHOOK_ZAP_API_KEY`: Engine API key
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("LOGINHOOK_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Some(val) = lookup("LOGINHOOK_SETTLE_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                self.browser.settle_timeout_secs = secs;
                tracing::debug!("Override browser.settle_timeout_secs from env: {}", secs);
            }
        }

        if let Some(val) = lookup("LOGINHOOK_ZAP_API_URL") {
            tracing::debug!("Override zap.api_url from env: {}", val);
            self.zap.api_url = val;
        }

        if let Some(val) = lookup("LOGINHOOK_ZAP_API_KEY") {
            self.zap.api_key = Some(val);
        }
    }

    /// Reject settings that would make every wait fail immediately.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.browser.navigation_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "browser.navigation_timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.browser.settle_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "browser.settle_timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.browser.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "browser.poll_interval_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/loginhook/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("org", "loginhook", "loginhook").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// Upper bound on waiting for the page to settle after a submit
    pub settle_timeout_secs: u64,
    /// Interval between page-state polls while waiting
    pub poll_interval_ms: u64,
}

impl BrowserSettings {
    /// Navigation timeout as a `Duration`.
    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    /// Settle timeout as a `Duration`.
    #[must_use]
    pub fn settle_timeout(&self) -> Duration {
        Duration::from_secs(self.settle_timeout_secs)
    }

    /// Poll interval as a `Duration`.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            navigation_timeout_secs: 30,
            settle_timeout_secs: 10,
            poll_interval_ms: 250,
        }
    }
}

/// Scanning engine API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZapSettings {
    /// Base URL of the engine's JSON API
    pub api_url: String,
    /// API key (usually supplied through the environment, not the file)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Name of the HTTP session the login is bridged into
    pub session_name: String,
    /// Name of the context carrying the exclusion rules
    pub context_name: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ZapSettings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            api_key: None,
            session_name: "auth-session".to_string(),
            context_name: "auth".to_string(),
            timeout_secs: 30,
        }
    }
}
