//! Handler configuration.
//!
//! Every timing constant the handler uses lives here with its production
//! default. Settings can be overridden from a JSON file, by default
//! `~/.appium-handler/config.json`.
//!
//! # Example
//!
//! ```no_run
//! use appium_handler_core::config::HandlerConfig;
//!
//! // Load (returns defaults if the file doesn't exist)
//! let config = HandlerConfig::load();
//! assert!(config.context.switch_retries > 0);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_DIR: &str = ".appium-handler";
const CONFIG_FILENAME: &str = "config.json";

/// Errors reading an explicit configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Timing of the hybrid WebView context acquisition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextTiming {
    /// Outer wall-clock budget for a WebView context to show up.
    pub deadline_ms: u64,
    /// Pause between two context listings.
    pub poll_ms: u64,
    /// Attempts at switching into a WebView once one is listed.
    pub switch_retries: u32,
    /// Pause before every switch attempt.
    pub settle_ms: u64,
}

impl Default for ContextTiming {
    fn default() -> Self {
        Self {
            deadline_ms: 15_000,
            poll_ms: 1_000,
            switch_retries: 5,
            settle_ms: 5_000,
        }
    }
}

impl ContextTiming {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Handler-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Server-side implicit wait applied to every element lookup.
    pub implicit_wait_secs: u64,
    /// Upper bound for a single HTTP request to the server.
    pub command_timeout_secs: u64,
    /// Reject an unknown `platformName` instead of falling back to Android.
    pub strict_platform: bool,
    pub context: ContextTiming,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            implicit_wait_secs: 35,
            command_timeout_secs: 120,
            strict_platform: false,
            context: ContextTiming::default(),
        }
    }
}

impl HandlerConfig {
    pub fn implicit_wait(&self) -> Duration {
        Duration::from_secs(self.implicit_wait_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// The default config file location, if a home directory is known.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILENAME))
    }

    /// Load config from `~/.appium-handler/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        Self::default_path()
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Load config from an explicit path, reporting why it could not be read.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
