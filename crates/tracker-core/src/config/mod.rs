//! Loader configuration.
//!
//! Read from the `[loader]` section of `~/.tracker/config.toml`. A missing
//! file or section yields defaults; an unreadable or unparsable file is
//! logged and also yields defaults. Only out-of-range values are errors.

pub mod errors;

pub use errors::ConfigError;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracker_paths::TrackerPaths;

/// Default request queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

const MAX_QUEUE_CAPACITY: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Bounded request queue size. Fixed for the lifetime of a loader.
    /// Default: 100
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Time in seconds each teardown hook may take before it is abandoned.
    /// Default: 5
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl LoaderConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidConfiguration {
                message: "queue_capacity must be > 0".to_string(),
            });
        }
        if self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(ConfigError::InvalidConfiguration {
                message: format!("queue_capacity must be <= {}", MAX_QUEUE_CAPACITY),
            });
        }
        if self.shutdown_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfiguration {
                message: "shutdown_timeout_secs must be > 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn shutdown_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_shutdown_timeout_secs() -> u64 {
    5
}

/// Mirrors just enough of the config file to extract the `[loader]` section.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    loader: LoaderConfig,
}

/// Load loader configuration from `~/.tracker/config.toml`.
pub fn load_loader_config() -> Result<LoaderConfig, ConfigError> {
    let config_path = TrackerPaths::resolve()
        .unwrap_or_else(|e| {
            tracing::warn!(
                event = "core.config.home_dir_fallback",
                error = %e,
                fallback = "/tmp/.tracker",
            );
            TrackerPaths::resolve_or_tmp()
        })
        .user_config();
    load_loader_config_from(&config_path)
}

/// Load loader configuration from an explicit file.
pub fn load_loader_config_from(config_path: &Path) -> Result<LoaderConfig, ConfigError> {
    let config = match std::fs::read_to_string(config_path) {
        Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
            Ok(file) => file.loader,
            Err(e) => {
                tracing::warn!(
                    event = "core.config.parse_failed",
                    path = %config_path.display(),
                    error = %e,
                );
                LoaderConfig::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => LoaderConfig::default(),
        Err(e) => {
            tracing::warn!(
                event = "core.config.read_failed",
                path = %config_path.display(),
                error = %e,
            );
            LoaderConfig::default()
        }
    };
    config.validate()?;
    Ok(config)
}
