//! Messenger configuration

use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Messenger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessengerConfig {
    /// Buffer size of each subscriber endpoint (0 = rendezvous delivery)
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Drop broadcasts to endpoints whose buffer is full instead of waiting
    ///
    /// Ignored when `capacity` is 0.
    #[serde(default = "default_drop_on_full")]
    pub drop_on_full: bool,

    /// Channel buffer size for requests to the monitor task
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer: usize,
}

fn default_capacity() -> usize {
    debug!("default_capacity: called");
    0
}

fn default_drop_on_full() -> bool {
    debug!("default_drop_on_full: called");
    false
}

fn default_channel_buffer() -> usize {
    debug!("default_channel_buffer: called");
    64
}

impl Default for MessengerConfig {
    fn default() -> Self {
        debug!("MessengerConfig::default: called");
        Self {
            capacity: default_capacity(),
            drop_on_full: default_drop_on_full(),
            channel_buffer: default_channel_buffer(),
        }
    }
}

impl MessengerConfig {
    /// Create a config with the given endpoint capacity and drop policy
    pub fn new(capacity: usize, drop_on_full: bool) -> Self {
        debug!(%capacity, %drop_on_full, "MessengerConfig::new: called");
        Self {
            capacity,
            drop_on_full,
            ..Default::default()
        }
        .normalized()
    }

    /// Apply the rules the monitor relies on
    ///
    /// Dropping is meaningless without a buffer, so `capacity == 0` forces
    /// `drop_on_full = false`. The request channel always has room for one request.
    pub fn normalized(mut self) -> Self {
        debug!(capacity = %self.capacity, drop_on_full = %self.drop_on_full, "MessengerConfig::normalized: called");
        if self.capacity == 0 && self.drop_on_full {
            debug!("MessengerConfig::normalized: zero capacity, disabling drop_on_full");
            self.drop_on_full = false;
        }
        self.channel_buffer = self.channel_buffer.max(1);
        self
    }

    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        debug!(?path, "MessengerConfig::load: called");
        if let Some(config_path) = path {
            return Self::load_from(config_path);
        }

        // Try default locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("messenger").join("config.yml")),
            Some(PathBuf::from("messenger.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                debug!(path = %path.display(), "MessengerConfig::load: found default config");
                return Self::load_from(path);
            }
        }

        debug!("MessengerConfig::load: no config file, using defaults");
        Ok(Self::default())
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: MessengerConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config.normalized())
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "MessengerConfig::save: called");
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }
}
