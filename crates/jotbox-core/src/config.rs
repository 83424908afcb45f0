//! Runtime configuration for the note coordinator.
//!
//! Environment variables:
//!   JOTBOX_STORE_TIMEOUT_MS  - per store call timeout (default: 10000)
//!   JOTBOX_MAX_FILENAME_LEN  - maximum filename length in bytes (default: 1024)

use std::time::Duration;

use crate::defaults;
use crate::error::{Error, Result};

pub const ENV_STORE_TIMEOUT_MS: &str = "JOTBOX_STORE_TIMEOUT_MS";
pub const ENV_MAX_FILENAME_LEN: &str = "JOTBOX_MAX_FILENAME_LEN";

/// Coordinator tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Upper bound for a single store call; exceeding it is a connection error.
    pub store_timeout: Duration,
    /// Maximum filename length in bytes.
    pub max_filename_len: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_millis(defaults::STORE_TIMEOUT_MS),
            max_filename_len: defaults::FILENAME_MAX_LEN,
        }
    }
}

impl CoordinatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per store call timeout.
    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Set the maximum filename length in bytes.
    pub fn max_filename_len(mut self, len: usize) -> Self {
        self.max_filename_len = len;
        self
    }

    /// Build a config from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_STORE_TIMEOUT_MS) {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                Error::Config(format!("{} must be an integer, got {:?}", ENV_STORE_TIMEOUT_MS, raw))
            })?;
            if ms == 0 {
                return Err(Error::Config(format!(
                    "{} must be greater than zero",
                    ENV_STORE_TIMEOUT_MS
                )));
            }
            config.store_timeout = Duration::from_millis(ms);
        }

        if let Some(raw) = lookup(ENV_MAX_FILENAME_LEN) {
            let len: usize = raw.trim().parse().map_err(|_| {
                Error::Config(format!("{} must be an integer, got {:?}", ENV_MAX_FILENAME_LEN, raw))
            })?;
            if len == 0 || len > defaults::FILENAME_MAX_LEN {
                return Err(Error::Config(format!(
                    "{} must be between 1 and {}",
                    ENV_MAX_FILENAME_LEN,
                    defaults::FILENAME_MAX_LEN
                )));
            }
            config.max_filename_len = len;
        }

        Ok(config)
    }
}
