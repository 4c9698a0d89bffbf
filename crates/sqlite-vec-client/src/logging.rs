//! Process-wide log output.
//!
//! The crate only emits `tracing` events; nothing is printed unless a
//! subscriber is installed. Applications that already install their own can
//! ignore this module. [`LogConfig::init`] installs a plain fmt subscriber
//! with the configured minimum level.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::error::{Result, VecClientError};

/// Environment variable read by [`LogConfig::from_env`].
pub const LOG_LEVEL_ENV: &str = "SQLITE_VEC_CLIENT_LOG_LEVEL";

const DEFAULT_LEVEL: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Minimum severity: `trace`, `debug`, `info`, `warn` (`warning`) or
    /// `error` (`critical`). Case-insensitive.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL.to_string(),
        }
    }
}

impl LogConfig {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
        }
    }

    /// Read the level from [`LOG_LEVEL_ENV`], defaulting to `warn`.
    pub fn from_env() -> Self {
        std::env::var(LOG_LEVEL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(Self::new)
            .unwrap_or_default()
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Parsed minimum level.
    pub fn max_level(&self) -> Result<Level> {
        parse_level(&self.level)
    }

    /// Install a global fmt subscriber. Returns `Ok(false)` if a subscriber
    /// was already installed (by an earlier call or by the application).
    pub fn init(&self) -> Result<bool> {
        let level = self.max_level()?;
        let installed = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(true)
            .try_init()
            .is_ok();
        if installed {
            tracing::debug!(%level, "logging initialized");
        }
        Ok(installed)
    }
}

fn parse_level(raw: &str) -> Result<Level> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "warning" => Ok(Level::WARN),
        "critical" | "fatal" => Ok(Level::ERROR),
        other => Level::from_str(other).map_err(|_| {
            VecClientError::Validation(format!(
                "unknown log level '{raw}', expected trace, debug, info, warn or error"
            ))
        }),
    }
}
