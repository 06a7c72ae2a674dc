use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::errors::ConfigError;

/// Default number of samples kept in memory.
pub const DEFAULT_BUFFER_CAPACITY: usize = 100;

/// Default retry budget for one logical fetch (4 attempts total).
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default per-attempt HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default window used by the periodic average report (10 minutes).
pub const DEFAULT_AVERAGE_WINDOW_SECS: u64 = 600;

// ------------------------------------------------------------
// Root configuration
// ------------------------------------------------------------
//
// This is the top-level configuration structure loaded from
// `config.json`.
//
// It defines:
// - Upstream price API settings
// - Collector timing and buffer size
// - Optional debug configuration
//
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Upstream price source
    pub price_api: PriceApiConfig,

    /// Collector loop and buffer settings
    pub collector: CollectorConfig,

    /// Optional debug configuration
    pub debug: Option<DebugConfig>,
}

impl Config {
    /// Presence checks only. Values are otherwise taken as given.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.price_api.validate()?;
        self.collector.validate()
    }

    pub fn debug_log(&self) -> bool {
        self.debug.as_ref().is_some_and(|d| d.log.unwrap_or(false))
    }
}

// ------------------------------------------------------------
// Price API configuration
// ------------------------------------------------------------
//
// Defines how the fetcher reaches the upstream price source.
//
// Notes:
// - `api_key` is security-sensitive and must never be committed.
// - The credential is sent as: Authorization: <scheme> <api_key>
// - `Debug` output redacts the key.
//
#[derive(Deserialize, Clone)]
pub struct PriceApiConfig {
    /// URL of the upstream price endpoint
    pub endpoint: String,

    /// Credential value
    pub api_key: String,

    /// Authorization scheme (e.g. "Bearer", "ApiKey")
    pub scheme: String,

    /// Timeout applied to every single HTTP attempt
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retries after the first attempt on transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl PriceApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Missing("price_api.endpoint"));
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("price_api.api_key"));
        }
        if self.scheme.trim().is_empty() {
            return Err(ConfigError::Missing("price_api.scheme"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::TooSmall {
                name: "price_api.request_timeout_secs",
                min: 1,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for PriceApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriceApiConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("scheme", &self.scheme)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

// ------------------------------------------------------------
// Collector configuration
// ------------------------------------------------------------
//
// Controls the tick period of the collection loop and the
// size of the in-memory history.
//
#[derive(Debug, Deserialize, Clone)]
pub struct CollectorConfig {
    /// Tick period of the collector loop
    pub interval_in_seconds: u64,

    /// Maximum number of retained samples
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Window of the periodic average report
    #[serde(default = "default_average_window_secs")]
    pub average_window_secs: u64,
}

impl CollectorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_in_seconds)
    }

    pub fn average_window(&self) -> Duration {
        Duration::from_secs(self.average_window_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_in_seconds == 0 {
            return Err(ConfigError::TooSmall {
                name: "collector.interval_in_seconds",
                min: 1,
            });
        }
        if self.buffer_capacity == 0 {
            return Err(ConfigError::TooSmall {
                name: "collector.buffer_capacity",
                min: 1,
            });
        }
        Ok(())
    }
}

// ------------------------------------------------------------
// Debug configuration
// ------------------------------------------------------------
//
// Optional debug flags used during development and testing.
//
#[derive(Debug, Deserialize, Clone)]
pub struct DebugConfig {
    /// Enables debug-level logging (overridden by RUST_LOG)
    pub log: Option<bool>,
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

fn default_average_window_secs() -> u64 {
    DEFAULT_AVERAGE_WINDOW_SECS
}
