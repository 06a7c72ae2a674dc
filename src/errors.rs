//! Error types for the fetch and aggregation paths.
//!
//! Fetch errors never leave the collector loop; they are logged and the
//! cycle ends. `AggregatorError::NoData` is a normal empty result that the
//! query side turns into an explicit "no data" response.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failures of a single logical price fetch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Network failure, per-attempt timeout, 5xx or 404.
    ///
    /// Retried by the fetcher; only surfaced wrapped in `Unavailable`.
    #[error("transient upstream failure: {0}")]
    Transient(String),

    /// The response body is not a number. Never retried.
    #[error("could not parse price from response {body:?}: {reason}")]
    ParseFailure { body: String, reason: String },

    /// Upstream answered with a non-retryable status (401, 403, ...).
    #[error("upstream rejected the request with status {status}")]
    Rejected { status: u16 },

    /// Every attempt failed with a transient error.
    #[error("price source unavailable after {attempts} attempts: {last_error}")]
    Unavailable { attempts: u32, last_error: String },

    /// The HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Client(String),
}

impl FetchError {
    /// Whether the retry driver should try again after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }
}

/// Failures of a windowed query against the buffer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AggregatorError {
    #[error("no prices recorded between {start} and {end}")]
    NoData {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Presence checks on the loaded configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("setting `{name}` must be at least {min}")]
    TooSmall { name: &'static str, min: u64 },
}
