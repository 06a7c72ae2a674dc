// ------------------------------------------------------------
// Module declarations
// ------------------------------------------------------------
//
// Each module represents a well-defined responsibility:
//
// - config:     Configuration structs loaded from JSON
// - schema:     Price point and average report definitions
// - errors:     Fetch / aggregation / config error types
// - util:       Shared helper utilities (time formatting)
// - metrics:    Lock-free runtime counters
// - source:     Price sources (HTTP fetch + retry/backoff)
// - aggregator: Bounded time series and windowed queries
// - collector:  Periodic fetch-and-record loop
//
pub mod aggregator;
pub mod collector;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod schema;
pub mod source;
pub mod util;

pub use aggregator::{PriceBoard, PriceRecorder};
pub use collector::{Collector, CollectorState, CollectorSummary};
pub use config::Config;
pub use errors::{AggregatorError, ConfigError, FetchError};
pub use schema::{AverageOutcome, AverageReport, PricePoint};
pub use source::{HttpPriceSource, PriceSource, RetryPolicy};
