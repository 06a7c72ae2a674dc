/// Collector module
///
/// This module groups all logic responsible for:
/// - Running the periodic fetch loop
/// - Feeding successful samples into the aggregator
/// - Absorbing fetch failures so the loop survives upstream outages
///
/// The collector layer acts as the orchestration layer between:
/// - A `PriceSource` (fetch + retry)
/// - The aggregator's `PriceRecorder` (the single writer)
///
/// Design notes:
/// - Upstream-specific logic MUST NOT live here
/// - Shutdown is cooperative and checked between cycles
pub mod runner;

pub use runner::{Collector, CollectorState, CollectorSummary};
