use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;

/// Global runtime metrics for the collector.
///
/// Purpose:
/// - Track fetch attempts and retries against the upstream
/// - Track failures by kind
/// - Track collector throughput (cycles / recorded samples)
///
/// Design:
/// - Lock-free (Atomics)
/// - Cheap to update
/// - Safe in async + multithreaded contexts
#[derive(Default)]
pub struct RuntimeMetrics {
    // Fetch level
    pub fetch_attempts: AtomicUsize,
    pub fetch_retries: AtomicUsize,
    pub fetch_failures: AtomicUsize,
    pub parse_errors: AtomicUsize,

    // Collector level
    pub cycles_completed: AtomicUsize,
    pub samples_recorded: AtomicUsize,
}

impl RuntimeMetrics {
    /// One-line summary for the periodic status log.
    pub fn summary(&self) -> String {
        format!(
            "attempts={} retries={} fetch_fail={} parse_err={} cycles={} recorded={}",
            self.fetch_attempts.load(Ordering::Relaxed),
            self.fetch_retries.load(Ordering::Relaxed),
            self.fetch_failures.load(Ordering::Relaxed),
            self.parse_errors.load(Ordering::Relaxed),
            self.cycles_completed.load(Ordering::Relaxed),
            self.samples_recorded.load(Ordering::Relaxed),
        )
    }
}

/// Global metrics registry (singleton)
pub static METRICS: Lazy<Arc<RuntimeMetrics>> =
    Lazy::new(|| Arc::new(RuntimeMetrics::default()));
