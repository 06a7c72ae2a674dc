use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::sync::watch;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use crate::aggregator::PriceRecorder;
use crate::metrics::METRICS;
use crate::source::PriceSource;

/// Shortest tick period accepted by the loop.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Lifecycle of the collection loop.
///
/// ```text
/// Starting -> Sleeping -> Fetching -> Sleeping -> ... -> Stopped
/// ```
///
/// `Starting` runs the first cycle without waiting for a tick.
/// `Stopped` is only reachable from `Sleeping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Starting,
    Fetching,
    Sleeping,
    Stopped,
}

/// Counters returned when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectorSummary {
    pub cycles: u64,
    pub recorded: u64,
    pub failed: u64,
}

/// Periodic fetch-and-record loop.
///
/// GUARANTEES:
/// - At most one cycle in flight; a slow cycle delays the next tick
/// - A failed fetch never stops the loop and never touches the series
/// - Shutdown is honoured between cycles only; an in-flight fetch,
///   including its retry backoff, runs to completion first
///
pub struct Collector {
    source: Arc<dyn PriceSource>,
    recorder: PriceRecorder,
    interval: Duration,
    shutdown: CancellationToken,
    state_tx: watch::Sender<CollectorState>,
}

impl Collector {
    /// Takes ownership of the series' only writer.
    pub fn new(
        source: Arc<dyn PriceSource>,
        recorder: PriceRecorder,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        let (state_tx, _) = watch::channel(CollectorState::Starting);

        Self {
            source,
            recorder,
            interval: interval.max(MIN_INTERVAL),
            shutdown,
            state_tx,
        }
    }

    /// Observes state transitions of the loop.
    pub fn subscribe(&self) -> watch::Receiver<CollectorState> {
        self.state_tx.subscribe()
    }

    /// Runs until the shutdown token is cancelled.
    pub async fn run(self) -> CollectorSummary {
        log::info!(
            "collector started for {} (interval {:?})",
            self.source.name(),
            self.interval
        );

        let mut summary = CollectorSummary::default();

        // First tick one period out; the first cycle runs from `Starting`.
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut state = CollectorState::Starting;

        loop {
            self.state_tx.send_replace(state);

            state = match state {
                CollectorState::Starting | CollectorState::Fetching => {
                    self.run_cycle(&mut summary).await;
                    CollectorState::Sleeping
                }

                CollectorState::Sleeping => {
                    tokio::select! {
                        biased;
                        _ = self.shutdown.cancelled() => CollectorState::Stopped,
                        _ = ticker.tick() => CollectorState::Fetching,
                    }
                }

                CollectorState::Stopped => break,
            };
        }

        log::info!(
            "collector stopped after {} cycles ({} recorded, {} failed)",
            summary.cycles,
            summary.recorded,
            summary.failed
        );

        summary
    }

    /// One fetch-and-record cycle. Failures end the cycle quietly.
    async fn run_cycle(&self, summary: &mut CollectorSummary) {
        summary.cycles += 1;

        match self.source.fetch_price().await {
            Ok(point) => {
                log::debug!("[{}] price {} at {}", self.source.name(), point.value, point.timestamp);
                self.recorder.add_price(point);
                summary.recorded += 1;
                METRICS.samples_recorded.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                log::warn!("[{}] fetch failed, dataset unchanged: {}", self.source.name(), e);
                summary.failed += 1;
            }
        }

        METRICS.cycles_completed.fetch_add(1, Ordering::Relaxed);
    }
}
