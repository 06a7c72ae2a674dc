//! Price aggregator
//!
//! Owns the bounded time series and answers queries against it.
//!
//! The state is split into two handles created together by [`new`]:
//! - [`PriceRecorder`]: the only writer, handed to the collector
//! - [`PriceBoard`]: cloneable read handle for any number of callers
//!
//! Insert and eviction happen under one write lock, so readers only ever
//! see the state after a completed `add_price`.

mod buffer;

pub use buffer::TimeSeriesBuffer;

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::errors::AggregatorError;
use crate::schema::{AverageOutcome, AverageReport, PricePoint};
use crate::util;

#[derive(Debug)]
struct SeriesState {
    buffer: TimeSeriesBuffer,

    /// Most recently inserted point (arrival order, not timestamp order)
    current: Option<PricePoint>,
}

#[derive(Debug)]
struct Shared {
    state: RwLock<SeriesState>,
}

impl Shared {
    // Nothing inside the lock can panic half-way through an update,
    // so a poisoned lock still guards a consistent state.
    fn read(&self) -> RwLockReadGuard<'_, SeriesState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SeriesState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Creates the aggregator for a series of at most `capacity` points.
pub fn new(capacity: usize) -> (PriceRecorder, PriceBoard) {
    let shared = Arc::new(Shared {
        state: RwLock::new(SeriesState {
            buffer: TimeSeriesBuffer::new(capacity),
            current: None,
        }),
    });

    (
        PriceRecorder {
            shared: shared.clone(),
        },
        PriceBoard { shared },
    )
}

// ------------------------------------------------------------
// Writer
// ------------------------------------------------------------

/// Write handle of the aggregator.
///
/// Deliberately not `Clone`: there is exactly one writer per series.
#[derive(Debug)]
pub struct PriceRecorder {
    shared: Arc<Shared>,
}

impl PriceRecorder {
    /// Records a sample.
    ///
    /// Evicts the oldest point first when the buffer is full, then
    /// inserts `point` and makes it the current price.
    pub fn add_price(&self, point: PricePoint) {
        let mut state = self.shared.write();

        if let Some(evicted) = state.buffer.push(point.clone()) {
            log::trace!("evicted price sampled at {}", evicted.timestamp);
        }
        state.current = Some(point);
    }
}

// ------------------------------------------------------------
// Readers
// ------------------------------------------------------------

/// Read handle of the aggregator.
///
/// Cheap to clone. Every method takes its own consistent view; two
/// calls may observe different states if the collector wrote between
/// them.
#[derive(Debug, Clone)]
pub struct PriceBoard {
    shared: Arc<Shared>,
}

impl PriceBoard {
    /// Copy of the retained points, in insertion order.
    pub fn snapshot(&self) -> Vec<PricePoint> {
        self.shared.read().buffer.to_vec()
    }

    /// Most recently recorded point, if any.
    pub fn current_price(&self) -> Option<PricePoint> {
        self.shared.read().current.clone()
    }

    pub fn len(&self) -> usize {
        self.shared.read().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.read().buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.shared.read().buffer.capacity()
    }

    /// Mean of the points sampled within `duration` before now.
    pub fn average_over(&self, duration: Duration) -> Result<AverageReport, AggregatorError> {
        self.average_over_at(duration, Utc::now())
    }

    /// Mean of the points with `now - duration <= timestamp <= now`.
    ///
    /// An empty window yields `AggregatorError::NoData`.
    pub fn average_over_at(
        &self,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> Result<AverageReport, AggregatorError> {
        let start = now
            .checked_sub_signed(util::to_chrono(duration))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let values: Vec<Decimal> = {
            let state = self.shared.read();
            state
                .buffer
                .iter()
                .filter(|p| p.timestamp >= start && p.timestamp <= now)
                .map(|p| p.value)
                .collect()
        };

        let Some(average) = mean(&values) else {
            return Err(AggregatorError::NoData { start, end: now });
        };

        Ok(AverageReport {
            average,
            start,
            end: now,
            count: values.len(),
        })
    }

    // --------------------------------------------------------
    // Query operations handed to the routing layer
    // --------------------------------------------------------

    /// Current price, or a zero-valued "price not yet available"
    /// placeholder before the first sample.
    pub fn get_current(&self) -> PricePoint {
        self.current_price()
            .unwrap_or_else(|| PricePoint::not_yet_available(Utc::now()))
    }

    /// Full ordered dataset.
    pub fn get_dataset(&self) -> Vec<PricePoint> {
        self.snapshot()
    }

    /// Average over `duration`, with an empty window reported as
    /// `AverageOutcome::NoData`.
    pub fn get_average(&self, duration: Duration) -> AverageOutcome {
        match self.average_over(duration) {
            Ok(report) => AverageOutcome::Report(report),
            Err(AggregatorError::NoData { start, end }) => AverageOutcome::NoData { start, end },
        }
    }
}

/// Arithmetic mean, or `None` for no values.
///
/// Sums exactly when the total fits in a `Decimal`. Otherwise adds up
/// `v / n` terms instead; the result is kept inside `[min, max]` of the
/// inputs, where the true mean always lies, so rounding near the type's
/// limits cannot overflow.
fn mean(values: &[Decimal]) -> Option<Decimal> {
    let count = Decimal::from(values.len());
    let (&first, rest) = values.split_first()?;

    let exact = rest
        .iter()
        .try_fold(first, |sum, &v| sum.checked_add(v));
    if let Some(sum) = exact {
        return Some(sum / count);
    }

    let (lo, hi) = rest
        .iter()
        .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let scaled = values
        .iter()
        .fold(Decimal::ZERO, |acc, &v| acc.saturating_add(v / count));

    Some(scaled.clamp(lo, hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::NOTE_NOT_AVAILABLE;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn at(value: i64, offset_secs: i64) -> PricePoint {
        PricePoint::from_api(Decimal::from(value), t0() + ChronoDuration::seconds(offset_secs))
    }

    #[test]
    fn size_stays_bounded_across_inserts() {
        let (recorder, board) = new(10);

        for i in 0..35 {
            recorder.add_price(at(i, i % 7));
            assert!(board.len() <= 10);
        }
        assert_eq!(board.len(), 10);
        assert_eq!(board.capacity(), 10);
    }

    #[test]
    fn current_follows_arrival_not_timestamp() {
        let (recorder, board) = new(10);

        recorder.add_price(at(1, 10));
        recorder.add_price(at(2, 5));

        assert_eq!(board.current_price(), Some(at(2, 5)));
    }

    #[test]
    fn current_is_kept_even_when_it_is_evicted_next() {
        let (recorder, board) = new(2);

        recorder.add_price(at(1, 10));
        recorder.add_price(at(2, 20));
        // oldest by timestamp, but it is the newest arrival
        recorder.add_price(at(3, 0));

        assert_eq!(board.current_price(), Some(at(3, 0)));
        assert_eq!(board.snapshot(), vec![at(2, 20), at(3, 0)]);
    }

    #[test]
    fn average_of_three_points() {
        let (recorder, board) = new(100);
        recorder.add_price(at(100, 0));
        recorder.add_price(at(200, 1));
        recorder.add_price(at(300, 2));

        let report = board
            .average_over_at(std::time::Duration::from_secs(3), t0() + ChronoDuration::seconds(2))
            .unwrap();

        assert_eq!(report.average, Decimal::from(200));
        assert_eq!(report.count, 3);
        assert_eq!(report.start, t0() - ChronoDuration::seconds(1));
        assert_eq!(report.end, t0() + ChronoDuration::seconds(2));
    }

    #[test]
    fn near_maximum_prices_average_without_overflow() {
        let (recorder, board) = new(100);
        let huge = Decimal::from_str_exact("50000000000000000000000000000").unwrap();
        recorder.add_price(PricePoint::from_api(huge, t0()));
        recorder.add_price(PricePoint::from_api(huge, t0()));

        let report = board
            .average_over_at(std::time::Duration::from_secs(60), t0())
            .unwrap();

        assert_eq!(report.count, 2);
        assert_eq!(report.average, huge);
    }

    #[test]
    fn extreme_prices_stay_within_their_range() {
        let (recorder, board) = new(100);
        recorder.add_price(PricePoint::from_api(Decimal::MAX, t0()));
        recorder.add_price(PricePoint::from_api(Decimal::MAX, t0()));
        recorder.add_price(PricePoint::from_api(Decimal::MAX, t0()));

        let report = board
            .average_over_at(std::time::Duration::from_secs(60), t0())
            .unwrap();
        assert_eq!(report.average, Decimal::MAX);

        recorder.add_price(PricePoint::from_api(Decimal::MIN, t0()));
        let report = board
            .average_over_at(std::time::Duration::from_secs(60), t0())
            .unwrap();
        assert_eq!(report.count, 4);
        assert!(report.average > Decimal::ZERO && report.average < Decimal::MAX);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let (recorder, board) = new(100);
        recorder.add_price(at(10, 0));
        recorder.add_price(at(20, 5));
        recorder.add_price(at(30, 10));
        // in the future relative to the evaluation instant
        recorder.add_price(at(1000, 11));

        let report = board
            .average_over_at(std::time::Duration::from_secs(5), t0() + ChronoDuration::seconds(10))
            .unwrap();

        assert_eq!(report.count, 2);
        assert_eq!(report.average, Decimal::from(25));
    }

    #[test]
    fn empty_buffer_has_no_average() {
        let (_recorder, board) = new(100);
        let now = t0();

        let result = board.average_over_at(std::time::Duration::from_secs(1), now);

        assert_eq!(
            result,
            Err(AggregatorError::NoData {
                start: now - ChronoDuration::seconds(1),
                end: now,
            })
        );
    }

    #[test]
    fn stale_points_give_no_data() {
        let (recorder, board) = new(100);
        recorder.add_price(at(100, 0));

        let result =
            board.average_over_at(std::time::Duration::from_secs(60), t0() + ChronoDuration::hours(1));

        assert!(matches!(result, Err(AggregatorError::NoData { .. })));
    }

    #[test]
    fn huge_window_does_not_overflow() {
        let (recorder, board) = new(100);
        recorder.add_price(at(42, 0));

        let report = board
            .average_over_at(std::time::Duration::MAX, t0())
            .unwrap();

        assert_eq!(report.count, 1);
        assert_eq!(report.start, DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn query_operations_before_first_sample() {
        let (_recorder, board) = new(100);

        let current = board.get_current();
        assert_eq!(current.value, Decimal::ZERO);
        assert_eq!(current.note, NOTE_NOT_AVAILABLE);

        assert!(board.get_dataset().is_empty());
        assert!(matches!(
            board.get_average(std::time::Duration::from_secs(600)),
            AverageOutcome::NoData { .. }
        ));
    }

    #[test]
    fn query_operations_after_a_sample() {
        let (recorder, board) = new(100);
        let point = PricePoint::from_api(Decimal::new(6400050, 2), Utc::now());
        recorder.add_price(point.clone());

        assert_eq!(board.get_current(), point);
        assert_eq!(board.get_dataset(), vec![point.clone()]);

        let outcome = board.get_average(std::time::Duration::from_secs(600));
        let report = outcome.report().expect("sample is inside the window");
        assert_eq!(report.count, 1);
        assert_eq!(report.average, point.value);
    }

    #[test]
    fn snapshot_is_detached_from_later_writes() {
        let (recorder, board) = new(3);
        recorder.add_price(at(1, 0));
        let before = board.snapshot();

        recorder.add_price(at(2, 1));

        assert_eq!(before, vec![at(1, 0)]);
        assert_eq!(board.snapshot().len(), 2);
    }

    #[test]
    fn readers_never_see_partial_writes() {
        let capacity = 16;
        let (recorder, board) = new(capacity);

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let board = board.clone();
                std::thread::spawn(move || {
                    for _ in 0..2_000 {
                        let snapshot = board.snapshot();
                        assert!(snapshot.len() <= capacity);

                        // the writer only inserts increasing timestamps, so
                        // every consistent view is sorted with no gaps
                        for pair in snapshot.windows(2) {
                            assert_eq!(
                                pair[1].timestamp - pair[0].timestamp,
                                ChronoDuration::seconds(1)
                            );
                        }
                    }
                })
            })
            .collect();

        for i in 0..5_000 {
            recorder.add_price(at(i, i));
        }

        for reader in readers {
            reader.join().unwrap();
        }

        assert_eq!(board.len(), capacity);
        assert_eq!(board.current_price(), Some(at(4_999, 4_999)));
    }
}
