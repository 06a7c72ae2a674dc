use std::collections::VecDeque;

use crate::schema::PricePoint;

/// Bounded, insertion-ordered series of price points.
///
/// When full, the next insert first evicts the point with the smallest
/// timestamp. Among equal timestamps the earliest inserted goes first.
/// The length never exceeds the capacity, not even transiently.
///
/// This type is not synchronised; the aggregator wraps it in a lock.
#[derive(Debug, Clone)]
pub struct TimeSeriesBuffer {
    points: VecDeque<PricePoint>,
    capacity: usize,
}

impl TimeSeriesBuffer {
    /// Creates an empty buffer. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Inserts `point`, evicting the oldest sample first if full.
    ///
    /// Returns the evicted point, if any.
    pub fn push(&mut self, point: PricePoint) -> Option<PricePoint> {
        let evicted = if self.is_full() {
            self.oldest_index().and_then(|idx| self.points.remove(idx))
        } else {
            None
        };

        self.points.push_back(point);
        evicted
    }

    /// Index of the eviction candidate.
    ///
    /// `min_by_key` keeps the first of several equal minima, which is
    /// the earliest inserted one.
    fn oldest_index(&self) -> Option<usize> {
        self.points
            .iter()
            .enumerate()
            .min_by_key(|(_, p)| p.timestamp)
            .map(|(idx, _)| idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PricePoint> {
        self.points.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.points.len() >= self.capacity
    }

    /// Copies the points out in insertion order.
    pub fn to_vec(&self) -> Vec<PricePoint> {
        self.points.iter().cloned().collect()
    }
}
