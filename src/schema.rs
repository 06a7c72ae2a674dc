use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::util;

/// Provenance label for samples fetched from the upstream source.
pub const NOTE_FROM_API: &str = "from api";

/// Provenance label for the placeholder returned before the first sample.
pub const NOTE_NOT_AVAILABLE: &str = "price not yet available";

// ------------------------------------------------------------
// Price point
// ------------------------------------------------------------
//
// A single observation of the tracked price.
//
// Created by:
// - the fetcher, from a parsed upstream response
// - query code, as a "not yet available" placeholder
//
// Never mutated after creation. The buffer owns every point it
// holds; callers only ever receive clones.
//
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PricePoint {
    /// Price value
    ///
    /// DESIGN DECISION:
    /// Fixed-point decimal to avoid floating-point drift when
    /// summing samples for the windowed average.
    pub value: Decimal,

    /// UTC instant the sample was taken
    pub timestamp: DateTime<Utc>,

    /// Short provenance label (e.g. "from api")
    pub note: String,
}

impl PricePoint {
    pub fn new(value: Decimal, timestamp: DateTime<Utc>, note: impl Into<String>) -> Self {
        Self {
            value,
            timestamp,
            note: note.into(),
        }
    }

    /// A sample parsed from the upstream source at `timestamp`.
    pub fn from_api(value: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self::new(value, timestamp, NOTE_FROM_API)
    }

    /// Sentinel returned by `get_current` before any sample exists.
    pub fn not_yet_available(now: DateTime<Utc>) -> Self {
        Self::new(Decimal::ZERO, now, NOTE_NOT_AVAILABLE)
    }
}

// ------------------------------------------------------------
// Average report
// ------------------------------------------------------------
//
// Result of a windowed average over the retained samples.
//
// The window is closed on both ends: [start, end].
// `end` is the instant the average was evaluated.
//
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AverageReport {
    /// Arithmetic mean of the selected sample values
    pub average: Decimal,

    /// Inclusive lower bound of the window
    pub start: DateTime<Utc>,

    /// Inclusive upper bound of the window (evaluation instant)
    pub end: DateTime<Utc>,

    /// Number of samples that fell inside the window
    pub count: usize,
}

impl AverageReport {
    /// Human-readable summary, e.g.
    /// `Average price interval 10:00:00 - 10:10:00, dataset count 20`.
    pub fn description(&self) -> String {
        self.to_string()
    }

    /// Folds the report into a price point, the shape older
    /// consumers of the average endpoint expect.
    pub fn to_price_point(&self) -> PricePoint {
        PricePoint::new(self.average, self.end, self.description())
    }
}

impl fmt::Display for AverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Average price interval {} - {}, dataset count {}",
            util::format_clock(&self.start),
            util::format_clock(&self.end),
            self.count,
        )
    }
}

// ------------------------------------------------------------
// Average outcome
// ------------------------------------------------------------
//
// What the query side hands to the routing layer.
//
// An empty window is a normal result, not an error, so it gets
// its own variant carrying the window bounds.
//
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AverageOutcome {
    Report(AverageReport),
    NoData {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl AverageOutcome {
    pub fn report(&self) -> Option<&AverageReport> {
        match self {
            AverageOutcome::Report(report) => Some(report),
            AverageOutcome::NoData { .. } => None,
        }
    }
}
