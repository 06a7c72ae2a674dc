/// Utility helpers shared by the collector and the query side.
///
/// This module contains:
/// - Time formatting helpers
/// - Duration conversion between std and chrono
///
/// IMPORTANT:
/// - No fetching or buffering logic should live here.
/// - This module must remain lightweight and deterministic.
///
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Formats an instant as a wall-clock time `HH:MM:SS` (UTC).
///
/// Used in the human-readable average description.
pub fn format_clock(instant: &DateTime<Utc>) -> String {
    instant.format("%H:%M:%S").to_string()
}

/// Converts a std duration into a chrono duration for window math.
///
/// Durations too large for chrono saturate to the maximum, which
/// makes the window start at the earliest representable instant
/// instead of overflowing.
pub fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}
