//! Time windows for `$where` filtering on `created_date`.

use chrono::{Local, NaiveDateTime, TimeDelta};

/// How far back a refresh looks.
pub const LOOKBACK_DAYS: i64 = 7;

/// Socrata floating-timestamp literal format.
const SOCRATA_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// An inclusive `[start, end]` range of local (floating) timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Earliest timestamp included.
    pub start: NaiveDateTime,
    /// Latest timestamp included.
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// The `days`-long window ending at `end`.
    #[must_use]
    pub fn ending_at(end: NaiveDateTime, days: i64) -> Self {
        Self {
            start: end - TimeDelta::days(days),
            end,
        }
    }

    /// The last [`LOOKBACK_DAYS`] days, ending now in local time.
    #[must_use]
    pub fn past_week() -> Self {
        Self::ending_at(Local::now().naive_local(), LOOKBACK_DAYS)
    }

    /// SoQL `$where` clause bounding `column` to this window.
    #[must_use]
    pub fn where_clause(&self, column: &str) -> String {
        format!(
            "{column} >= '{}' AND {column} <= '{}'",
            self.start.format(SOCRATA_TIMESTAMP_FORMAT),
            self.end.format(SOCRATA_TIMESTAMP_FORMAT),
        )
    }
}
