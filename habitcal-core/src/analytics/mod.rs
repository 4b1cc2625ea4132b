//! Aggregation over the record set
//!
//! Provides the statistics behind every summary view:
//! - Per-category totals, durations and sub-event counts, by time of day
//! - Per-partner counts for social records
//! - Day, time-of-day and year views
//!
//! Everything here is a pure function of a record slice, a [`Period`] (or a
//! predicate) and a [`Zone`](crate::zone::Zone). Records with unparseable
//! start times never contribute. All maps are ordered, so the same input
//! always produces the same output.

pub mod summary;
pub mod views;

pub use summary::{aggregate, aggregate_where, Aggregation, BucketStats, CategoryStats};
pub use views::{day_view, hourly_breakdown, year_calendar, DayView, SectionBreakdown};

use crate::error::Result;
use crate::types::parse_month_key;
use chrono::{Datelike, NaiveDate};

/// A calendar period, in the configured zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// Full year (e.g., 2024)
    Year(i32),
    /// Specific month (year, month 1-12)
    Month(i32, u32),
    /// Inclusive date range
    Range(NaiveDate, NaiveDate),
}

impl Period {
    /// Parse a `YYYY-MM` month key.
    pub fn from_month_key(raw: &str) -> Result<Self> {
        let (year, month) = parse_month_key(raw)?;
        Ok(Period::Month(year, month))
    }

    /// Whether a calendar day falls inside this period.
    pub fn contains(&self, date: NaiveDate) -> bool {
        match self {
            Period::Year(year) => date.year() == *year,
            Period::Month(year, month) => date.year() == *year && date.month() == *month,
            Period::Range(from, to) => *from <= date && date <= *to,
        }
    }

    /// Get display name for this period.
    pub fn display_name(&self) -> String {
        match self {
            Period::Year(year) => format!("{}", year),
            Period::Month(year, month) => match NaiveDate::from_ymd_opt(*year, *month, 1) {
                Some(first) => first.format("%B %Y").to_string(),
                None => format!("{:04}-{:02}", year, month),
            },
            Period::Range(from, to) => format!("{} to {}", from, to),
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
