//! Core domain types for habitcal
//!
//! These types represent the canonical record schema: one [`LoggedHabit`] per
//! occurrence, stamped with an absolute start time. Earlier date-keyed shapes
//! live in [`crate::legacy`] and are migrated into this one at load time.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Category** | What was logged: one of two solitary habits or a social one |
//! | **Record** | A single logged occurrence ([`LoggedHabit`]) |
//! | **Time of day** | A coarse bucket (dawn, morning, afternoon, night, not-sure) |
//! | **Sub-events** | Discrete repeats counted inside one timed session ("edges") |
//! | **Day key** | `YYYY-MM-DD` in the configured [`Zone`] |
//! | **Month key** | `YYYY-MM` in the configured [`Zone`] |

use crate::error::{Error, Result};
use crate::zone::Zone;
use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Timelike,
};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================
// Category
// ============================================

/// Closed set of things that can be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// First solitary habit
    #[serde(rename = "BOB")]
    Bob,
    /// Second solitary habit
    #[serde(rename = "FL")]
    Fl,
    /// Social habit, may carry partner names
    #[serde(rename = "SOCIAL")]
    Social,
}

impl Category {
    /// All categories in display order
    pub const ALL: [Category; 3] = [Category::Bob, Category::Fl, Category::Social];

    /// Returns the identifier used in storage and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Bob => "BOB",
            Category::Fl => "FL",
            Category::Social => "SOCIAL",
        }
    }

    /// Whether partner names mean anything for this category
    pub fn is_social(&self) -> bool {
        matches!(self, Category::Social)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BOB" => Ok(Category::Bob),
            "FL" => Ok(Category::Fl),
            "SOCIAL" => Ok(Category::Social),
            _ => Err(format!("unknown category: {}", s)),
        }
    }
}

// ============================================
// Time of day
// ============================================

/// Coarse time-of-day bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeOfDay {
    Dawn,
    Morning,
    Afternoon,
    Night,
    NotSure,
}

impl TimeOfDay {
    /// Buckets that a real clock time can land in, in display order
    pub const SECTIONS: [TimeOfDay; 4] = [
        TimeOfDay::Dawn,
        TimeOfDay::Morning,
        TimeOfDay::Afternoon,
        TimeOfDay::Night,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Dawn => "dawn",
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Night => "night",
            TimeOfDay::NotSure => "not-sure",
        }
    }

    /// Returns the display label
    pub fn label(&self) -> &'static str {
        match self {
            TimeOfDay::Dawn => "Dawn",
            TimeOfDay::Morning => "Morning",
            TimeOfDay::Afternoon => "Afternoon",
            TimeOfDay::Night => "Night",
            TimeOfDay::NotSure => "Not sure",
        }
    }

    /// Fixed clock hour standing in for this bucket when only the label is known.
    ///
    /// `not-sure` has no natural hour; the caller supplies it.
    pub fn representative_hour(&self, unsure_hour: u32) -> u32 {
        match self {
            TimeOfDay::Dawn => 5,
            TimeOfDay::Morning => 9,
            TimeOfDay::Afternoon => 14,
            TimeOfDay::Night => 21,
            TimeOfDay::NotSure => unsure_hour,
        }
    }

    /// Bucket for a wall-clock time.
    ///
    /// Ranges are inclusive at the upper minute: 00:01–06:00 dawn,
    /// 06:01–12:00 morning, 12:01–18:00 afternoon, 18:01–00:00 night.
    pub fn from_clock(time: NaiveTime) -> TimeOfDay {
        let hhmm = time.hour() * 100 + time.minute();
        match hhmm {
            1..=600 => TimeOfDay::Dawn,
            601..=1200 => TimeOfDay::Morning,
            1201..=1800 => TimeOfDay::Afternoon,
            _ => TimeOfDay::Night,
        }
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TimeOfDay {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dawn" => Ok(TimeOfDay::Dawn),
            "morning" => Ok(TimeOfDay::Morning),
            "afternoon" => Ok(TimeOfDay::Afternoon),
            "night" => Ok(TimeOfDay::Night),
            "not-sure" | "notsure" | "not_sure" => Ok(TimeOfDay::NotSure),
            _ => Err(format!("unknown time of day: {}", s)),
        }
    }
}

// ============================================
// Canonical record
// ============================================

/// A single logged occurrence (the canonical, persisted schema).
///
/// Field names on disk follow the stored array format:
/// `id`, `type`, `startTime`, `duration`, `partners`, `edgeCount`, `notes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedHabit {
    /// Unique, immutable identifier
    pub id: String,
    /// What was logged
    #[serde(rename = "type")]
    pub category: Category,
    /// RFC 3339 start instant, kept verbatim so a corrupt value survives a save
    #[serde(rename = "startTime")]
    pub start_time: String,
    /// Elapsed time in seconds
    #[serde(rename = "duration", default, deserialize_with = "lenient_seconds")]
    pub duration_secs: u64,
    /// Partner names (meaningful for social records only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partners: Option<Vec<String>>,
    /// Sub-events counted within the session; never `Some(0)`
    #[serde(
        rename = "edgeCount",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "positive_count"
    )]
    pub sub_events: Option<u32>,
    /// Free-text notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LoggedHabit {
    /// Parsed start instant, or `None` if the stored string is not a valid timestamp.
    pub fn start(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(&self.start_time)
    }

    /// Start time as wall clock in `zone`.
    pub fn wall_start(&self, zone: &Zone) -> Option<NaiveDateTime> {
        self.start().map(|dt| zone.localize(&dt))
    }

    /// `YYYY-MM-DD` of the start in `zone`.
    pub fn day_key(&self, zone: &Zone) -> Option<String> {
        self.wall_start(zone).map(|dt| day_key(dt.date()))
    }

    /// `YYYY-MM` of the start in `zone`.
    pub fn month_key(&self, zone: &Zone) -> Option<String> {
        self.wall_start(zone).map(|dt| month_key(dt.date()))
    }

    /// Time-of-day bucket of the start in `zone`.
    pub fn time_of_day(&self, zone: &Zone) -> Option<TimeOfDay> {
        self.wall_start(zone).map(|dt| TimeOfDay::from_clock(dt.time()))
    }

    /// Partner names, trimmed, empty names skipped.
    pub fn partner_names(&self) -> impl Iterator<Item = &str> {
        self.partners
            .iter()
            .flatten()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
    }
}

fn lenient_seconds<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw
        .filter(|v| v.is_finite() && *v > 0.0)
        .map(|v| v.trunc() as u64)
        .unwrap_or(0))
}

fn positive_count<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw
        .filter(|v| v.is_finite() && *v >= 1.0)
        .map(|v| v.trunc().min(u32::MAX as f64) as u32))
}

// ============================================
// Record input
// ============================================

/// Raw fields for creating a record.
///
/// Nothing here is trusted: [`HabitFields::into_record`] validates every field.
#[derive(Debug, Clone, Default)]
pub struct HabitFields {
    /// Category name (`BOB`, `FL`, `SOCIAL`, case-insensitive)
    pub category: String,
    /// RFC 3339 start instant. Required; see [`HabitFields::at_noon`] and
    /// [`HabitFields::from_timer`] for the default policies.
    pub start_time: Option<String>,
    pub duration_secs: i64,
    pub partners: Vec<String>,
    /// Zero is accepted and means "none"
    pub sub_events: Option<i64>,
    pub notes: Option<String>,
}

impl HabitFields {
    /// Manual entry for a calendar day with no explicit time: noon of that day.
    pub fn at_noon(category: impl Into<String>, date: NaiveDate, zone: &Zone) -> Result<Self> {
        let noon = date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default());
        let start = zone.resolve(noon).ok_or_else(|| {
            Error::Validation(format!("noon does not exist on {} in zone {}", date, zone))
        })?;
        Ok(Self {
            category: category.into(),
            start_time: Some(format_timestamp(&start)),
            ..Default::default()
        })
    }

    /// Entry produced by a stopwatch session: starts when the timer started.
    pub fn from_timer(
        category: impl Into<String>,
        started_at: DateTime<FixedOffset>,
        duration_secs: u64,
        sub_events: u32,
    ) -> Self {
        Self {
            category: category.into(),
            start_time: Some(format_timestamp(&started_at)),
            duration_secs: duration_secs.min(i64::MAX as u64) as i64,
            sub_events: Some(i64::from(sub_events)),
            ..Default::default()
        }
    }

    /// Validate and build a canonical record with the given id.
    pub fn into_record(self, id: String) -> Result<LoggedHabit> {
        let category = validate_category(&self.category)?;
        let start_time = match self.start_time {
            Some(raw) => validate_start_time(&raw)?,
            None => return Err(Error::Validation("start time is required".to_string())),
        };
        let partners = normalize_partners(self.partners);

        Ok(LoggedHabit {
            id,
            category,
            start_time,
            duration_secs: validate_duration(self.duration_secs)?,
            partners: if partners.is_empty() {
                None
            } else {
                Some(partners)
            },
            sub_events: validate_sub_events(self.sub_events)?,
            notes: normalize_notes(self.notes),
        })
    }
}

/// Field-level replacement for an existing record.
///
/// Each `Some` field replaces the stored field wholesale; `None` leaves it alone.
#[derive(Debug, Clone, Default)]
pub struct HabitPatch {
    pub category: Option<String>,
    pub start_time: Option<String>,
    pub duration_secs: Option<i64>,
    /// An empty list clears the partners
    pub partners: Option<Vec<String>>,
    /// Zero clears the count
    pub sub_events: Option<i64>,
    /// An empty string clears the notes
    pub notes: Option<String>,
}

impl HabitPatch {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.start_time.is_none()
            && self.duration_secs.is_none()
            && self.partners.is_none()
            && self.sub_events.is_none()
            && self.notes.is_none()
    }

    /// Apply to a copy of `record`. Validation happens before anything changes.
    pub fn apply(&self, record: &LoggedHabit) -> Result<LoggedHabit> {
        let mut updated = record.clone();
        if let Some(category) = &self.category {
            updated.category = validate_category(category)?;
        }
        if let Some(start_time) = &self.start_time {
            updated.start_time = validate_start_time(start_time)?;
        }
        if let Some(duration) = self.duration_secs {
            updated.duration_secs = validate_duration(duration)?;
        }
        if let Some(partners) = &self.partners {
            let partners = normalize_partners(partners.clone());
            updated.partners = if partners.is_empty() {
                None
            } else {
                Some(partners)
            };
        }
        if let Some(count) = self.sub_events {
            updated.sub_events = validate_sub_events(Some(count))?;
        }
        if let Some(notes) = &self.notes {
            updated.notes = normalize_notes(Some(notes.clone()));
        }
        Ok(updated)
    }
}

fn validate_category(raw: &str) -> Result<Category> {
    raw.parse().map_err(Error::Validation)
}

fn validate_start_time(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if parse_timestamp(trimmed).is_none() {
        return Err(Error::Validation(format!(
            "start time is not an RFC 3339 timestamp: {}",
            raw
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_duration(secs: i64) -> Result<u64> {
    u64::try_from(secs)
        .map_err(|_| Error::Validation(format!("duration cannot be negative: {}", secs)))
}

fn validate_sub_events(count: Option<i64>) -> Result<Option<u32>> {
    match count {
        None | Some(0) => Ok(None),
        Some(n) => u32::try_from(n)
            .map(Some)
            .map_err(|_| Error::Validation(format!("sub-event count out of range: {}", n))),
    }
}

fn normalize_partners(partners: Vec<String>) -> Vec<String> {
    partners
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

// ============================================
// Timestamps and calendar keys
// ============================================

/// Fresh opaque record id.
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Parse an RFC 3339 timestamp.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw.trim()).ok()
}

/// Format an instant the way records store it (millisecond precision, `Z` for UTC).
pub fn format_timestamp(instant: &DateTime<FixedOffset>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `YYYY-MM-DD` key for a calendar day.
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// `YYYY-MM` key for the month containing `date`.
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Parse a `YYYY-MM-DD` day key.
pub fn parse_day_key(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| Error::Validation(format!("day must be YYYY-MM-DD: {}", raw)))
}

/// Parse a `YYYY-MM` month key into `(year, month)`.
pub fn parse_month_key(raw: &str) -> Result<(i32, u32)> {
    let invalid = || Error::Validation(format!("month must be YYYY-MM: {}", raw));
    let (year, month) = raw.trim().split_once('-').ok_or_else(invalid)?;
    let digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(year, 4) || !digits(month, 2) {
        return Err(invalid());
    }
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok((year, month))
}

/// Validate a month key and return it in the `YYYY-MM` form the index uses.
pub fn canonical_month_key(raw: &str) -> Result<String> {
    let (year, month) = parse_month_key(raw)?;
    Ok(format!("{:04}-{:02}", year, month))
}
