//! Legacy date-keyed entries
//!
//! Before records carried a start instant, the calendar stored one entry per
//! date. That entry changed shape several times:
//!
//! | Generation | `habits` value per category |
//! |------------|-----------------------------|
//! | Checklist | `true` / `false`, or a list of checked category names |
//! | Counter | bare count |
//! | Timed counter | `{ <time-of-day>: count }` |
//! | Timed counter + duration | `{ <time-of-day>: { count, duration } }` |
//!
//! plus an optional `social` object with partners, a count and its own
//! per-time-of-day breakdown. None of these shapes is kept alive: they are
//! decoded into [`LegacyEntry`] and migrated once by [`migrate`].

mod migrate;

pub use migrate::{migrate, MigrateOptions, MigrationReport};

use crate::types::LoggedHabit;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// One legacy date-keyed entry.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyEntry {
    /// `YYYY-MM-DD`, no time
    pub date: String,
    #[serde(default)]
    pub habits: LegacyHabits,
    #[serde(default)]
    pub social: Option<LegacySocial>,
}

/// The `habits` field across generations.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LegacyHabits {
    /// Names of the habits ticked that day
    Checklist(Vec<String>),
    /// Category name to that category's slot
    ByCategory(BTreeMap<String, HabitSlot>),
}

impl Default for LegacyHabits {
    fn default() -> Self {
        LegacyHabits::ByCategory(BTreeMap::new())
    }
}

/// What one category recorded on one date.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HabitSlot {
    /// Checkbox generation
    Done(bool),
    /// Counter generation
    Count(u32),
    /// Time-bucketed generations, keyed by time-of-day label
    ByTime(BTreeMap<String, BucketValue>),
}

/// One time-of-day bucket.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BucketValue {
    Count(u32),
    Timed(HabitTime),
}

impl BucketValue {
    pub fn count(&self) -> u32 {
        match self {
            BucketValue::Count(n) => *n,
            BucketValue::Timed(t) => t.count,
        }
    }

    /// Aggregate duration in whole seconds for every occurrence in the bucket.
    pub fn duration_secs(&self) -> u64 {
        match self {
            BucketValue::Count(_) => 0,
            BucketValue::Timed(t) => t
                .duration
                .filter(|d| d.is_finite() && *d > 0.0)
                .map(|d| d.trunc() as u64)
                .unwrap_or(0),
        }
    }
}

/// Count plus optional aggregate duration.
#[derive(Debug, Clone, Deserialize)]
pub struct HabitTime {
    pub count: u32,
    #[serde(default)]
    pub duration: Option<f64>,
}

/// The `social` sub-object.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacySocial {
    #[serde(default)]
    pub partners: Vec<String>,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub times: Option<BTreeMap<String, BucketValue>>,
}

// ============================================
// Stored payload decoding
// ============================================

/// A stored record array split by schema generation.
#[derive(Debug, Default)]
pub struct DecodedPayload {
    /// Elements already in canonical shape
    pub records: Vec<LoggedHabit>,
    /// Elements in a legacy date-keyed shape, still to be migrated
    pub legacy: Vec<LegacyEntry>,
    /// Elements matching no known shape
    pub unreadable: usize,
}

impl DecodedPayload {
    pub fn needs_migration(&self) -> bool {
        !self.legacy.is_empty()
    }
}

/// Split a stored JSON payload into canonical records and legacy entries.
///
/// Accepts an array of elements of any generation, or a legacy object keyed
/// by date. The shape of each element decides its generation: canonical
/// records carry `startTime`, legacy entries carry a date.
pub fn decode_payload(raw: &str) -> crate::error::Result<DecodedPayload> {
    let value: Value = serde_json::from_str(raw)?;
    let mut decoded = DecodedPayload::default();

    match value {
        Value::Array(elements) => {
            for element in elements {
                classify_element(element, None, &mut decoded);
            }
        }
        Value::Object(by_date) => {
            for (date, element) in by_date {
                classify_element(element, Some(date), &mut decoded);
            }
        }
        Value::Null => {}
        other => {
            tracing::warn!(kind = %json_kind(&other), "Stored payload is not an array; ignoring it");
            decoded.unreadable += 1;
        }
    }

    Ok(decoded)
}

fn classify_element(mut element: Value, date_key: Option<String>, decoded: &mut DecodedPayload) {
    let Some(obj) = element.as_object_mut() else {
        tracing::warn!(kind = %json_kind(&element), "Skipping stored element that is not an object");
        decoded.unreadable += 1;
        return;
    };

    if obj.contains_key("startTime") {
        match serde_json::from_value::<LoggedHabit>(element) {
            Ok(record) => decoded.records.push(record),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable stored record");
                decoded.unreadable += 1;
            }
        }
        return;
    }

    if let Some(date) = date_key {
        obj.entry("date").or_insert(Value::String(date));
    }

    if obj.contains_key("date") {
        match serde_json::from_value::<LegacyEntry>(element) {
            Ok(entry) => decoded.legacy.push(entry),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable legacy entry");
                decoded.unreadable += 1;
            }
        }
        return;
    }

    tracing::warn!("Skipping stored element with neither startTime nor date");
    decoded.unreadable += 1;
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
