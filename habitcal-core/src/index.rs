//! Derived lookup structures over the record set.
//!
//! Both maps are rebuilt from scratch after every mutation. Records whose
//! start time does not parse are left out of both.

use crate::types::{Category, LoggedHabit};
use crate::zone::Zone;
use std::collections::{BTreeMap, BTreeSet};

/// Day → categories and month → records, in one zone.
#[derive(Debug, Clone, Default)]
pub struct DerivedIndex {
    by_day: BTreeMap<String, BTreeSet<Category>>,
    by_month: BTreeMap<String, Vec<LoggedHabit>>,
    excluded: usize,
}

impl DerivedIndex {
    /// Scan every record and build both maps.
    pub fn build(records: &[LoggedHabit], zone: &Zone) -> Self {
        let mut index = Self::default();

        for record in records {
            let Some(wall) = record.wall_start(zone) else {
                index.excluded += 1;
                continue;
            };
            let date = wall.date();

            index
                .by_day
                .entry(crate::types::day_key(date))
                .or_default()
                .insert(record.category);
            index
                .by_month
                .entry(crate::types::month_key(date))
                .or_default()
                .push(record.clone());
        }

        if index.excluded > 0 {
            tracing::debug!(
                excluded = index.excluded,
                "Records with unparseable start times left out of the index"
            );
        }

        index
    }

    /// Categories with at least one record on `day_key`. Empty if none.
    pub fn day_categories(&self, day_key: &str) -> BTreeSet<Category> {
        self.by_day.get(day_key).cloned().unwrap_or_default()
    }

    /// Records starting in `month_key`, in no particular order.
    pub fn month_records(&self, month_key: &str) -> &[LoggedHabit] {
        self.by_month
            .get(month_key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Day keys within `[from, to]` (inclusive, lexicographic on `YYYY-MM-DD`).
    pub fn days_between<'a>(
        &'a self,
        from: &str,
        to: &str,
    ) -> impl Iterator<Item = (&'a str, &'a BTreeSet<Category>)> + 'a {
        self.by_day
            .range(from.to_string()..=to.to_string())
            .map(|(day, categories)| (day.as_str(), categories))
    }

    /// Every indexed day.
    pub fn days(&self) -> impl Iterator<Item = (&str, &BTreeSet<Category>)> {
        self.by_day.iter().map(|(day, cats)| (day.as_str(), cats))
    }

    /// Number of records excluded for an unparseable start time.
    pub fn excluded(&self) -> usize {
        self.excluded
    }
}
