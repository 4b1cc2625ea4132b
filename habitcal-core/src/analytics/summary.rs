//! Per-category statistics for a period.

use super::Period;
use crate::types::{Category, LoggedHabit, TimeOfDay};
use crate::zone::Zone;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

/// Count, duration and sub-events for one slice of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketStats {
    pub count: u64,
    pub duration_secs: u64,
    pub sub_events: u64,
}

impl BucketStats {
    pub(crate) fn add(&mut self, record: &LoggedHabit) {
        self.count += 1;
        self.duration_secs = self.duration_secs.saturating_add(record.duration_secs);
        self.sub_events = self
            .sub_events
            .saturating_add(u64::from(record.sub_events.unwrap_or(0)));
    }
}

/// Statistics for one category (or for all categories together).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub total: u64,
    pub total_duration_secs: u64,
    pub total_sub_events: u64,
    /// Only buckets with at least one record appear
    pub by_time: BTreeMap<TimeOfDay, BucketStats>,
}

impl CategoryStats {
    fn add(&mut self, time_of_day: TimeOfDay, record: &LoggedHabit) {
        self.total += 1;
        self.total_duration_secs = self.total_duration_secs.saturating_add(record.duration_secs);
        self.total_sub_events = self
            .total_sub_events
            .saturating_add(u64::from(record.sub_events.unwrap_or(0)));
        self.by_time.entry(time_of_day).or_default().add(record);
    }

    /// Stats for one bucket, zero if nothing landed there.
    pub fn bucket(&self, time_of_day: TimeOfDay) -> BucketStats {
        self.by_time.get(&time_of_day).copied().unwrap_or_default()
    }
}

/// Result of folding a record set over a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aggregation {
    /// Every category, present even when empty
    pub categories: BTreeMap<Category, CategoryStats>,
    /// Occurrence count per partner name across social records
    pub partners: BTreeMap<String, u64>,
    /// Sums across all categories, including by time of day
    pub grand_total: CategoryStats,
}

impl Default for Aggregation {
    fn default() -> Self {
        Self {
            categories: Category::ALL
                .iter()
                .map(|c| (*c, CategoryStats::default()))
                .collect(),
            partners: BTreeMap::new(),
            grand_total: CategoryStats::default(),
        }
    }
}

impl Aggregation {
    pub fn category(&self, category: Category) -> &CategoryStats {
        static EMPTY: CategoryStats = CategoryStats {
            total: 0,
            total_duration_secs: 0,
            total_sub_events: 0,
            by_time: BTreeMap::new(),
        };
        self.categories.get(&category).unwrap_or(&EMPTY)
    }

    /// Partners by count descending, ties broken by name.
    pub fn partners_ranked(&self) -> Vec<(&str, u64)> {
        let mut ranked: Vec<(&str, u64)> = self
            .partners
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }

    fn add(&mut self, time_of_day: TimeOfDay, record: &LoggedHabit) {
        self.categories
            .entry(record.category)
            .or_default()
            .add(time_of_day, record);
        self.grand_total.add(time_of_day, record);

        if record.category.is_social() {
            for partner in record.partner_names() {
                *self.partners.entry(partner.to_string()).or_insert(0) += 1;
            }
        }
    }
}

/// Aggregate the records whose zoned start falls inside `period`.
pub fn aggregate(records: &[LoggedHabit], period: &Period, zone: &Zone) -> Aggregation {
    aggregate_where(records, zone, |wall| period.contains(wall.date()))
}

/// Aggregate the records whose zoned start satisfies `include`.
pub fn aggregate_where<F>(records: &[LoggedHabit], zone: &Zone, include: F) -> Aggregation
where
    F: Fn(&NaiveDateTime) -> bool,
{
    let mut result = Aggregation::default();

    for record in records {
        let Some(wall) = record.wall_start(zone) else {
            continue;
        };
        if !include(&wall) {
            continue;
        }
        result.add(TimeOfDay::from_clock(wall.time()), record);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(category: Category, start: &str, duration: u64) -> LoggedHabit {
        LoggedHabit {
            id: crate::types::new_record_id(),
            category,
            start_time: start.to_string(),
            duration_secs: duration,
            partners: None,
            sub_events: None,
            notes: None,
        }
    }

    fn social(start: &str, partners: &[&str]) -> LoggedHabit {
        let mut r = record(Category::Social, start, 0);
        r.partners = Some(partners.iter().map(|p| p.to_string()).collect());
        r
    }

    #[test]
    fn test_month_totals_and_buckets() {
        let mut edged = record(Category::Fl, "2024-07-03T22:00:00Z", 600);
        edged.sub_events = Some(3);
        let records = vec![
            record(Category::Bob, "2024-07-01T09:00:00Z", 0),
            record(Category::Bob, "2024-07-02T14:00:00Z", 120),
            edged,
            record(Category::Bob, "2024-08-01T09:00:00Z", 50),
        ];
        let agg = aggregate(&records, &Period::Month(2024, 7), &Zone::Utc);

        let bob = agg.category(Category::Bob);
        assert_eq!(bob.total, 2);
        assert_eq!(bob.total_duration_secs, 120);
        assert_eq!(bob.bucket(TimeOfDay::Morning).count, 1);
        assert_eq!(bob.bucket(TimeOfDay::Afternoon).duration_secs, 120);

        let fl = agg.category(Category::Fl);
        assert_eq!(fl.total_sub_events, 3);
        assert_eq!(fl.bucket(TimeOfDay::Night).sub_events, 3);

        assert_eq!(agg.category(Category::Social).total, 0);
        assert_eq!(agg.grand_total.total, 3);
        assert_eq!(agg.grand_total.total_duration_secs, 720);
    }

    #[test]
    fn test_zero_duration_contributes_nothing() {
        let records = vec![record(Category::Bob, "2024-07-01T09:00:00Z", 0)];
        let agg = aggregate(&records, &Period::Month(2024, 7), &Zone::Utc);
        assert_eq!(agg.grand_total.total, 1);
        assert_eq!(agg.grand_total.total_duration_secs, 0);
        assert_eq!(agg.grand_total.bucket(TimeOfDay::Morning).duration_secs, 0);
    }

    #[test]
    fn test_partner_counts_and_ranking() {
        let records = vec![
            social("2024-07-05T21:00:00Z", &["Alice", " Bob "]),
            social("2024-07-06T21:00:00Z", &["Bob"]),
            social("2024-07-07T21:00:00Z", &["Carol", ""]),
        ];
        let agg = aggregate(&records, &Period::Month(2024, 7), &Zone::Utc);
        assert_eq!(agg.partners.get("Bob"), Some(&2));
        assert_eq!(agg.partners.len(), 3);
        assert_eq!(
            agg.partners_ranked(),
            vec![("Bob", 2), ("Alice", 1), ("Carol", 1)]
        );
    }

    #[test]
    fn test_partners_on_solitary_records_are_ignored() {
        let mut r = record(Category::Bob, "2024-07-05T21:00:00Z", 0);
        r.partners = Some(vec!["Alice".into()]);
        let agg = aggregate(&[r], &Period::Month(2024, 7), &Zone::Utc);
        assert!(agg.partners.is_empty());
    }

    #[test]
    fn test_unparseable_start_is_excluded() {
        let records = vec![
            record(Category::Bob, "corrupt", 100),
            record(Category::Bob, "2024-07-01T09:00:00Z", 10),
        ];
        let agg = aggregate(&records, &Period::Year(2024), &Zone::Utc);
        assert_eq!(agg.grand_total.total, 1);
        assert_eq!(agg.grand_total.total_duration_secs, 10);
    }

    #[test]
    fn test_custom_predicate() {
        let records = vec![
            record(Category::Bob, "2024-07-01T05:00:00Z", 0),
            record(Category::Fl, "2024-07-01T21:00:00Z", 0),
        ];
        let agg = aggregate_where(&records, &Zone::Utc, |wall| {
            TimeOfDay::from_clock(wall.time()) == TimeOfDay::Dawn
        });
        assert_eq!(agg.grand_total.total, 1);
        assert_eq!(agg.category(Category::Bob).total, 1);
    }

    #[test]
    fn test_output_is_deterministic() {
        let records = vec![
            social("2024-07-05T21:00:00Z", &["Zed", "Amy"]),
            record(Category::Fl, "2024-07-01T05:00:00Z", 3),
        ];
        let a = serde_json::to_string(&aggregate(&records, &Period::Month(2024, 7), &Zone::Utc))
            .unwrap();
        let mut reversed = records.clone();
        reversed.reverse();
        let b = serde_json::to_string(&aggregate(&reversed, &Period::Month(2024, 7), &Zone::Utc))
            .unwrap();
        assert_eq!(a, b);
    }
}
