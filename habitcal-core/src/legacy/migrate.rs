//! One-way migration from legacy date-keyed entries to canonical records.
//!
//! The conversion is lossy in two known ways:
//! - exact clock time: a time-of-day label becomes its representative hour
//! - per-occurrence duration: a bucket's aggregate duration is split evenly
//!   across its occurrences, truncating; the remainder is dropped and counted
//!   in [`MigrationReport::truncated_secs`]
//!
//! Social partners are attached to every synthesized social record because the
//! legacy shape never said which partner went with which occurrence.
//!
//! Running this on already-migrated output is meaningless: canonical records
//! are never fed back in (the payload decoder routes them elsewhere).

use super::{BucketValue, HabitSlot, LegacyEntry, LegacyHabits, LegacySocial};
use crate::types::{format_timestamp, new_record_id, Category, LoggedHabit, TimeOfDay};
use crate::zone::Zone;
use chrono::{NaiveDate, NaiveTime};
use std::collections::BTreeMap;

/// Options controlling how wall-clock times are synthesized.
#[derive(Debug, Clone, Copy)]
pub struct MigrateOptions {
    /// Zone in which representative hours are interpreted
    pub zone: Zone,
    /// Hour used for entries without a usable time of day
    pub unsure_hour: u32,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            zone: Zone::Local,
            unsure_hour: 12,
        }
    }
}

/// Summary of a migration batch.
#[derive(Debug, Default)]
pub struct MigrationReport {
    /// Synthesized canonical records
    pub records: Vec<LoggedHabit>,
    /// Legacy entries that produced at least one record
    pub entries_migrated: usize,
    /// Legacy entries skipped because their date did not parse
    pub entries_skipped: usize,
    /// Legacy entries dropped because nothing was counted on them
    pub entries_empty: usize,
    /// Seconds lost to integer division of bucket durations
    pub truncated_secs: u64,
}

/// Migrate a batch of legacy entries. Never aborts on a bad entry.
pub fn migrate(entries: &[LegacyEntry], opts: &MigrateOptions) -> MigrationReport {
    let mut report = MigrationReport::default();

    for entry in entries {
        let date = match NaiveDate::parse_from_str(entry.date.trim(), "%Y-%m-%d") {
            Ok(date) => date,
            Err(e) => {
                tracing::warn!(date = %entry.date, error = %e, "Skipping legacy entry with unparseable date");
                report.entries_skipped += 1;
                continue;
            }
        };

        let before = report.records.len();
        let mut synth = Synthesizer {
            date,
            opts,
            report: &mut report,
        };
        synth.habits(&entry.habits);
        if let Some(social) = &entry.social {
            synth.social(social);
        }

        if report.records.len() > before {
            report.entries_migrated += 1;
        } else {
            tracing::debug!(date = %entry.date, "Dropping legacy entry with nothing counted");
            report.entries_empty += 1;
        }
    }

    tracing::info!(
        records = report.records.len(),
        migrated = report.entries_migrated,
        skipped = report.entries_skipped,
        empty = report.entries_empty,
        truncated_secs = report.truncated_secs,
        "Legacy migration complete"
    );

    report
}

struct Synthesizer<'a> {
    date: NaiveDate,
    opts: &'a MigrateOptions,
    report: &'a mut MigrationReport,
}

impl Synthesizer<'_> {
    fn habits(&mut self, habits: &LegacyHabits) {
        match habits {
            LegacyHabits::Checklist(names) => {
                for name in names {
                    if let Some(category) = self.category(name) {
                        self.emit(category, TimeOfDay::NotSure, 1, 0, &[]);
                    }
                }
            }
            LegacyHabits::ByCategory(slots) => {
                for (name, slot) in slots {
                    let Some(category) = self.category(name) else {
                        continue;
                    };
                    match slot {
                        HabitSlot::Done(true) => self.emit(category, TimeOfDay::NotSure, 1, 0, &[]),
                        HabitSlot::Done(false) => {}
                        HabitSlot::Count(n) => self.emit(category, TimeOfDay::NotSure, *n, 0, &[]),
                        HabitSlot::ByTime(buckets) => self.buckets(category, buckets, &[]),
                    }
                }
            }
        }
    }

    fn social(&mut self, social: &LegacySocial) {
        let partners: Vec<String> = social
            .partners
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        let bucketed = match &social.times {
            Some(times) => {
                self.buckets(Category::Social, times, &partners);
                times.values().map(|b| b.count()).sum()
            }
            None => 0,
        };

        // A count larger than the bucket breakdown leaves occurrences with no known time.
        let remainder = social.count.saturating_sub(bucketed);
        self.emit(Category::Social, TimeOfDay::NotSure, remainder, 0, &partners);
    }

    fn buckets(
        &mut self,
        category: Category,
        buckets: &BTreeMap<String, BucketValue>,
        partners: &[String],
    ) {
        for (label, bucket) in buckets {
            let time_of_day = label.parse().unwrap_or_else(|_| {
                tracing::warn!(date = %self.date, label = %label, "Unknown time-of-day label; treating as not-sure");
                TimeOfDay::NotSure
            });
            self.emit(
                category,
                time_of_day,
                bucket.count(),
                bucket.duration_secs(),
                partners,
            );
        }
    }

    fn category(&self, name: &str) -> Option<Category> {
        match name.parse() {
            Ok(category) => Some(category),
            Err(_) => {
                tracing::warn!(date = %self.date, category = %name, "Skipping unknown legacy category");
                None
            }
        }
    }

    /// Push `count` records sharing one bucket and splitting its duration.
    fn emit(
        &mut self,
        category: Category,
        time_of_day: TimeOfDay,
        count: u32,
        total_secs: u64,
        partners: &[String],
    ) {
        if count == 0 {
            return;
        }

        let hour = time_of_day.representative_hour(self.opts.unsure_hour);
        let Some(start) = self.start_at(hour) else {
            tracing::warn!(date = %self.date, hour, "Representative hour does not exist in zone; skipping bucket");
            return;
        };

        let per_record = total_secs / u64::from(count);
        self.report.truncated_secs = self
            .report
            .truncated_secs
            .saturating_add(total_secs % u64::from(count));

        for _ in 0..count {
            self.report.records.push(LoggedHabit {
                id: new_record_id(),
                category,
                start_time: start.clone(),
                duration_secs: per_record,
                partners: if category.is_social() && !partners.is_empty() {
                    Some(partners.to_vec())
                } else {
                    None
                },
                sub_events: None,
                notes: None,
            });
        }
    }

    fn start_at(&self, hour: u32) -> Option<String> {
        let time = NaiveTime::from_hms_opt(hour.min(23), 0, 0)?;
        let wall = self.date.and_time(time);
        self.opts
            .zone
            .resolve_forward(wall)
            .map(|dt| format_timestamp(&dt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legacy::decode_payload;

    fn opts() -> MigrateOptions {
        MigrateOptions {
            zone: Zone::Utc,
            unsure_hour: 12,
        }
    }

    fn migrate_json(raw: &str) -> MigrationReport {
        let decoded = decode_payload(raw).unwrap();
        migrate(&decoded.legacy, &opts())
    }

    fn of(report: &MigrationReport, category: Category) -> Vec<&LoggedHabit> {
        report
            .records
            .iter()
            .filter(|r| r.category == category)
            .collect()
    }

    #[test]
    fn test_buckets_map_to_representative_hours() {
        let report = migrate_json(
            r#"[{"date":"2024-05-04","habits":{"BOB":{"dawn":1,"morning":1,"afternoon":1,"night":1}}}]"#,
        );
        let mut starts: Vec<_> = report.records.iter().map(|r| r.start_time.as_str()).collect();
        starts.sort();
        assert_eq!(
            starts,
            vec![
                "2024-05-04T05:00:00.000Z",
                "2024-05-04T09:00:00.000Z",
                "2024-05-04T14:00:00.000Z",
                "2024-05-04T21:00:00.000Z",
            ]
        );
        assert_eq!(report.entries_migrated, 1);
    }

    #[test]
    fn test_count_and_duration_split_evenly() {
        let report = migrate_json(
            r#"[{"date":"2024-05-05","habits":{"FL":{"night":{"count":3,"duration":100}}}}]"#,
        );
        let fl = of(&report, Category::Fl);
        assert_eq!(fl.len(), 3);
        assert!(fl.iter().all(|r| r.duration_secs == 33));
        assert_eq!(report.truncated_secs, 1);

        let total: u64 = fl.iter().map(|r| r.duration_secs).sum();
        assert_eq!(total + report.truncated_secs, 100);
    }

    #[test]
    fn test_not_sure_uses_configured_hour() {
        let report = migrate_json(r#"[{"date":"2024-05-03","habits":{"BOB":2}}]"#);
        assert_eq!(report.records.len(), 2);
        assert!(report
            .records
            .iter()
            .all(|r| r.start_time == "2024-05-03T12:00:00.000Z"));
    }

    #[test]
    fn test_checklist_generations() {
        let report = migrate_json(
            r#"[
                {"date":"2024-05-01","habits":{"BOB":true,"FL":false}},
                {"date":"2024-05-02","habits":["FL","BOB"]}
            ]"#,
        );
        assert_eq!(of(&report, Category::Bob).len(), 2);
        assert_eq!(of(&report, Category::Fl).len(), 1);
    }

    #[test]
    fn test_social_partners_attach_to_every_record() {
        let report = migrate_json(
            r#"[{"date":"2024-05-05","social":{"partners":["Alice"," Bob "],"count":3,
                "times":{"night":{"count":2,"duration":60}}}}]"#,
        );
        let social = of(&report, Category::Social);
        assert_eq!(social.len(), 3);
        for record in &social {
            assert_eq!(
                record.partners,
                Some(vec!["Alice".to_string(), "Bob".to_string()])
            );
        }
        let at_night = social
            .iter()
            .filter(|r| r.start_time == "2024-05-05T21:00:00.000Z")
            .count();
        assert_eq!(at_night, 2);
        assert!(social
            .iter()
            .filter(|r| r.start_time == "2024-05-05T21:00:00.000Z")
            .all(|r| r.duration_secs == 30));
    }

    #[test]
    fn test_bad_dates_and_empty_entries() {
        let report = migrate_json(
            r#"[
                {"date":"2024-13-45","habits":{"BOB":1}},
                {"date":"2024-05-06","habits":{"BOB":{"morning":0}}},
                {"date":"2024-05-07","habits":{"BOB":1}}
            ]"#,
        );
        assert_eq!(report.entries_skipped, 1);
        assert_eq!(report.entries_empty, 1);
        assert_eq!(report.entries_migrated, 1);
        assert_eq!(report.records.len(), 1);
    }

    #[test]
    fn test_unknown_category_and_label() {
        let report = migrate_json(
            r#"[{"date":"2024-05-08","habits":{"RUN":3,"BOB":{"evening":1}}}]"#,
        );
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].category, Category::Bob);
        assert_eq!(report.records[0].start_time, "2024-05-08T12:00:00.000Z");
    }

    #[test]
    fn test_conservation_across_many_buckets() {
        let report = migrate_json(
            r#"[{"date":"2024-06-01","habits":{
                "BOB":{"dawn":{"count":4,"duration":10},"night":{"count":2,"duration":7}},
                "FL":{"morning":{"count":5,"duration":1000}}}}]"#,
        );
        assert_eq!(of(&report, Category::Bob).len(), 6);
        assert_eq!(of(&report, Category::Fl).len(), 5);

        let total: u64 = report.records.iter().map(|r| r.duration_secs).sum();
        assert_eq!(total + report.truncated_secs, 1017);
        // At most count-1 seconds lost per bucket.
        assert!(report.truncated_secs <= 3 + 1 + 4);
    }
}
