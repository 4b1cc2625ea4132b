//! Day, time-of-day and year views.

use super::summary::BucketStats;
use super::Period;
use crate::index::DerivedIndex;
use crate::types::{day_key, Category, LoggedHabit, TimeOfDay};
use crate::zone::Zone;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Records of one calendar day, in start order, grouped by time of day.
#[derive(Debug, Clone, Serialize)]
pub struct DayView {
    pub date: NaiveDate,
    /// Non-empty sections in display order
    pub sections: Vec<(TimeOfDay, Vec<LoggedHabit>)>,
}

impl DayView {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sections.iter().map(|(_, records)| records.len()).sum()
    }
}

/// Build the view for `date` from a record slice.
pub fn day_view(records: &[LoggedHabit], date: NaiveDate, zone: &Zone) -> DayView {
    let mut on_day: Vec<(NaiveDateTime, &LoggedHabit)> = records
        .iter()
        .filter_map(|r| r.wall_start(zone).map(|wall| (wall, r)))
        .filter(|(wall, _)| wall.date() == date)
        .collect();
    on_day.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));

    let mut sections: BTreeMap<TimeOfDay, Vec<LoggedHabit>> = BTreeMap::new();
    for (wall, record) in on_day {
        sections
            .entry(TimeOfDay::from_clock(wall.time()))
            .or_default()
            .push(record.clone());
    }

    DayView {
        date,
        sections: sections.into_iter().collect(),
    }
}

/// One time-of-day section of the monthly breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SectionBreakdown {
    pub by_category: BTreeMap<Category, BucketStats>,
    /// Partner counts from social records in this section
    pub partners: BTreeMap<String, u64>,
}

impl SectionBreakdown {
    pub fn total(&self) -> u64 {
        self.by_category.values().map(|s| s.count).sum()
    }
}

/// Per time-of-day section, per category statistics with partners.
///
/// Every real-clock section is present; `not-sure` never is, because it is
/// not a clock range.
pub fn hourly_breakdown(
    records: &[LoggedHabit],
    period: &Period,
    zone: &Zone,
) -> BTreeMap<TimeOfDay, SectionBreakdown> {
    let mut sections: BTreeMap<TimeOfDay, SectionBreakdown> = TimeOfDay::SECTIONS
        .iter()
        .map(|t| (*t, SectionBreakdown::default()))
        .collect();

    for record in records {
        let Some(wall) = record.wall_start(zone) else {
            continue;
        };
        if !period.contains(wall.date()) {
            continue;
        }

        let section = sections
            .entry(TimeOfDay::from_clock(wall.time()))
            .or_default();
        section
            .by_category
            .entry(record.category)
            .or_default()
            .add(record);
        if record.category.is_social() {
            for partner in record.partner_names() {
                *section.partners.entry(partner.to_string()).or_insert(0) += 1;
            }
        }
    }

    sections
}

/// Day → categories for every logged day of `year`.
pub fn year_calendar(index: &DerivedIndex, year: i32) -> BTreeMap<String, BTreeSet<Category>> {
    let (Some(first), Some(last)) = (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) else {
        return BTreeMap::new();
    };

    index
        .days_between(&day_key(first), &day_key(last))
        .map(|(day, categories)| (day.to_string(), categories.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, category: Category, start: &str) -> LoggedHabit {
        LoggedHabit {
            id: id.to_string(),
            category,
            start_time: start.to_string(),
            duration_secs: 60,
            partners: None,
            sub_events: None,
            notes: None,
        }
    }

    #[test]
    fn test_day_view_sorts_and_groups() {
        let records = vec![
            record("late", Category::Fl, "2024-07-01T22:00:00Z"),
            record("early", Category::Bob, "2024-07-01T05:30:00Z"),
            record("mid", Category::Bob, "2024-07-01T08:00:00Z"),
            record("morning", Category::Fl, "2024-07-01T07:00:00Z"),
            record("other-day", Category::Bob, "2024-07-02T09:00:00Z"),
            record("corrupt", Category::Bob, "??"),
        ];
        let date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let view = day_view(&records, date, &Zone::Utc);

        assert_eq!(view.len(), 4);
        let layout: Vec<(TimeOfDay, Vec<&str>)> = view
            .sections
            .iter()
            .map(|(t, rs)| (*t, rs.iter().map(|r| r.id.as_str()).collect()))
            .collect();
        assert_eq!(
            layout,
            vec![
                (TimeOfDay::Dawn, vec!["early"]),
                (TimeOfDay::Morning, vec!["morning", "mid"]),
                (TimeOfDay::Night, vec!["late"]),
            ]
        );
    }

    #[test]
    fn test_hourly_breakdown_with_partners() {
        let mut social = record("s", Category::Social, "2024-07-05T21:00:00Z");
        social.partners = Some(vec!["Alice".into(), "Bob".into()]);
        let records = vec![
            social,
            record("a", Category::Bob, "2024-07-01T09:00:00Z"),
            record("b", Category::Bob, "2024-07-02T10:00:00Z"),
            record("c", Category::Bob, "2024-06-02T10:00:00Z"),
        ];
        let sections = hourly_breakdown(&records, &Period::Month(2024, 7), &Zone::Utc);

        assert_eq!(sections.len(), 4);
        let morning = &sections[&TimeOfDay::Morning];
        assert_eq!(morning.total(), 2);
        assert_eq!(morning.by_category[&Category::Bob].duration_secs, 120);

        let night = &sections[&TimeOfDay::Night];
        assert_eq!(night.by_category[&Category::Social].count, 1);
        assert_eq!(night.partners.get("Alice"), Some(&1));
        assert_eq!(sections[&TimeOfDay::Dawn].total(), 0);
    }

    #[test]
    fn test_year_calendar() {
        let records = vec![
            record("a", Category::Bob, "2023-12-31T12:00:00Z"),
            record("b", Category::Fl, "2024-01-01T12:00:00Z"),
            record("c", Category::Social, "2024-12-31T12:00:00Z"),
        ];
        let index = DerivedIndex::build(&records, &Zone::Utc);
        let calendar = year_calendar(&index, 2024);
        assert_eq!(
            calendar.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["2024-01-01", "2024-12-31"]
        );
    }
}
