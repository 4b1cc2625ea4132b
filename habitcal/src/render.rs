//! Plain-text output for the terminal.

use habitcal_core::analytics::{DayView, SectionBreakdown};
use habitcal_core::db::ImportRecord;
use habitcal_core::format::{format_day_marker, format_duration, format_partners};
use habitcal_core::{Aggregation, Category, LoggedHabit, Period, TimeOfDay, Zone};
use std::collections::{BTreeMap, BTreeSet};

pub fn day(view: &DayView) {
    println!("{}", view.date.format("%A, %B %-d %Y"));
    if view.is_empty() {
        println!("  nothing logged");
        return;
    }

    for (time_of_day, records) in &view.sections {
        println!();
        println!("{}", time_of_day.label());
        for record in records {
            println!("  {}", record_line(record, None));
        }
    }
}

pub fn month(period: &Period, summary: &Aggregation) {
    println!("{}", period.display_name());
    println!();
    println!(
        "{:<8} {:>6} {:>10} {:>6}   {}",
        "", "count", "duration", "edges", "dawn/morning/afternoon/night"
    );

    for category in Category::ALL {
        let stats = summary.category(category);
        let buckets: Vec<String> = TimeOfDay::SECTIONS
            .iter()
            .map(|t| stats.bucket(*t).count.to_string())
            .collect();
        println!(
            "{:<8} {:>6} {:>10} {:>6}   {}",
            category.as_str(),
            stats.total,
            format_duration(stats.total_duration_secs),
            stats.total_sub_events,
            buckets.join("/")
        );
    }

    let total = &summary.grand_total;
    println!(
        "{:<8} {:>6} {:>10} {:>6}",
        "total",
        total.total,
        format_duration(total.total_duration_secs),
        total.total_sub_events
    );

    let ranked = summary.partners_ranked();
    if !ranked.is_empty() {
        println!();
        println!("Partners");
        for (name, count) in ranked {
            println!("  {:<20} {}", name, count);
        }
    }
}

pub fn hourly(period: &Period, sections: &BTreeMap<TimeOfDay, SectionBreakdown>) {
    println!("{} by time of day", period.display_name());

    for (time_of_day, section) in sections {
        println!();
        println!("{} ({})", time_of_day.label(), section.total());
        for (category, stats) in &section.by_category {
            println!(
                "  {:<8} {:>4}  {}",
                category.as_str(),
                stats.count,
                format_duration(stats.duration_secs)
            );
        }
        if !section.partners.is_empty() {
            let names: Vec<String> = section
                .partners
                .iter()
                .map(|(name, count)| format!("{} ({})", name, count))
                .collect();
            println!("  with {}", names.join(", "));
        }
    }
}

pub fn calendar(year: i32, days: &BTreeMap<String, BTreeSet<Category>>) {
    println!("{}: {} days with activity", year, days.len());
    for (day, categories) in days {
        println!("  {}  {}", day, format_day_marker(categories));
    }
}

pub fn records(records: &[LoggedHabit], zone: &Zone) {
    let mut sorted: Vec<&LoggedHabit> = records.iter().collect();
    sorted.sort_by(|a, b| {
        a.wall_start(zone)
            .cmp(&b.wall_start(zone))
            .then_with(|| a.id.cmp(&b.id))
    });

    for record in sorted {
        println!("{}", record_line(record, Some(zone)));
    }
}

pub fn imports(history: &[ImportRecord]) {
    if history.is_empty() {
        println!("No imports yet.");
        return;
    }
    for entry in history {
        println!(
            "{}  year {}  {} imported, {} lines and {} chunks skipped",
            entry.imported_at.format("%Y-%m-%d %H:%M"),
            entry.year,
            entry.imported,
            entry.skipped_lines,
            entry.skipped_chunks
        );
    }
}

/// One record on one line. With a zone, the wall-clock start leads the line.
fn record_line(record: &LoggedHabit, zone: Option<&Zone>) -> String {
    let mut parts = Vec::new();
    if let Some(zone) = zone {
        parts.push(match record.wall_start(zone) {
            Some(wall) => wall.format("%Y-%m-%d %H:%M").to_string(),
            None => format!("{:<16}", "?"),
        });
    }
    parts.push(format!("{:<6}", record.category.as_str()));
    if record.duration_secs > 0 {
        parts.push(format_duration(record.duration_secs));
    }
    if let Some(count) = record.sub_events {
        parts.push(format!("{} edges", count));
    }
    let partners = format_partners(record.partners.as_deref());
    if !partners.is_empty() {
        parts.push(format!("with {}", partners));
    }
    if let Some(notes) = &record.notes {
        parts.push(format!("\"{}\"", notes));
    }
    parts.push(format!("[{}]", record.id));
    parts.join("  ")
}
