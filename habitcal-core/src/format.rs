//! Formatting helpers shared across front ends.

use crate::types::Category;
use std::collections::BTreeSet;

/// Format a duration in seconds (e.g., "45s", "12m 5s", "1h 30m").
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        let (m, s) = (secs / 60, secs % 60);
        if s > 0 {
            format!("{}m {}s", m, s)
        } else {
            format!("{}m", m)
        }
    } else {
        let (h, m) = (secs / 3600, (secs % 3600) / 60);
        if m > 0 {
            format!("{}h {}m", h, m)
        } else {
            format!("{}h", h)
        }
    }
}

/// Compact marker for a calendar cell ("B F S" style, "-" for empty).
pub fn format_day_marker(categories: &BTreeSet<Category>) -> String {
    if categories.is_empty() {
        return "-".to_string();
    }
    categories
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Join partner names for display, or an empty string.
pub fn format_partners(partners: Option<&[String]>) -> String {
    partners.map(|p| p.join(", ")).unwrap_or_default()
}
