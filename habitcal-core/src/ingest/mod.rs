//! Bulk import of pasted plain text
//!
//! ## Format
//!
//! ```text
//! 2024
//! 01/07 BOB morning
//! 03/07 FL x2
//! 05/07 Alice, Carol night 2 edges great evening
//! 06/07/2023 1 07:30 FL afternoon
//! ```
//!
//! The first non-empty line may be a four-digit year that applies to every
//! date without its own year. Each following line starts with a `DD/MM` or
//! `DD/MM/YYYY` date and continues with zero or more chunks. A chunk opens at
//! a category keyword or a partner name and collects the modifiers after it;
//! see [`token`] for how words are classified. Partner names that follow one
//! another directly (`Alice Carol`, `Alice, Carol`) share one SOCIAL chunk;
//! any other token between them starts a new one.
//!
//! ## Leniency
//!
//! A line with a bad date is skipped. A chunk with a bad modifier (`x0`,
//! `25:00`) is skipped. Neither aborts the import. There is no deduplication
//! against existing data: importing the same text twice yields every record
//! twice.

pub mod token;

use crate::error::{Error, Result};
use crate::types::{
    format_timestamp, new_record_id, Category, HabitFields, LoggedHabit, TimeOfDay,
};
use crate::zone::Zone;
use chrono::{NaiveDate, NaiveTime};
use token::Token;

/// Settings that fill in what import text leaves out.
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    /// Zone in which dates and clock times are read
    pub zone: Zone,
    /// Bucket for chunks with neither a label nor a clock time
    pub default_time_of_day: TimeOfDay,
    /// Hour standing in for `not-sure`
    pub unsure_hour: u32,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            zone: Zone::Local,
            default_time_of_day: TimeOfDay::Morning,
            unsure_hour: 12,
        }
    }
}

/// Outcome of one import.
#[derive(Debug, Default)]
pub struct ImportResult {
    /// New canonical records, in input order
    pub records: Vec<LoggedHabit>,
    /// Year applied to dates without their own
    pub year: i32,
    /// Lines skipped because the date token was unreadable
    pub skipped_lines: usize,
    /// Chunks skipped because a modifier was malformed
    pub skipped_chunks: usize,
}

impl ImportResult {
    pub fn imported_count(&self) -> usize {
        self.records.len()
    }
}

/// Parse import text into canonical records.
///
/// `fallback_year` is used when the first line is not a year. With neither,
/// the import fails with [`Error::Parse`]; that is the only hard failure.
pub fn parse_import(
    text: &str,
    fallback_year: Option<i32>,
    opts: &ImportOptions,
) -> Result<ImportResult> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty()).peekable();

    let header_year = lines.peek().and_then(|first| parse_year(first));
    let year = match (header_year, fallback_year) {
        (Some(year), _) => {
            lines.next();
            year
        }
        (None, Some(year)) => year,
        (None, None) => {
            return Err(Error::Parse(
                "first line must be a four-digit year".to_string(),
            ))
        }
    };

    let mut result = ImportResult {
        year,
        ..Default::default()
    };

    for (number, line) in lines.enumerate() {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some(date) = words.first().and_then(|w| parse_date(w, year)) else {
            tracing::debug!(line = number + 1, text = %line, "Skipping import line without a valid date");
            result.skipped_lines += 1;
            continue;
        };

        parse_line(date, &words[1..], opts, &mut result);
    }

    tracing::info!(
        year,
        imported = result.records.len(),
        skipped_lines = result.skipped_lines,
        skipped_chunks = result.skipped_chunks,
        "Parsed import text"
    );

    Ok(result)
}

fn parse_year(line: &str) -> Option<i32> {
    (line.len() == 4 && line.bytes().all(|b| b.is_ascii_digit()))
        .then(|| line.parse().ok())
        .flatten()
}

/// `DD/MM` or `DD/MM/YYYY`, checked against the calendar.
fn parse_date(token: &str, default_year: i32) -> Option<NaiveDate> {
    let parts: Vec<&str> = token.split('/').collect();
    let (day, month, year) = match parts.as_slice() {
        [day, month] => (*day, *month, None),
        [day, month, year] => (*day, *month, Some(*year)),
        _ => return None,
    };

    let day: u32 = day.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return None;
    }
    let year = match year {
        Some(raw) => parse_year(raw)?,
        None => default_year,
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_line(date: NaiveDate, words: &[&str], opts: &ImportOptions, result: &mut ImportResult) {
    let tokens = token::tokenize(words);
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut previous_was_partner = false;

    for token in tokens {
        let is_partner = matches!(token, Token::Partner(_));

        match token {
            Token::Partner(name) if previous_was_partner => {
                if let Some(chunk) = chunks.last_mut() {
                    chunk.partners.push(name);
                }
            }
            opener if opener.opens_chunk() => chunks.extend(Chunk::open(opener)),
            modifier => {
                if chunks.is_empty() {
                    chunks.push(Chunk::new(Category::Bob));
                }
                if let Some(chunk) = chunks.last_mut() {
                    chunk.apply(modifier);
                }
            }
        }

        previous_was_partner = is_partner;
    }

    if chunks.is_empty() {
        chunks.push(Chunk::new(Category::Bob));
    }

    for chunk in chunks {
        match chunk.into_records(date, opts) {
            Ok(records) => result.records.extend(records),
            Err(reason) => {
                tracing::debug!(%date, reason, "Skipping malformed import chunk");
                result.skipped_chunks += 1;
            }
        }
    }
}

/// One category or partner group and its modifiers.
#[derive(Debug)]
struct Chunk<'a> {
    category: Category,
    partners: Vec<String>,
    label: Option<TimeOfDay>,
    clock: Option<NaiveTime>,
    repeat: u32,
    edges: Option<u32>,
    notes: Vec<&'a str>,
    malformed: Option<&'static str>,
}

impl<'a> Chunk<'a> {
    fn new(category: Category) -> Self {
        Self {
            category,
            partners: Vec::new(),
            label: None,
            clock: None,
            repeat: 1,
            edges: None,
            notes: Vec::new(),
            malformed: None,
        }
    }

    /// A fresh chunk for a category keyword or a partner name.
    fn open(token: Token<'a>) -> Option<Self> {
        match token {
            Token::Category(category) => Some(Self::new(category)),
            Token::Partner(name) => Some(Self::social(name)),
            _ => None,
        }
    }

    fn social(partner: String) -> Self {
        let mut chunk = Self::new(Category::Social);
        chunk.partners.push(partner);
        chunk
    }

    fn apply(&mut self, token: Token<'a>) {
        match token {
            Token::Label(label) => self.label = Some(label),
            Token::Repeat(Some(n)) => self.repeat = n,
            Token::Repeat(None) => self.malformed = Some("repeat count out of range"),
            Token::Clock(Some(time)) => self.clock = Some(time),
            Token::Clock(None) => self.malformed = Some("invalid clock time"),
            Token::Edges(Some(n)) => self.edges = Some(n),
            Token::Edges(None) => self.malformed = Some("edge count out of range"),
            Token::Word(word) => self.notes.push(word),
            Token::Category(_) | Token::Partner(_) => {}
        }
    }

    fn into_records(
        self,
        date: NaiveDate,
        opts: &ImportOptions,
    ) -> std::result::Result<Vec<LoggedHabit>, &'static str> {
        if let Some(reason) = self.malformed {
            return Err(reason);
        }

        let time = match (self.clock, self.label) {
            (Some(clock), _) => clock,
            (None, label) => {
                let bucket = label.unwrap_or(opts.default_time_of_day);
                let hour = bucket.representative_hour(opts.unsure_hour).min(23);
                NaiveTime::from_hms_opt(hour, 0, 0).ok_or("representative hour out of range")?
            }
        };
        let start = opts
            .zone
            .resolve_forward(date.and_time(time))
            .ok_or("time does not exist in zone")?;
        let start_time = format_timestamp(&start);

        let notes = (!self.notes.is_empty()).then(|| self.notes.join(" "));

        (0..self.repeat)
            .map(|i| {
                HabitFields {
                    category: self.category.as_str().to_string(),
                    start_time: Some(start_time.clone()),
                    duration_secs: 0,
                    partners: self.partners.clone(),
                    // One session's edge count belongs to one record.
                    sub_events: if i == 0 { self.edges.map(i64::from) } else { None },
                    notes: notes.clone(),
                }
                .into_record(new_record_id())
                .map_err(|_| "chunk produced an invalid record")
            })
            .collect()
    }
}
