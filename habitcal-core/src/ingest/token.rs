//! Token classification for one import line.
//!
//! Precedence, highest first:
//! 1. `<N> edge(s)` (two tokens) or `<N>edges` (one token)
//! 2. category keywords: `BOB`, `FL` (any case) and `1` for BOB
//! 3. time-of-day labels (any case)
//! 4. `x<N>` repeat counts
//! 5. `HH:MM` clock times
//! 6. capitalized words, read as partner names
//! 7. anything else is note text

use crate::types::{Category, TimeOfDay};
use chrono::NaiveTime;

/// Largest `x<N>` accepted. Anything above is treated as a typo.
pub const MAX_REPEAT: u32 = 50;

/// One classified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Category(Category),
    Partner(String),
    Label(TimeOfDay),
    /// `None` when the count is zero, too large or unreadable
    Repeat(Option<u32>),
    /// `None` when the token looks like a clock time but is not one
    Clock(Option<NaiveTime>),
    /// `None` when the count overflows
    Edges(Option<u32>),
    Word(&'a str),
}

impl Token<'_> {
    /// Whether this token starts a new chunk.
    pub fn opens_chunk(&self) -> bool {
        matches!(self, Token::Category(_) | Token::Partner(_))
    }
}

/// Classify the whitespace-separated words following the date token.
pub fn tokenize<'a>(words: &[&'a str]) -> Vec<Token<'a>> {
    let mut tokens = Vec::with_capacity(words.len());
    let mut i = 0;

    while i < words.len() {
        let word = words[i];

        if let Some(next) = words.get(i + 1) {
            if is_number(word) && is_edge_word(next) {
                tokens.push(Token::Edges(word.parse().ok()));
                i += 2;
                continue;
            }
        }

        tokens.push(classify(word));
        i += 1;
    }

    tokens
}

fn classify(word: &str) -> Token<'_> {
    if let Some(edges) = compact_edges(word) {
        return Token::Edges(edges);
    }

    match word.to_ascii_uppercase().as_str() {
        "1" | "BOB" => return Token::Category(Category::Bob),
        "FL" => return Token::Category(Category::Fl),
        _ => {}
    }

    if let Ok(label) = word.parse::<TimeOfDay>() {
        return Token::Label(label);
    }

    if let Some(digits) = word.strip_prefix(['x', 'X']) {
        if is_number(digits) {
            let repeat = digits
                .parse::<u32>()
                .ok()
                .filter(|n| (1..=MAX_REPEAT).contains(n));
            return Token::Repeat(repeat);
        }
    }

    if let Some(clock) = clock_time(word) {
        return Token::Clock(clock);
    }

    if let Some(name) = partner_name(word) {
        return Token::Partner(name);
    }

    Token::Word(word)
}

fn is_number(word: &str) -> bool {
    !word.is_empty() && word.bytes().all(|b| b.is_ascii_digit())
}

fn is_edge_word(word: &str) -> bool {
    let lower = word.trim_end_matches(',').to_ascii_lowercase();
    lower == "edge" || lower == "edges"
}

/// `3edges` / `1edge`
fn compact_edges(word: &str) -> Option<Option<u32>> {
    let lower = word.trim_end_matches(',').to_ascii_lowercase();
    let digits = lower
        .strip_suffix("edges")
        .or_else(|| lower.strip_suffix("edge"))?;
    is_number(digits).then(|| digits.parse().ok())
}

/// `Some(None)` for a token shaped like `HH:MM` whose value is out of range.
fn clock_time(word: &str) -> Option<Option<NaiveTime>> {
    let (hours, minutes) = word.split_once(':')?;
    if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
        return None;
    }
    if !is_number(hours) || !is_number(minutes) {
        return None;
    }
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    Some(NaiveTime::from_hms_opt(hours, minutes, 0))
}

/// A capitalized word of at least two letters, trailing commas dropped.
fn partner_name(word: &str) -> Option<String> {
    let name = word.trim_end_matches(',');
    let mut chars = name.chars();
    let first = chars.next()?;
    if !first.is_uppercase() || name.chars().count() < 2 {
        return None;
    }
    if !chars.all(|c| c.is_alphabetic() || c == '-' || c == '\'') {
        return None;
    }
    Some(name.to_string())
}
