//! Time zone used for calendar keys and time-of-day buckets.
//!
//! Records store absolute instants. Everything the calendar shows (which day
//! a record falls on, which month, whether it was "morning") is wall-clock
//! time, so every derived view goes through a [`Zone`].

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDateTime, Offset, TimeZone, Utc};

/// Wall-clock zone for day/month keys and time-of-day buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Zone {
    /// The host's local time zone
    #[default]
    Local,
    /// Coordinated Universal Time
    Utc,
    /// A fixed offset from UTC (no daylight saving)
    Fixed(FixedOffset),
}

impl Zone {
    /// Wall-clock view of an absolute instant.
    pub fn localize(&self, instant: &DateTime<FixedOffset>) -> NaiveDateTime {
        match self {
            Zone::Local => instant.with_timezone(&Local).naive_local(),
            Zone::Utc => instant.naive_utc(),
            Zone::Fixed(offset) => instant.with_timezone(offset).naive_local(),
        }
    }

    /// Absolute instant for a wall-clock time in this zone.
    ///
    /// Returns `None` when the wall-clock time does not exist (a daylight
    /// saving gap). Ambiguous times resolve to the earlier instant.
    pub fn resolve(&self, wall: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            Zone::Local => Local
                .from_local_datetime(&wall)
                .earliest()
                .map(|dt| dt.with_timezone(&dt.offset().fix())),
            Zone::Utc => Some(Utc.from_utc_datetime(&wall).fixed_offset()),
            Zone::Fixed(offset) => offset.from_local_datetime(&wall).single(),
        }
    }

    /// Like [`Zone::resolve`], but a time inside a daylight saving gap moves
    /// forward one hour instead of failing.
    pub fn resolve_forward(&self, wall: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        self.resolve(wall)
            .or_else(|| self.resolve(wall + Duration::hours(1)))
    }

    /// The current instant, expressed with this zone's offset.
    pub fn now(&self) -> DateTime<FixedOffset> {
        let now = Utc::now();
        match self {
            Zone::Local => now.with_timezone(&Local).fixed_offset(),
            Zone::Utc => now.fixed_offset(),
            Zone::Fixed(offset) => now.with_timezone(offset),
        }
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Zone::Local => write!(f, "local"),
            Zone::Utc => write!(f, "utc"),
            Zone::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

impl std::str::FromStr for Zone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "local" => return Ok(Zone::Local),
            "utc" | "z" => return Ok(Zone::Utc),
            _ => {}
        }

        let (sign, rest) = match trimmed.as_bytes().first() {
            Some(b'+') => (1, &trimmed[1..]),
            Some(b'-') => (-1, &trimmed[1..]),
            _ => return Err(format!("unknown time zone: {}", s)),
        };
        let (hours, minutes) = rest
            .split_once(':')
            .ok_or_else(|| format!("offset must look like +HH:MM: {}", s))?;
        let hours: i32 = hours
            .parse()
            .map_err(|_| format!("invalid offset hours: {}", s))?;
        let minutes: i32 = minutes
            .parse()
            .map_err(|_| format!("invalid offset minutes: {}", s))?;
        if hours > 23 || minutes > 59 {
            return Err(format!("offset out of range: {}", s));
        }

        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(Zone::Fixed)
            .ok_or_else(|| format!("offset out of range: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn wall(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_zones() {
        assert_eq!("local".parse::<Zone>().unwrap(), Zone::Local);
        assert_eq!("UTC".parse::<Zone>().unwrap(), Zone::Utc);
        assert_eq!(
            "+02:00".parse::<Zone>().unwrap(),
            Zone::Fixed(FixedOffset::east_opt(7200).unwrap())
        );
        assert_eq!(
            "-05:30".parse::<Zone>().unwrap(),
            Zone::Fixed(FixedOffset::west_opt(5 * 3600 + 1800).unwrap())
        );
        assert!("mars".parse::<Zone>().is_err());
        assert!("+25:00".parse::<Zone>().is_err());
    }

    #[test]
    fn test_fixed_zone_round_trips_wall_clock() {
        let zone: Zone = "+02:00".parse().unwrap();
        let instant = zone.resolve(wall(2024, 7, 1, 9, 0)).unwrap();
        assert_eq!(instant.to_rfc3339(), "2024-07-01T09:00:00+02:00");
        assert_eq!(zone.localize(&instant), wall(2024, 7, 1, 9, 0));

        // The same instant seen from UTC is two hours earlier.
        assert_eq!(Zone::Utc.localize(&instant).hour(), 7);
    }

    #[test]
    fn test_localize_crosses_midnight() {
        let instant = DateTime::parse_from_rfc3339("2024-07-01T23:30:00Z").unwrap();
        let zone: Zone = "+01:00".parse().unwrap();
        assert_eq!(zone.localize(&instant), wall(2024, 7, 2, 0, 30));
    }
}
