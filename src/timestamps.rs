//! Parsing of the textual timestamps the admin API emits.
//!
//! Accepted shapes: `YYYY-MM-DD`, optionally followed by a space or `T`, a
//! clock time (`HH:mm` or `HH:mm:ss`, optional fraction) and an optional
//! timezone suffix (`Z`, `+HH`, `+HHMM`, `+HH:MM`). Values without a suffix
//! are wall-clock times in the local timezone; bare dates are UTC midnight.

use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TIMESTAMP: Regex = Regex::new(
        r"^\s*(\d{4}-\d{2}-\d{2})(?:[ Tt](\d{2}:\d{2}(?::\d{2})?)(?:\.(\d+))?)?\s*([Zz]|[+-]\d{2}(?::?\d{2})?)?\s*$"
    )
    .expect("timestamp regex is valid");
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Local>> {
    let captures = TIMESTAMP.captures(value)?;
    let date = NaiveDate::parse_from_str(captures.get(1)?.as_str(), "%Y-%m-%d").ok()?;

    let time = match captures.get(2) {
        Some(clock) => parse_clock(clock.as_str())?,
        None => NaiveTime::MIN,
    };
    let time = match captures.get(3) {
        Some(fraction) => time.with_nanosecond(fraction_nanos(fraction.as_str()))?,
        None => time,
    };
    let naive = NaiveDateTime::new(date, time);

    match captures.get(4).map(|m| m.as_str()) {
        Some("Z") | Some("z") => Some(Utc.from_utc_datetime(&naive).with_timezone(&Local)),
        Some(offset) => {
            let offset = parse_offset(offset)?;
            let at = offset.from_local_datetime(&naive).single()?;
            Some(at.with_timezone(&Local))
        }
        None if captures.get(2).is_none() => {
            Some(Utc.from_utc_datetime(&naive).with_timezone(&Local))
        }
        None => Local.from_local_datetime(&naive).earliest(),
    }
}

/// `YYYY-MM-DD HH:mm:ss` in local time, `-` for missing or unparseable input.
pub fn format_timestamp(value: Option<&str>) -> String {
    value
        .and_then(parse_timestamp)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn parse_clock(clock: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(clock, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(clock, "%H:%M"))
        .ok()
}

fn fraction_nanos(digits: &str) -> u32 {
    let mut nanos: String = digits.chars().take(9).collect();
    while nanos.len() < 9 {
        nanos.push('0');
    }
    nanos.parse().unwrap_or(0)
}

fn parse_offset(offset: &str) -> Option<FixedOffset> {
    let sign = if offset.starts_with('-') { -1 } else { 1 };
    let digits: String = offset[1..].chars().filter(|c| c.is_ascii_digit()).collect();
    let hours: i32 = digits.get(0..2)?.parse().ok()?;
    let minutes: i32 = match digits.get(2..4) {
        Some(minutes) => minutes.parse().ok()?,
        None => 0,
    };
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
