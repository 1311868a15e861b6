//! Canonical calendar-date keys and calendar arithmetic.
//!
//! # Responsibility
//! - Validate externally supplied `YYYY-MM-DD` strings.
//! - Provide day/week arithmetic on calendar dates without wall-clock reads.
//! - Project an instant through a named zone into the caller-local date.
//!
//! # Invariants
//! - Every `DateKey` renders as exactly `YYYY-MM-DD` and denotes a real date
//!   in years `0000..=9999`; arithmetic saturates at those bounds.
//! - Lexicographic order of the rendered key equals chronological order.
//! - Nothing in this module reads the process clock.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static DATE_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date key regex"));

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";
const MIN_YEAR: i32 = 0;
const MAX_YEAR: i32 = 9999;

/// Errors from date-key parsing and zone projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateKeyError {
    /// Input does not match `YYYY-MM-DD` or names no real calendar date.
    InvalidDateKey(String),
    /// Zone name is not a known IANA zone.
    UnknownTimeZone(String),
}

impl Display for DateKeyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDateKey(value) => write!(f, "invalid date key: `{value}`"),
            Self::UnknownTimeZone(value) => write!(f, "unknown time zone: `{value}`"),
        }
    }
}

impl Error for DateKeyError {}

/// Calendar date without time-of-day or zone component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    /// Parses and validates one external date string.
    ///
    /// The `^\d{4}-\d{2}-\d{2}$` shape check runs first; the calendar check
    /// then rejects shapes like `2026-02-30`.
    pub fn parse(value: &str) -> Result<Self, DateKeyError> {
        if !DATE_KEY_RE.is_match(value) {
            return Err(DateKeyError::InvalidDateKey(value.to_string()));
        }
        NaiveDate::parse_from_str(value, DATE_KEY_FORMAT)
            .map(Self)
            .map_err(|_| DateKeyError::InvalidDateKey(value.to_string()))
    }

    /// Builds a key from calendar components.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, DateKeyError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .filter(|date| in_key_range(*date))
            .map(Self)
            .ok_or_else(|| DateKeyError::InvalidDateKey(format!("{year:04}-{month:02}-{day:02}")))
    }

    /// Wraps a calendar date if its year fits the four-digit form.
    pub fn from_naive(date: NaiveDate) -> Result<Self, DateKeyError> {
        if in_key_range(date) {
            Ok(Self(date))
        } else {
            Err(DateKeyError::InvalidDateKey(date.to_string()))
        }
    }

    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }

    /// Returns the date `days` calendar days away (negative moves backwards).
    ///
    /// Saturates at `0000-01-01` and `9999-12-31`.
    pub fn add_days(&self, days: i64) -> Self {
        let shifted = Duration::try_days(days)
            .and_then(|delta| self.0.checked_add_signed(delta))
            .filter(|date| in_key_range(*date));
        match shifted {
            Some(date) => Self(date),
            None if days < 0 => Self(first_key_date()),
            None => Self(last_key_date()),
        }
    }

    /// Monday of the ISO week containing this date.
    pub fn iso_week_start(&self) -> Self {
        let offset = i64::from(self.0.weekday().num_days_from_monday());
        self.add_days(-offset)
    }

    /// Sunday of the ISO week containing this date.
    pub fn iso_week_end(&self) -> Self {
        self.iso_week_start().add_days(6)
    }
}

impl Display for DateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(DATE_KEY_FORMAT))
    }
}

impl FromStr for DateKey {
    type Err = DateKeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}

/// Compares two keys chronologically.
pub fn compare(a: &DateKey, b: &DateKey) -> std::cmp::Ordering {
    a.cmp(b)
}

/// Lists every date from `start` to `end`, both inclusive, ascending.
///
/// Returns an empty list when `start > end`.
pub fn list_inclusive(start: DateKey, end: DateKey) -> Vec<DateKey> {
    if start > end {
        return Vec::new();
    }
    start
        .as_naive()
        .iter_days()
        .take_while(|date| *date <= end.as_naive())
        .map(DateKey)
        .collect()
}

/// Resolves an IANA zone name.
pub fn parse_time_zone(name: &str) -> Result<Tz, DateKeyError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| DateKeyError::UnknownTimeZone(name.to_string()))
}

/// Derives the caller-local calendar date for `instant` in zone `timezone`.
pub fn today(timezone: &str, instant: DateTime<Utc>) -> Result<DateKey, DateKeyError> {
    let tz = parse_time_zone(timezone)?;
    DateKey::from_naive(instant.with_timezone(&tz).date_naive())
}

fn in_key_range(date: NaiveDate) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&date.year())
}

fn first_key_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(MIN_YEAR, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn last_key_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(MAX_YEAR, 12, 31).unwrap_or(NaiveDate::MAX)
}
