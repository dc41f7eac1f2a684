//! Calendar-month grading period.
//!
//! # Invariants
//! - A `Period` always holds the first day of a month.
//! - Period boundaries are UTC midnight; `start` is inclusive, `end` exclusive.

use crate::model::validation::ValidationError;
use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

static PERIOD_TEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-01$").expect("valid period regex"));

/// A calendar month, identified by its first-of-month date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period(NaiveDate);

impl Period {
    /// Builds the period for `year`/`month` (1-based month).
    pub fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidPeriod(format!("{year:04}-{month:02}-01")))
    }

    /// Period containing the given instant (UTC).
    pub fn containing(instant: DateTime<Utc>) -> Self {
        let date = instant.date_naive();
        Self(date.with_day(1).unwrap_or(date))
    }

    /// Parses the `YYYY-MM-01` text form.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        if !PERIOD_TEXT_RE.is_match(trimmed) {
            return Err(ValidationError::InvalidPeriod(trimmed.to_string()));
        }
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map(Self)
            .map_err(|_| ValidationError::InvalidPeriod(trimmed.to_string()))
    }

    pub fn first_day(self) -> NaiveDate {
        self.0
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    /// The month immediately before this one.
    pub fn previous(self) -> Self {
        Self(self.0.checked_sub_months(Months::new(1)).unwrap_or(self.0))
    }

    /// The month immediately after this one.
    pub fn next(self) -> Self {
        Self(self.0.checked_add_months(Months::new(1)).unwrap_or(self.0))
    }

    /// Inclusive start instant.
    pub fn start(self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.0.and_time(chrono::NaiveTime::MIN))
    }

    /// Exclusive end instant (start of the following period).
    pub fn end(self) -> DateTime<Utc> {
        self.next().start()
    }

    pub fn start_epoch_ms(self) -> i64 {
        self.start().timestamp_millis()
    }

    pub fn end_epoch_ms(self) -> i64 {
        self.end().timestamp_millis()
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl TryFrom<String> for Period {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Period> for String {
    fn from(value: Period) -> Self {
        value.to_string()
    }
}
