//! Calendar month values in `YYYY-MM` form.
//!
//! Month arithmetic works on the ordinal `year * 12 + (month - 1)` so
//! that no calendar library is involved and overflow into the year
//! component is plain integer division.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MAX_YEAR: i64 = 9999;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonthError {
    #[error("invalid month format '{0}' (expected YYYY-MM)")]
    Format(String),

    #[error("month arithmetic left the supported range 0000-01..9999-12")]
    OutOfRange,
}

/// A calendar month, e.g. `2024-01`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: u16,
    month: u8,
}

impl YearMonth {
    pub fn new(year: u16, month: u8) -> Result<Self, MonthError> {
        if i64::from(year) > MAX_YEAR || !(1..=12).contains(&month) {
            return Err(MonthError::OutOfRange);
        }
        Ok(Self { year, month })
    }

    /// The month containing the current UTC instant.
    pub fn current() -> Self {
        let today = Utc::now().date_naive();
        // chrono years for "now" are always within 0..=9999.
        Self {
            year: today.year().clamp(0, MAX_YEAR as i32) as u16,
            month: today.month() as u8,
        }
    }

    pub fn year(self) -> u16 {
        self.year
    }

    pub fn month(self) -> u8 {
        self.month
    }

    /// Zero-based month index since 0000-01.
    pub fn ordinal(self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    pub fn from_ordinal(ordinal: i64) -> Result<Self, MonthError> {
        if !(0..=MAX_YEAR * 12 + 11).contains(&ordinal) {
            return Err(MonthError::OutOfRange);
        }
        Ok(Self {
            year: ordinal.div_euclid(12) as u16,
            month: (ordinal.rem_euclid(12) + 1) as u8,
        })
    }

    pub fn plus_months(self, months: i64) -> Result<Self, MonthError> {
        let ordinal = self
            .ordinal()
            .checked_add(months)
            .ok_or(MonthError::OutOfRange)?;
        Self::from_ordinal(ordinal)
    }

    /// Signed number of months from `self` to `other`.
    pub fn months_until(self, other: YearMonth) -> i64 {
        other.ordinal() - self.ordinal()
    }

    /// Every month from `self` to `end`, both inclusive. Empty when
    /// `end` precedes `self`.
    pub fn through(self, end: YearMonth) -> impl Iterator<Item = YearMonth> {
        (self.ordinal()..=end.ordinal()).filter_map(|o| Self::from_ordinal(o).ok())
    }
}

impl FromStr for YearMonth {
    type Err = MonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        let well_formed = bytes.len() == 7
            && bytes[4] == b'-'
            && bytes[..4].iter().all(u8::is_ascii_digit)
            && bytes[5..].iter().all(u8::is_ascii_digit);
        if !well_formed {
            return Err(MonthError::Format(s.to_string()));
        }

        let year: u16 = s[..4]
            .parse()
            .map_err(|_| MonthError::Format(s.to_string()))?;
        let month: u8 = s[5..]
            .parse()
            .map_err(|_| MonthError::Format(s.to_string()))?;
        if !(1..=12).contains(&month) {
            return Err(MonthError::Format(s.to_string()));
        }

        Ok(Self { year, month })
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = MonthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}
