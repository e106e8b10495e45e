use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::HistoryError;

/// Earliest year accepted on any history interval.
pub const MIN_YEAR: i32 = 1900;
/// Latest year accepted on any history interval.
pub const MAX_YEAR: i32 = 9999;

/// Calendar month used as the unit of every history computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, HistoryError> {
        if !(1..=12).contains(&month) {
            return Err(HistoryError::MonthOutOfRange { month });
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(HistoryError::YearOutOfRange { year });
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Months elapsed since year zero; ordering-compatible with `Ord`.
    pub fn ordinal(self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    fn from_ordinal(ordinal: i64) -> Self {
        let year = ordinal.div_euclid(12);
        let month = ordinal.rem_euclid(12) + 1;
        Self {
            year: year as i32,
            month: month as u32,
        }
    }

    pub fn add_months(self, months: i64) -> Self {
        Self::from_ordinal(self.ordinal() + months)
    }

    pub fn sub_months(self, months: i64) -> Self {
        Self::from_ordinal(self.ordinal() - months)
    }

    /// Signed number of months from `earlier` to `self`.
    pub fn months_since(self, earlier: YearMonth) -> i64 {
        self.ordinal() - earlier.ordinal()
    }

    /// Inclusive count of months from `earlier` through `self`; zero when `self` is earlier.
    pub fn months_through(self, earlier: YearMonth) -> u32 {
        let months = self.months_since(earlier).saturating_add(1).max(0);
        u32::try_from(months).unwrap_or(u32::MAX)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Raw from/to month-year bounds exactly as the applicant entered them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthRange {
    pub from_month: u32,
    pub from_year: i32,
    pub to_month: u32,
    pub to_year: i32,
}

impl MonthRange {
    pub fn new(from: (i32, u32), to: (i32, u32)) -> Self {
        Self {
            from_month: from.1,
            from_year: from.0,
            to_month: to.1,
            to_year: to.0,
        }
    }
}

/// Anything the applicant reports as a from/to month range: jobs and residences.
pub trait Tenure {
    fn range(&self) -> MonthRange;

    fn starts(&self) -> Result<YearMonth, HistoryError> {
        let range = self.range();
        YearMonth::new(range.from_year, range.from_month)
    }

    fn ends(&self) -> Result<YearMonth, HistoryError> {
        let range = self.range();
        YearMonth::new(range.to_year, range.to_month)
    }
}

impl Tenure for MonthRange {
    fn range(&self) -> MonthRange {
        *self
    }
}

/// Validated, ordered bounds of a single interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthSpan {
    pub from: YearMonth,
    pub to: YearMonth,
}

impl MonthSpan {
    pub fn of<T: Tenure>(interval: &T) -> Result<Self, HistoryError> {
        let from = interval.starts()?;
        let to = interval.ends()?;
        if to < from {
            return Err(HistoryError::EndsBeforeStart { from, to });
        }
        Ok(Self { from, to })
    }

    /// Inclusive month count: a span inside one month covers one month.
    pub fn months(&self) -> u32 {
        self.to.months_through(self.from)
    }
}
