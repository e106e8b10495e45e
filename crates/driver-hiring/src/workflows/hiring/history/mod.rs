//! Employment and residency history reconciliation.

mod gaps;
mod period;

pub use gaps::{detect_gaps, GapPeriod, GapReport};
pub use period::{MonthRange, MonthSpan, Tenure, YearMonth, MAX_YEAR, MIN_YEAR};

use serde::{Deserialize, Serialize};

/// Malformed interval data rejected before any gap is computed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("month {month} is outside 1-12")]
    MonthOutOfRange { month: u32 },
    #[error("year {year} is outside {}..={}", MIN_YEAR, MAX_YEAR)]
    YearOutOfRange { year: i32 },
    #[error("interval ends ({to}) before it starts ({from})")]
    EndsBeforeStart { from: YearMonth, to: YearMonth },
    #[error("interval #{index}: {source}")]
    Interval {
        index: usize,
        source: Box<HistoryError>,
    },
}

/// Which applicant history a lookback window applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    Employment,
    Residency,
}

impl HistoryKind {
    pub const fn label(self) -> &'static str {
        match self {
            HistoryKind::Employment => "employment",
            HistoryKind::Residency => "residency",
        }
    }
}

/// Trailing windows an applicant must account for, in months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookbackPolicy {
    employment_months: u32,
    residency_months: u32,
}

impl LookbackPolicy {
    pub fn new(employment_months: u32, residency_months: u32) -> Self {
        Self {
            employment_months,
            residency_months,
        }
    }

    pub fn required_months(&self, kind: HistoryKind) -> u32 {
        match kind {
            HistoryKind::Employment => self.employment_months,
            HistoryKind::Residency => self.residency_months,
        }
    }

    pub fn check<T: Tenure>(
        &self,
        kind: HistoryKind,
        intervals: &[T],
        today: YearMonth,
    ) -> Result<GapReport, HistoryError> {
        detect_gaps(intervals, self.required_months(kind), today)
    }
}

impl Default for LookbackPolicy {
    fn default() -> Self {
        Self::new(36, 36)
    }
}
