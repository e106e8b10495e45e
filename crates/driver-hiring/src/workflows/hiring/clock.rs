use chrono::{DateTime, Utc};

use super::history::YearMonth;

/// Source of "now" for audit timestamps and history lookback windows.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn current_month(&self) -> YearMonth {
        YearMonth::from_date(self.now().date_naive())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Pinned clock for demos and deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
