use serde::{Deserialize, Serialize};

use super::period::{MonthSpan, Tenure, YearMonth};
use super::HistoryError;

/// Uncovered span surfaced to the applicant for acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapPeriod {
    pub from: YearMonth,
    pub to: YearMonth,
}

impl GapPeriod {
    pub fn months(&self) -> u32 {
        self.to.months_through(self.from)
    }
}

/// Result of walking a reported history against a trailing lookback window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapReport {
    pub gap_detected: bool,
    pub periods: Vec<GapPeriod>,
    pub total_covered_months: u32,
    pub required_months: u32,
}

/// Walk `intervals` from the most recent backwards and report uncovered months.
///
/// Covered months are summed per interval without merging overlaps, so two
/// overlapping jobs count their shared months twice toward `required_months`.
pub fn detect_gaps<T: Tenure>(
    intervals: &[T],
    required_months: u32,
    today: YearMonth,
) -> Result<GapReport, HistoryError> {
    let mut spans = intervals
        .iter()
        .enumerate()
        .map(|(index, interval)| {
            MonthSpan::of(interval).map_err(|source| HistoryError::Interval {
                index,
                source: Box::new(source),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if spans.is_empty() {
        let periods = if required_months > 0 {
            vec![GapPeriod {
                from: today.sub_months(i64::from(required_months) - 1),
                to: today,
            }]
        } else {
            Vec::new()
        };

        return Ok(GapReport {
            gap_detected: required_months > 0,
            periods,
            total_covered_months: 0,
            required_months,
        });
    }

    spans.sort_by(|left, right| right.to.cmp(&left.to));

    let mut periods = Vec::new();
    let mut cursor = today;
    for span in &spans {
        if cursor.months_since(span.to) > 1 {
            periods.push(GapPeriod {
                from: span.to.add_months(1),
                to: cursor.sub_months(1),
            });
        }
        cursor = cursor.min(span.from);
    }

    let total_covered_months = spans
        .iter()
        .map(MonthSpan::months)
        .fold(0u32, u32::saturating_add);

    Ok(GapReport {
        gap_detected: !periods.is_empty() || total_covered_months < required_months,
        periods,
        total_covered_months,
        required_months,
    })
}
