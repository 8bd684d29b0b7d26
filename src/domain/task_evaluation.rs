//! Rules for completing tasks automatically from their linked metric.
//!
//! A task opts in by carrying a linked metric code, a target value and a
//! comparison. The metric is aggregated over the window its frequency implies
//! and the task completes when the aggregate meets the target.

use chrono::{DateTime, Datelike, Duration, Utc};
use rust_decimal::Decimal;

use super::aggregation_window::AggregationWindow;
use super::kinds::{Frequency, TargetComparison};

/// `eq` targets match within 0.0001.
const EQUAL_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 4);

pub fn condition_met(actual: Decimal, target: Decimal, comparison: TargetComparison) -> bool {
    match comparison {
        TargetComparison::GreaterOrEqual => actual >= target,
        TargetComparison::LessOrEqual => actual <= target,
        TargetComparison::Equal => actual
            .checked_sub(target)
            .map_or(false, |diff| diff.abs() < EQUAL_TOLERANCE),
    }
}

/// Daily tasks look at the calendar day, weekly ones at the Monday-based
/// week and monthly ones at the calendar month. Ad hoc tasks use the day.
pub fn evaluation_window(frequency: Frequency, at: DateTime<Utc>) -> AggregationWindow {
    match frequency {
        Frequency::Weekly => {
            let since_monday = i64::from(at.weekday().num_days_from_monday());
            AggregationWindow::weekly(at - Duration::days(since_monday))
        }
        Frequency::Monthly => AggregationWindow::month_of(at),
        Frequency::Daily | Frequency::AdHoc => AggregationWindow::daily(at),
    }
}

/// One automatic completion per task per UTC day.
pub fn completed_on_same_day(completed_at: Option<DateTime<Utc>>, at: DateTime<Utc>) -> bool {
    completed_at.map_or(false, |done| done.date_naive() == at.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn comparisons() {
        assert!(condition_met(dec!(10000), dec!(8000), TargetComparison::GreaterOrEqual));
        assert!(condition_met(dec!(8000), dec!(8000), TargetComparison::GreaterOrEqual));
        assert!(!condition_met(dec!(7999.9), dec!(8000), TargetComparison::GreaterOrEqual));

        assert!(condition_met(dec!(1800), dec!(2000), TargetComparison::LessOrEqual));
        assert!(!condition_met(dec!(2000.5), dec!(2000), TargetComparison::LessOrEqual));

        assert!(condition_met(dec!(8.00005), dec!(8), TargetComparison::Equal));
        assert!(!condition_met(dec!(8.0001), dec!(8), TargetComparison::Equal));
    }

    #[test]
    fn weekly_window_starts_on_monday() {
        // 2024-01-03 is a Wednesday
        let w = evaluation_window(Frequency::Weekly, at(2024, 1, 3, 14));
        assert_eq!(w.start, at(2024, 1, 1, 0));
        assert!(w.contains(at(2024, 1, 7, 23)));
        assert!(!w.contains(at(2024, 1, 8, 0)));

        let monday = evaluation_window(Frequency::Weekly, at(2024, 1, 8, 9));
        assert_eq!(monday.start, at(2024, 1, 8, 0));
    }

    #[test]
    fn daily_monthly_and_ad_hoc_windows() {
        let now = at(2024, 2, 20, 10);
        assert_eq!(evaluation_window(Frequency::Daily, now), AggregationWindow::daily(now));
        assert_eq!(evaluation_window(Frequency::AdHoc, now), AggregationWindow::daily(now));

        let month = evaluation_window(Frequency::Monthly, now);
        assert_eq!(month.start, at(2024, 2, 1, 0));
        assert!(month.contains(at(2024, 2, 29, 23)));
    }

    #[test]
    fn same_day_completion_blocks_another() {
        let now = at(2024, 5, 4, 12);
        assert!(completed_on_same_day(Some(at(2024, 5, 4, 1)), now));
        assert!(!completed_on_same_day(Some(at(2024, 5, 3, 23)), now));
        assert!(!completed_on_same_day(None, now));
    }
}
