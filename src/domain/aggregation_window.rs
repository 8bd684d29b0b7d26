use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::DomainError;

/// Smallest time unit of a window: 100 nanoseconds.
pub fn tick() -> Duration {
    Duration::nanoseconds(100)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowType {
    Daily,
    Weekly,
    Monthly,
    Custom,
}

/// Closed time interval `[start, end]` used for metric aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub window_type: WindowType,
}

impl AggregationWindow {
    /// The calendar day containing `at`.
    pub fn daily(at: DateTime<Utc>) -> Self {
        let start = start_of_day(at.date_naive());
        Self {
            start,
            end: start + Duration::days(1) - tick(),
            window_type: WindowType::Daily,
        }
    }

    /// Seven days starting at the calendar day of `at`.
    pub fn weekly(at: DateTime<Utc>) -> Self {
        let start = start_of_day(at.date_naive());
        Self {
            start,
            end: start + Duration::days(7) - tick(),
            window_type: WindowType::Weekly,
        }
    }

    pub fn monthly(year: i32, month: u32) -> Result<Self, DomainError> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::InvalidWindow(format!(
                "month must be between 1 and 12, got {}",
                month
            )));
        }
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| DomainError::InvalidWindow(format!("invalid year {}", year)))?;
        let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        let next = NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .ok_or_else(|| DomainError::InvalidWindow(format!("invalid year {}", next_year)))?;

        let start = start_of_day(first);
        Ok(Self {
            start,
            end: start_of_day(next) - tick(),
            window_type: WindowType::Monthly,
        })
    }

    pub fn custom(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, DomainError> {
        if end <= start {
            return Err(DomainError::InvalidWindow(
                "end must be after start".to_string(),
            ));
        }
        Ok(Self {
            start,
            end,
            window_type: WindowType::Custom,
        })
    }

    /// Inclusive on both bounds.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start + tick()
    }

    /// Month window for the month containing `at`.
    pub fn month_of(at: DateTime<Utc>) -> Self {
        // Year/month from a valid timestamp are always in range
        Self::monthly(at.year(), at.month()).unwrap_or_else(|_| Self::daily(at))
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn daily_covers_the_whole_day() {
        let w = AggregationWindow::daily(at(2024, 3, 10, 15, 30));
        assert_eq!(w.start, at(2024, 3, 10, 0, 0));
        assert_eq!(w.end, at(2024, 3, 11, 0, 0) - tick());
        assert_eq!(w.window_type, WindowType::Daily);
        assert_eq!(w.duration(), Duration::days(1));
    }

    #[test]
    fn contains_is_inclusive() {
        let w = AggregationWindow::daily(at(2024, 3, 10, 0, 0));
        assert!(w.contains(w.start));
        assert!(w.contains(w.end));
        assert!(!w.contains(w.end + tick()));
        assert!(!w.contains(w.start - tick()));
    }

    #[test]
    fn weekly_spans_seven_days() {
        let w = AggregationWindow::weekly(at(2024, 1, 1, 8, 0));
        assert_eq!(w.duration(), Duration::days(7));
        assert!(w.contains(at(2024, 1, 7, 23, 59)));
        assert!(!w.contains(at(2024, 1, 8, 0, 0)));
    }

    #[test]
    fn monthly_handles_december_and_leap_years() {
        let dec = AggregationWindow::monthly(2023, 12).unwrap();
        assert_eq!(dec.start, at(2023, 12, 1, 0, 0));
        assert_eq!(dec.end, at(2024, 1, 1, 0, 0) - tick());

        let feb = AggregationWindow::monthly(2024, 2).unwrap();
        assert_eq!(feb.duration(), Duration::days(29));
    }

    #[test]
    fn monthly_rejects_bad_months() {
        assert!(AggregationWindow::monthly(2024, 0).is_err());
        assert!(AggregationWindow::monthly(2024, 13).is_err());
    }

    #[test]
    fn custom_requires_end_after_start() {
        let s = at(2024, 5, 1, 0, 0);
        assert!(AggregationWindow::custom(s, s).is_err());
        assert!(AggregationWindow::custom(s, s - Duration::hours(1)).is_err());
        let w = AggregationWindow::custom(s, s + Duration::hours(2)).unwrap();
        assert_eq!(w.duration(), Duration::hours(2) + tick());
    }
}
