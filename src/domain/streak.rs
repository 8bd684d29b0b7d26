//! Streak counters and the rules that move them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The mutable counters of a streak row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreakCounters {
    pub current_streak_length: i32,
    pub longest_streak_length: i32,
    pub last_success_date: Option<NaiveDate>,
    pub streak_start_date: Option<NaiveDate>,
    pub miss_count: i32,
    pub max_allowed_misses: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissPenalty {
    pub should_reset: bool,
    pub penalty_days: i32,
}

impl MissPenalty {
    pub const NONE: MissPenalty = MissPenalty { should_reset: false, penalty_days: 0 };
}

/// What the daily evaluation did to a streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenaltyOutcome {
    Unchanged,
    Broken,
    Penalized(i32),
}

impl StreakCounters {
    pub fn with_max_allowed_misses(max_allowed_misses: i32) -> Self {
        Self {
            max_allowed_misses,
            ..Self::default()
        }
    }

    /// Record a success on `date`.
    pub fn record_success(&mut self, date: NaiveDate) {
        let Some(last) = self.last_success_date else {
            self.current_streak_length = 1;
            self.longest_streak_length = 1;
            self.last_success_date = Some(date);
            self.streak_start_date = Some(date);
            self.miss_count = 0;
            return;
        };

        let days_since = (date - last).num_days();
        if days_since <= 0 {
            // Same day (or an out-of-order backfill): nothing to extend
            return;
        }

        if days_since == 1 {
            self.current_streak_length += 1;
            self.miss_count = 0;
        } else if days_since <= i64::from(self.max_allowed_misses) + 1 {
            self.miss_count += (days_since - 1) as i32;
            self.current_streak_length += 1;
        } else {
            self.current_streak_length = 1;
            self.streak_start_date = Some(date);
            self.miss_count = 0;
        }

        self.last_success_date = Some(date);
        self.longest_streak_length = self.longest_streak_length.max(self.current_streak_length);
    }

    /// Penalty owed for the days missed since the last success.
    pub fn miss_penalty(&self, today: NaiveDate) -> MissPenalty {
        let Some(last) = self.last_success_date else {
            return MissPenalty::NONE;
        };

        let days_since = (today - last).num_days();
        let grace = i64::from(self.max_allowed_misses);
        if days_since <= grace + 1 {
            return MissPenalty::NONE;
        }

        let consecutive_misses = days_since - 1;
        let penalty_days = ((consecutive_misses - grace).max(0) * 2).min(i64::from(i32::MAX)) as i32;

        MissPenalty {
            should_reset: penalty_days >= self.current_streak_length,
            penalty_days,
        }
    }

    /// Apply the daily penalty in place.
    pub fn apply_miss_penalty(&mut self, today: NaiveDate) -> PenaltyOutcome {
        let penalty = self.miss_penalty(today);

        if penalty.should_reset {
            self.current_streak_length = 0;
            self.streak_start_date = None;
            self.miss_count = 0;
            PenaltyOutcome::Broken
        } else if penalty.penalty_days > 0 {
            self.current_streak_length = (self.current_streak_length - penalty.penalty_days).max(0);
            self.miss_count += 1;
            PenaltyOutcome::Penalized(penalty.penalty_days)
        } else {
            PenaltyOutcome::Unchanged
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakSortField {
    CurrentStreakLength,
    LongestStreakLength,
    LastSuccessDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakSort {
    pub field: StreakSortField,
    pub descending: bool,
}

impl Default for StreakSort {
    fn default() -> Self {
        Self {
            field: StreakSortField::CurrentStreakLength,
            descending: true,
        }
    }
}

impl StreakSort {
    /// Parse `field` or `-field`. Unknown fields fall back to the default order.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::default();
        };
        let (descending, name) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let field = match name {
            "currentStreakLength" => StreakSortField::CurrentStreakLength,
            "longestStreakLength" => StreakSortField::LongestStreakLength,
            "lastSuccessDate" => StreakSortField::LastSuccessDate,
            _ => return Self::default(),
        };
        Self { field, descending }
    }

    pub fn column(&self) -> &'static str {
        match self.field {
            StreakSortField::CurrentStreakLength => "s.current_streak_length",
            StreakSortField::LongestStreakLength => "s.longest_streak_length",
            StreakSortField::LastSuccessDate => "s.last_success_date",
        }
    }

    /// ORDER BY clause built only from the fixed column names above.
    pub fn order_by(&self) -> String {
        let direction = if self.descending { "DESC NULLS LAST" } else { "ASC NULLS LAST" };
        format!("{} {}, s.id ASC", self.column(), direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn first_success_starts_streak() {
        let mut s = StreakCounters::with_max_allowed_misses(1);
        s.record_success(day(1));
        assert_eq!(s.current_streak_length, 1);
        assert_eq!(s.longest_streak_length, 1);
        assert_eq!(s.streak_start_date, Some(day(1)));
        assert_eq!(s.last_success_date, Some(day(1)));
    }

    #[test]
    fn same_day_is_noop() {
        let mut s = StreakCounters::with_max_allowed_misses(1);
        s.record_success(day(1));
        let before = s.clone();
        s.record_success(day(1));
        assert_eq!(s, before);
    }

    #[test]
    fn consecutive_days_extend_and_reset_misses() {
        let mut s = StreakCounters::with_max_allowed_misses(1);
        s.record_success(day(1));
        s.miss_count = 3;
        s.record_success(day(2));
        assert_eq!(s.current_streak_length, 2);
        assert_eq!(s.longest_streak_length, 2);
        assert_eq!(s.miss_count, 0);
    }

    #[test]
    fn gap_within_grace_counts_misses() {
        let mut s = StreakCounters::with_max_allowed_misses(2);
        s.record_success(day(1));
        s.record_success(day(4));
        assert_eq!(s.current_streak_length, 2);
        assert_eq!(s.miss_count, 2);
        assert_eq!(s.streak_start_date, Some(day(1)));
    }

    #[test]
    fn gap_beyond_grace_resets() {
        let mut s = StreakCounters::with_max_allowed_misses(1);
        for d in 1..=5 {
            s.record_success(day(d));
        }
        s.record_success(day(9));
        assert_eq!(s.current_streak_length, 1);
        assert_eq!(s.longest_streak_length, 5);
        assert_eq!(s.streak_start_date, Some(day(9)));
        assert_eq!(s.miss_count, 0);
    }

    #[test]
    fn no_penalty_without_success_or_within_grace() {
        let s = StreakCounters::with_max_allowed_misses(1);
        assert_eq!(s.miss_penalty(day(20)), MissPenalty::NONE);

        let mut s = StreakCounters::with_max_allowed_misses(1);
        s.record_success(day(1));
        assert_eq!(s.miss_penalty(day(3)), MissPenalty::NONE);
    }

    #[test]
    fn penalty_grows_two_days_per_miss() {
        let mut s = StreakCounters::with_max_allowed_misses(1);
        for d in 1..=10 {
            s.record_success(day(d));
        }
        // 3 days since, 2 consecutive misses, 1 beyond grace
        let p = s.miss_penalty(day(13));
        assert_eq!(p, MissPenalty { should_reset: false, penalty_days: 2 });

        assert_eq!(s.apply_miss_penalty(day(13)), PenaltyOutcome::Penalized(2));
        assert_eq!(s.current_streak_length, 8);
        assert_eq!(s.miss_count, 1);
    }

    #[test]
    fn penalty_at_or_above_current_resets() {
        let mut s = StreakCounters::with_max_allowed_misses(0);
        s.record_success(day(1));
        s.record_success(day(2));
        // 3 days since, 2 misses beyond zero grace, penalty 4 >= 2
        assert!(s.miss_penalty(day(5)).should_reset);
        assert_eq!(s.apply_miss_penalty(day(5)), PenaltyOutcome::Broken);
        assert_eq!(s.current_streak_length, 0);
        assert_eq!(s.streak_start_date, None);
        assert_eq!(s.miss_count, 0);
        assert_eq!(s.longest_streak_length, 2);
    }

    #[test]
    fn sort_parsing() {
        assert_eq!(StreakSort::parse(None), StreakSort::default());
        assert_eq!(
            StreakSort::parse(Some("longestStreakLength")),
            StreakSort { field: StreakSortField::LongestStreakLength, descending: false }
        );
        assert_eq!(
            StreakSort::parse(Some("-lastSuccessDate")),
            StreakSort { field: StreakSortField::LastSuccessDate, descending: true }
        );
        assert_eq!(StreakSort::parse(Some("bogus")), StreakSort::default());
        assert!(StreakSort::parse(Some("-currentStreakLength")).order_by().starts_with("s.current_streak_length DESC"));
    }
}
