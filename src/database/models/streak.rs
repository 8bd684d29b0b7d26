use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::streak::StreakCounters;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Streak {
    pub id: Uuid,
    pub user_id: Uuid,
    pub task_id: Option<Uuid>,
    pub metric_code: Option<String>,
    pub current_streak_length: i32,
    pub longest_streak_length: i32,
    pub last_success_date: Option<NaiveDate>,
    pub streak_start_date: Option<NaiveDate>,
    pub miss_count: i32,
    pub max_allowed_misses: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Streak {
    pub fn counters(&self) -> StreakCounters {
        StreakCounters {
            current_streak_length: self.current_streak_length,
            longest_streak_length: self.longest_streak_length,
            last_success_date: self.last_success_date,
            streak_start_date: self.streak_start_date,
            miss_count: self.miss_count,
            max_allowed_misses: self.max_allowed_misses,
        }
    }

    pub fn apply(&mut self, counters: &StreakCounters) {
        self.current_streak_length = counters.current_streak_length;
        self.longest_streak_length = counters.longest_streak_length;
        self.last_success_date = counters.last_success_date;
        self.streak_start_date = counters.streak_start_date;
        self.miss_count = counters.miss_count;
        self.max_allowed_misses = counters.max_allowed_misses;
    }
}

/// Streak row joined with the title of its task.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StreakWithTask {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub streak: Streak,
    pub task_title: Option<String>,
}
