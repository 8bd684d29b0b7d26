//! Recurring background jobs.
//!
//! One tokio task per job. A task sleeps until the next slot, runs the job
//! to completion and only then computes the following slot, so a job never
//! overlaps with itself. A failed run is logged and the loop carries on.

pub mod fx_refresh;
pub mod net_worth_snapshot;
pub mod score_recomputation;
pub mod streak_evaluation;
pub mod task_evaluation;

use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveTime, Utc};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::app::AppState;
use crate::config::JobsConfig;
use crate::services::ServiceResult;

const TASK_EVALUATION_PERIOD: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum JobKind {
    /// Break or penalize streaks whose last success is too old
    Streaks,
    /// Pull fresh exchange rates from the provider
    Fx,
    /// Store today's dimension and life scores for every active user
    Scores,
    /// Snapshot every active user's net worth for the day
    NetWorth,
    /// Complete tasks whose linked metric met its target
    Tasks,
}

impl JobKind {
    pub const ALL: [JobKind; 5] = [
        JobKind::Streaks,
        JobKind::Fx,
        JobKind::Scores,
        JobKind::NetWorth,
        JobKind::Tasks,
    ];

    pub fn name(self) -> &'static str {
        match self {
            JobKind::Streaks => "streak_evaluation",
            JobKind::Fx => "fx_rate_refresh",
            JobKind::Scores => "score_recomputation",
            JobKind::NetWorth => "net_worth_snapshot",
            JobKind::Tasks => "task_evaluation",
        }
    }

    pub fn schedule(self, config: &JobsConfig) -> Schedule {
        match self {
            JobKind::Streaks => Schedule::daily_at(0, 0),
            JobKind::Fx => Schedule::Every(Duration::from_secs(config.fx_refresh_interval_secs.max(1))),
            JobKind::Scores => Schedule::daily_at(3, 0),
            JobKind::NetWorth => Schedule::daily_at(23, 59),
            JobKind::Tasks => Schedule::Every(TASK_EVALUATION_PERIOD),
        }
    }

    /// Run the job once and return its summary as JSON.
    pub async fn run_once(self, state: &AppState) -> ServiceResult<Value> {
        let summary = match self {
            JobKind::Streaks => serde_json::to_value(streak_evaluation::run_once(state).await?),
            JobKind::Fx => serde_json::to_value(fx_refresh::run_once(state).await?),
            JobKind::Scores => serde_json::to_value(score_recomputation::run_once(state).await?),
            JobKind::NetWorth => serde_json::to_value(net_worth_snapshot::run_once(state).await?),
            JobKind::Tasks => serde_json::to_value(task_evaluation::run_once(state).await?),
        };
        Ok(summary.unwrap_or(Value::Null))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Every day at this UTC wall-clock time.
    DailyAt(NaiveTime),
    /// Fixed pause between the end of one run and the start of the next.
    Every(Duration),
}

impl Schedule {
    pub fn daily_at(hour: u32, minute: u32) -> Self {
        Schedule::DailyAt(NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN))
    }

    /// How long to wait from `now` until the next run.
    pub fn delay_from(&self, now: DateTime<Utc>) -> Duration {
        match self {
            Schedule::Every(period) => *period,
            Schedule::DailyAt(at) => {
                let today = now.date_naive().and_time(*at).and_utc();
                let next = if today > now {
                    today
                } else {
                    today + chrono::Duration::days(1)
                };
                (next - now).to_std().unwrap_or(Duration::ZERO)
            }
        }
    }
}

/// Start every job on its schedule. Does nothing when jobs are disabled.
pub fn spawn_all(state: AppState) -> Vec<JoinHandle<()>> {
    if !state.config.jobs.enabled {
        info!("Background jobs disabled");
        return Vec::new();
    }
    JobKind::ALL
        .into_iter()
        .map(|kind| {
            let schedule = kind.schedule(&state.config.jobs);
            info!("Scheduling {} ({:?})", kind.name(), schedule);
            tokio::spawn(run_on_schedule(state.clone(), kind, schedule))
        })
        .collect()
}

async fn run_on_schedule(state: AppState, kind: JobKind, schedule: Schedule) {
    loop {
        let delay = schedule.delay_from(Utc::now());
        debug!("Next {} run in {}s", kind.name(), delay.as_secs());
        tokio::time::sleep(delay).await;

        let started = Instant::now();
        match kind.run_once(&state).await {
            Ok(summary) => info!("Job {} finished in {:?}: {}", kind.name(), started.elapsed(), summary),
            Err(e) => error!("Job {} failed after {:?}: {}", kind.name(), started.elapsed(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn daily_slot_is_later_today_or_tomorrow() {
        let schedule = Schedule::daily_at(1, 0);

        let before = Utc.with_ymd_and_hms(2024, 6, 1, 0, 30, 0).unwrap();
        assert_eq!(schedule.delay_from(before), Duration::from_secs(30 * 60));

        let after = Utc.with_ymd_and_hms(2024, 6, 1, 1, 0, 0).unwrap();
        assert_eq!(schedule.delay_from(after), Duration::from_secs(24 * 3600));

        let late = Utc.with_ymd_and_hms(2024, 6, 1, 23, 0, 0).unwrap();
        assert_eq!(schedule.delay_from(late), Duration::from_secs(2 * 3600));
    }

    #[test]
    fn late_evening_slot() {
        let schedule = Schedule::daily_at(23, 59);
        let evening = Utc.with_ymd_and_hms(2024, 6, 1, 23, 0, 0).unwrap();
        assert_eq!(schedule.delay_from(evening), Duration::from_secs(59 * 60));
        let just_after = Utc.with_ymd_and_hms(2024, 6, 1, 23, 59, 30).unwrap();
        assert_eq!(schedule.delay_from(just_after), Duration::from_secs(24 * 3600 - 30));
    }

    #[test]
    fn job_names_are_unique() {
        let mut names: Vec<&str> = JobKind::ALL.iter().map(|k| k.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), JobKind::ALL.len());
    }

    #[test]
    fn job_schedules() {
        let config = JobsConfig {
            enabled: true,
            fx_refresh_interval_secs: 3600,
        };
        assert_eq!(JobKind::Streaks.schedule(&config), Schedule::daily_at(0, 0));
        assert_eq!(JobKind::Scores.schedule(&config), Schedule::daily_at(3, 0));
        assert_eq!(JobKind::Fx.schedule(&config), Schedule::Every(Duration::from_secs(3600)));
        assert_eq!(JobKind::NetWorth.schedule(&config), Schedule::daily_at(23, 59));
        assert_eq!(JobKind::Tasks.schedule(&config), Schedule::Every(Duration::from_secs(3600)));

        let zero = JobsConfig {
            enabled: true,
            fx_refresh_interval_secs: 0,
        };
        assert_eq!(JobKind::Fx.schedule(&zero), Schedule::Every(Duration::from_secs(1)));
    }
}
