//! Dimension and life score computation.
//!
//! The database gathers raw inputs (habit completions, latest metric readings,
//! streak lengths, previous score records); everything below turns them into
//! the numbers returned by `GET /api/scores`.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

pub const LIFE_SCORE_CODE: &str = "life_score";
pub const MIN_SCORE: i32 = 0;
pub const MAX_SCORE: i32 = 100;

const NEUTRAL_SCORE: i64 = 50;
const MAX_STREAK_BONUS: i64 = 10;

pub fn dimension_score_code(dimension_code: &str) -> String {
    format!("{}_score", dimension_code)
}

/// Latest reading of one metric plus its definition bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricReading {
    pub value: Decimal,
    pub min_value: Option<Decimal>,
    pub max_value: Option<Decimal>,
}

/// Raw facts about one dimension for one user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DimensionScoreInputs {
    pub active_habits: usize,
    pub habits_completed_last_7_days: usize,
    pub metric_readings: Vec<MetricReading>,
    pub active_streak_days: i64,
}

pub fn habit_completion_score(active_habits: usize, completed: usize) -> Option<Decimal> {
    if active_habits == 0 {
        return None;
    }
    Some(Decimal::from(completed) / Decimal::from(active_habits) * Decimal::ONE_HUNDRED)
}

/// Average of normalized readings. Bounded metrics map `[min, max]` onto
/// `[0, 100]` (clamped); unbounded ones count as neutral 50.
pub fn metric_health_score(readings: &[MetricReading]) -> Option<Decimal> {
    let scores: Vec<Decimal> = readings
        .iter()
        .filter_map(|r| match (r.min_value, r.max_value) {
            (Some(min), Some(max)) => {
                let range = max - min;
                if range > Decimal::ZERO {
                    let normalized = (r.value - min) / range * Decimal::ONE_HUNDRED;
                    Some(normalized.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED))
                } else {
                    None
                }
            }
            _ => Some(Decimal::from(NEUTRAL_SCORE)),
        })
        .collect();

    average(&scores)
}

pub fn streak_bonus(active_streak_days: i64) -> Decimal {
    Decimal::from(active_streak_days.clamp(0, MAX_STREAK_BONUS))
}

/// Score in `[0, 100]`, one decimal place.
pub fn dimension_score(inputs: &DimensionScoreInputs) -> Decimal {
    let components: Vec<Decimal> = [
        habit_completion_score(inputs.active_habits, inputs.habits_completed_last_7_days),
        metric_health_score(&inputs.metric_readings),
    ]
    .into_iter()
    .flatten()
    .collect();

    let base = average(&components).unwrap_or_else(|| Decimal::from(NEUTRAL_SCORE));
    let score = (base + streak_bonus(inputs.active_streak_days)).min(Decimal::ONE_HUNDRED);
    score.round_dp(1)
}

/// Weighted average of `(score, weight)` pairs, unrounded. Zero when the
/// weights sum to zero.
pub fn weighted_life_score(entries: &[(Decimal, Decimal)]) -> Decimal {
    let total_weight: Decimal = entries.iter().map(|(_, w)| *w).sum();
    if total_weight.is_zero() {
        return Decimal::ZERO;
    }
    let weighted: Decimal = entries.iter().map(|(s, w)| *s * *w).sum();
    weighted / total_weight
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreChange {
    pub change: Option<Decimal>,
    pub change_percent: Option<Decimal>,
}

pub fn score_change(current: Decimal, previous: Option<Decimal>) -> ScoreChange {
    match previous {
        None => ScoreChange { change: None, change_percent: None },
        Some(prev) => {
            let change = current - prev;
            let change_percent = if prev > Decimal::ZERO {
                Some(change / prev * Decimal::ONE_HUNDRED)
            } else {
                None
            };
            ScoreChange { change: Some(change), change_percent }
        }
    }
}

/// One row of the scores response.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreItem {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub dimension_id: Option<Uuid>,
    pub dimension_code: Option<String>,
    pub current_value: Decimal,
    pub previous_value: Option<Decimal>,
    pub change: Option<Decimal>,
    pub change_percent: Option<Decimal>,
    pub period_type: String,
    pub min_score: i32,
    pub max_score: i32,
}

/// A computed dimension score plus what is needed to present it.
#[derive(Debug, Clone)]
pub struct DimensionScore {
    pub dimension_id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub weight: Decimal,
    pub score: Decimal,
    pub previous: Option<Decimal>,
}

/// Build the full response: life score first, then dimensions in the given order.
pub fn assemble_scores(dimensions: &[DimensionScore], previous_life_score: Option<Decimal>) -> Vec<ScoreItem> {
    let pairs: Vec<(Decimal, Decimal)> = dimensions.iter().map(|d| (d.score, d.weight)).collect();
    let life = weighted_life_score(&pairs);
    let life_change = score_change(life, previous_life_score);

    let mut items = Vec::with_capacity(dimensions.len() + 1);
    items.push(ScoreItem {
        id: Uuid::nil(),
        code: LIFE_SCORE_CODE.to_string(),
        name: "Life Score".to_string(),
        description: Some("Weighted aggregate across all dimensions".to_string()),
        dimension_id: None,
        dimension_code: None,
        current_value: life.round_dp(1),
        previous_value: previous_life_score,
        change: life_change.change.map(|c| c.round_dp(1)),
        change_percent: life_change.change_percent.map(|c| c.round_dp(1)),
        period_type: "daily".to_string(),
        min_score: MIN_SCORE,
        max_score: MAX_SCORE,
    });

    for d in dimensions {
        let change = score_change(d.score, d.previous);
        items.push(ScoreItem {
            id: d.dimension_id,
            code: dimension_score_code(&d.code),
            name: format!("{} Score", d.name),
            description: d.description.clone(),
            dimension_id: Some(d.dimension_id),
            dimension_code: Some(d.code.clone()),
            current_value: d.score,
            previous_value: d.previous,
            change: change.change,
            change_percent: change.change_percent,
            period_type: "daily".to_string(),
            min_score: MIN_SCORE,
            max_score: MAX_SCORE,
        });
    }

    items
}

fn average(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let sum: Decimal = values.iter().sum();
    Some(sum / Decimal::from(values.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn dim(code: &str, weight: Decimal, score: Decimal, previous: Option<Decimal>) -> DimensionScore {
        DimensionScore {
            dimension_id: Uuid::new_v4(),
            code: code.to_string(),
            name: code.to_uppercase(),
            description: None,
            weight,
            score,
            previous,
        }
    }

    #[test]
    fn life_score_is_weighted_average() {
        let dims = vec![
            dim("health", dec!(0.5), dec!(80), None),
            dim("wealth", dec!(0.25), dec!(40), None),
            dim("love", dec!(0.25), dec!(60), None),
        ];
        let items = assemble_scores(&dims, None);
        assert_eq!(items[0].code, LIFE_SCORE_CODE);
        assert_eq!(items[0].current_value, dec!(65.0));
        assert_eq!(items.len(), 4);
        assert_eq!(items[1].code, "health_score");
        assert_eq!(items[1].name, "HEALTH Score");
    }

    #[test]
    fn life_score_is_zero_without_weight() {
        let dims = vec![dim("health", dec!(0), dec!(80), None)];
        assert_eq!(assemble_scores(&dims, None)[0].current_value, Decimal::ZERO);
        assert_eq!(assemble_scores(&[], None)[0].current_value, Decimal::ZERO);
    }

    #[test]
    fn life_score_rounds_to_one_decimal() {
        let dims = vec![
            dim("a", dec!(1), dec!(70), None),
            dim("b", dec!(2), dec!(71), None),
        ];
        // 212 / 3 = 70.666...
        assert_eq!(assemble_scores(&dims, None)[0].current_value, dec!(70.7));
    }

    #[test]
    fn change_is_null_without_previous() {
        let c = score_change(dec!(50), None);
        assert_eq!(c.change, None);
        assert_eq!(c.change_percent, None);
    }

    #[test]
    fn change_percent_is_null_for_zero_previous() {
        let c = score_change(dec!(50), Some(Decimal::ZERO));
        assert_eq!(c.change, Some(dec!(50)));
        assert_eq!(c.change_percent, None);
    }

    #[test]
    fn change_against_previous() {
        let c = score_change(dec!(60), Some(dec!(50)));
        assert_eq!(c.change, Some(dec!(10)));
        assert_eq!(c.change_percent, Some(dec!(20)));

        let dims = vec![dim("health", dec!(1), dec!(60), Some(dec!(50)))];
        let items = assemble_scores(&dims, Some(dec!(45)));
        assert_eq!(items[0].change, Some(dec!(15.0)));
        assert_eq!(items[0].change_percent, Some(dec!(33.3)));
        assert_eq!(items[1].change, Some(dec!(10)));
    }

    #[test]
    fn dimension_score_defaults_to_neutral() {
        assert_eq!(dimension_score(&DimensionScoreInputs::default()), dec!(50.0));
    }

    #[test]
    fn dimension_score_averages_components_and_adds_bonus() {
        let inputs = DimensionScoreInputs {
            active_habits: 4,
            habits_completed_last_7_days: 3,
            metric_readings: vec![MetricReading {
                value: dec!(7),
                min_value: Some(dec!(0)),
                max_value: Some(dec!(10)),
            }],
            active_streak_days: 3,
        };
        // (75 + 70) / 2 + 3
        assert_eq!(dimension_score(&inputs), dec!(75.5));
    }

    #[test]
    fn dimension_score_is_capped() {
        let inputs = DimensionScoreInputs {
            active_habits: 1,
            habits_completed_last_7_days: 1,
            metric_readings: vec![],
            active_streak_days: 40,
        };
        assert_eq!(dimension_score(&inputs), dec!(100));
    }

    #[test]
    fn metric_health_clamps_and_skips_degenerate_bounds() {
        let readings = vec![
            MetricReading { value: dec!(150), min_value: Some(dec!(0)), max_value: Some(dec!(100)) },
            MetricReading { value: dec!(5), min_value: None, max_value: Some(dec!(10)) },
            MetricReading { value: dec!(5), min_value: Some(dec!(10)), max_value: Some(dec!(10)) },
        ];
        // 100 and 50; the zero-range reading is ignored
        assert_eq!(metric_health_score(&readings), Some(dec!(75)));
        assert_eq!(metric_health_score(&[]), None);
    }

    #[test]
    fn streak_bonus_is_bounded() {
        assert_eq!(streak_bonus(0), Decimal::ZERO);
        assert_eq!(streak_bonus(4), dec!(4));
        assert_eq!(streak_bonus(25), dec!(10));
    }
}
