//! Dimension weight rebalancing.
//!
//! Setting one dimension's weight redistributes the remaining budget
//! (`1 - w`) across the other active dimensions, proportionally to their
//! current weights, or equally when they currently carry no weight at all.

use rust_decimal::Decimal;
use uuid::Uuid;

/// Current state of one dimension as seen by the rebalancer.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightEntry {
    pub id: Uuid,
    pub weight: Decimal,
    pub is_active: bool,
}

/// New weights to write back, keyed by dimension id.
#[derive(Debug, Clone, PartialEq)]
pub struct RebalancePlan {
    pub target_id: Uuid,
    pub updates: Vec<(Uuid, Decimal)>,
}

impl RebalancePlan {
    pub fn weight_of(&self, id: Uuid) -> Option<Decimal> {
        self.updates.iter().find(|(i, _)| *i == id).map(|(_, w)| *w)
    }
}

/// Compute the weights after setting `target_id` to `new_weight`.
///
/// Returns `None` when the target is not in the snapshot. The target itself is
/// always part of the plan; other dimensions only when `auto_rebalance` is set,
/// and only the active ones.
pub fn rebalance(
    snapshot: &[WeightEntry],
    target_id: Uuid,
    new_weight: Decimal,
    auto_rebalance: bool,
) -> Option<RebalancePlan> {
    if !snapshot.iter().any(|d| d.id == target_id) {
        return None;
    }

    let mut updates = vec![(target_id, new_weight)];

    if auto_rebalance {
        let others: Vec<&WeightEntry> = snapshot
            .iter()
            .filter(|d| d.id != target_id && d.is_active)
            .collect();

        if !others.is_empty() {
            let remaining = Decimal::ONE - new_weight;
            let total_other: Decimal = others.iter().map(|d| d.weight).sum();

            if total_other > Decimal::ZERO {
                for d in &others {
                    // Multiply first to keep exact fractions exact
                    updates.push((d.id, d.weight * remaining / total_other));
                }
            } else {
                let equal_share = remaining / Decimal::from(others.len());
                updates.extend(others.iter().map(|d| (d.id, equal_share)));
            }
        }
    }

    Some(RebalancePlan { target_id, updates })
}

/// `true` when `w` is a legal weight.
pub fn is_valid_weight(w: Decimal) -> bool {
    w >= Decimal::ZERO && w <= Decimal::ONE
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(weight: Decimal) -> WeightEntry {
        WeightEntry {
            id: Uuid::new_v4(),
            weight,
            is_active: true,
        }
    }

    fn active_total_after(snapshot: &[WeightEntry], plan: &RebalancePlan) -> Decimal {
        snapshot
            .iter()
            .filter(|d| d.is_active || d.id == plan.target_id)
            .map(|d| plan.weight_of(d.id).unwrap_or(d.weight))
            .sum()
    }

    fn approx(a: Decimal, b: Decimal) -> bool {
        (a - b).abs() < dec!(0.000001)
    }

    #[test]
    fn redistributes_proportionally() {
        let a = entry(dec!(0.4));
        let b = entry(dec!(0.2));
        let c = entry(dec!(0.4));
        let snapshot = vec![a.clone(), b.clone(), c.clone()];

        let plan = rebalance(&snapshot, a.id, dec!(0.7), true).unwrap();

        assert_eq!(plan.weight_of(a.id), Some(dec!(0.7)));
        assert!(approx(plan.weight_of(b.id).unwrap(), dec!(0.1)));
        assert!(approx(plan.weight_of(c.id).unwrap(), dec!(0.2)));
        assert!(approx(active_total_after(&snapshot, &plan), Decimal::ONE));
    }

    #[test]
    fn keeps_others_when_budget_already_matches() {
        let a = entry(dec!(0.4));
        let b = entry(dec!(0.3));
        let c = entry(dec!(0.3));
        let snapshot = vec![a.clone(), b.clone(), c.clone()];

        let plan = rebalance(&snapshot, a.id, dec!(0.4), true).unwrap();

        assert!(approx(plan.weight_of(b.id).unwrap(), dec!(0.3)));
        assert!(approx(plan.weight_of(c.id).unwrap(), dec!(0.3)));
    }

    #[test]
    fn without_auto_rebalance_only_target_changes() {
        let a = entry(dec!(0.5));
        let b = entry(dec!(0.5));
        let snapshot = vec![a.clone(), b.clone()];

        let plan = rebalance(&snapshot, a.id, dec!(0.9), false).unwrap();

        assert_eq!(plan.updates, vec![(a.id, dec!(0.9))]);
        assert_eq!(plan.weight_of(b.id), None);
    }

    #[test]
    fn zero_other_weight_splits_equally() {
        let a = entry(dec!(1.0));
        let b = entry(dec!(0));
        let c = entry(dec!(0));
        let d = entry(dec!(0));
        let snapshot = vec![a.clone(), b.clone(), c.clone(), d.clone()];

        let plan = rebalance(&snapshot, a.id, dec!(0.4), true).unwrap();

        for id in [b.id, c.id, d.id] {
            assert!(approx(plan.weight_of(id).unwrap(), dec!(0.2)));
        }
        assert!(approx(active_total_after(&snapshot, &plan), Decimal::ONE));
    }

    #[test]
    fn inactive_dimensions_are_untouched() {
        let a = entry(dec!(0.5));
        let b = entry(dec!(0.5));
        let mut c = entry(dec!(0.25));
        c.is_active = false;
        let snapshot = vec![a.clone(), b.clone(), c.clone()];

        let plan = rebalance(&snapshot, a.id, dec!(0.25), true).unwrap();

        assert_eq!(plan.weight_of(c.id), None);
        assert!(approx(plan.weight_of(b.id).unwrap(), dec!(0.75)));
    }

    #[test]
    fn single_dimension_has_nothing_to_redistribute() {
        let a = entry(dec!(1.0));
        let plan = rebalance(&[a.clone()], a.id, dec!(0.6), true).unwrap();
        assert_eq!(plan.updates, vec![(a.id, dec!(0.6))]);
    }

    #[test]
    fn unknown_target_yields_none() {
        let snapshot = vec![entry(dec!(0.5)), entry(dec!(0.5))];
        assert!(rebalance(&snapshot, Uuid::new_v4(), dec!(0.3), true).is_none());
    }

    #[test]
    fn totals_stay_normalized_across_many_shapes() {
        let weights = [
            vec![dec!(0.125); 8],
            vec![dec!(0.1), dec!(0.2), dec!(0.3), dec!(0.4)],
            vec![dec!(0.33), dec!(0.33), dec!(0.34)],
            vec![dec!(0.9), dec!(0.05), dec!(0.05)],
        ];
        let targets = [dec!(0), dec!(0.01), dec!(0.333), dec!(0.5), dec!(0.99), dec!(1)];

        for shape in &weights {
            let snapshot: Vec<WeightEntry> = shape.iter().map(|w| entry(*w)).collect();
            for (i, target) in snapshot.iter().enumerate() {
                let w = targets[i % targets.len()];
                let plan = rebalance(&snapshot, target.id, w, true).unwrap();
                let total = active_total_after(&snapshot, &plan);
                assert!(approx(total, Decimal::ONE), "total {} for w {}", total, w);
            }
        }
    }

    #[test]
    fn weight_bounds() {
        assert!(is_valid_weight(dec!(0)));
        assert!(is_valid_weight(dec!(1)));
        assert!(!is_valid_weight(dec!(-0.01)));
        assert!(!is_valid_weight(dec!(1.01)));
    }
}
