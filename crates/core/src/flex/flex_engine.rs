//! Redistribution of a global flex factor across monthly requirements.
//!
//! Protected goals keep their amount and skipped goals drop to zero. The
//! flexible goals share `factor × Σ(flexible requirements)` according to the
//! chosen strategy.

use std::cmp::Ordering;
use std::str::FromStr;

use log::warn;
use rust_decimal::Decimal;

use super::flex_model::{
    AdjustedRequirement, FlexAdjustmentRequest, FlexAdjustmentResult, FlexState,
    RedistributionStrategy,
};
use crate::constants::{MAX_FLEX_FACTOR, MIN_FLEX_FACTOR};
use crate::requirements::MonthlyRequirement;

/// Clamps `factor` into the supported `[0, 2]` range.
pub fn clamp_factor(factor: Decimal) -> Decimal {
    let min = Decimal::from_str(MIN_FLEX_FACTOR).unwrap_or(Decimal::ZERO);
    let max = Decimal::from_str(MAX_FLEX_FACTOR).unwrap_or(Decimal::TWO);
    if factor < min || factor > max {
        warn!("Flex factor {} outside [{}, {}], clamping", factor, min, max);
    }
    factor.clamp(min, max)
}

/// Applies the flex adjustment described by `request` to `requirements`.
///
/// The output keeps the input order.
pub fn apply_flex_adjustment(
    requirements: &[MonthlyRequirement],
    request: &FlexAdjustmentRequest,
) -> FlexAdjustmentResult {
    let factor = clamp_factor(request.factor);
    let states: Vec<FlexState> = requirements
        .iter()
        .map(|r| request.flex_state_of(&r.goal_id))
        .collect();

    let flexible: Vec<usize> = states
        .iter()
        .enumerate()
        .filter(|(_, s)| **s == FlexState::Flexible)
        .map(|(i, _)| i)
        .collect();

    let flexible_original_total: Decimal = flexible
        .iter()
        .map(|&i| requirements[i].required_monthly)
        .sum();
    let budget = factor * flexible_original_total;

    let mut amounts: Vec<Decimal> = requirements
        .iter()
        .zip(&states)
        .map(|(r, state)| match state {
            FlexState::Skipped => Decimal::ZERO,
            FlexState::Protected | FlexState::Flexible => r.required_monthly,
        })
        .collect();

    if !flexible.is_empty() && factor != Decimal::ONE {
        let flexible_amounts = if flexible_original_total.is_zero() {
            vec![Decimal::ZERO; flexible.len()]
        } else if request.strategy == RedistributionStrategy::Balanced {
            scale_balanced(requirements, &flexible, factor, budget)
        } else if factor < Decimal::ONE {
            let order = priority_order(requirements, &flexible, request.strategy);
            fill_in_order(requirements, &flexible, &order, budget)
        } else {
            top_up(
                requirements,
                &flexible,
                request.strategy,
                budget - flexible_original_total,
            )
        };

        for (slot, amount) in flexible.iter().zip(flexible_amounts) {
            amounts[*slot] = amount;
        }
    }

    let adjustments: Vec<AdjustedRequirement> = requirements
        .iter()
        .zip(states.iter().zip(amounts))
        .map(|(r, (state, adjusted))| AdjustedRequirement {
            goal_id: r.goal_id.clone(),
            goal_name: r.goal_name.clone(),
            currency: r.currency.clone(),
            deadline: r.deadline,
            status: r.status,
            flex_state: *state,
            original_amount: r.required_monthly,
            adjusted_amount: adjusted,
            delta: adjusted - r.required_monthly,
        })
        .collect();

    let flexible_adjusted_total = adjustments
        .iter()
        .filter(|a| a.flex_state == FlexState::Flexible)
        .map(|a| a.adjusted_amount)
        .sum();
    let total_original = adjustments.iter().map(|a| a.original_amount).sum();
    let total_adjusted = adjustments.iter().map(|a| a.adjusted_amount).sum();

    FlexAdjustmentResult {
        factor,
        strategy: request.strategy,
        adjustments,
        flexible_original_total,
        flexible_adjusted_total,
        total_original,
        total_adjusted,
    }
}

/// Same ratio for everyone. The last goal absorbs decimal rounding so the
/// total matches the budget exactly.
fn scale_balanced(
    requirements: &[MonthlyRequirement],
    flexible: &[usize],
    factor: Decimal,
    budget: Decimal,
) -> Vec<Decimal> {
    let mut amounts: Vec<Decimal> = flexible
        .iter()
        .map(|&i| requirements[i].required_monthly * factor)
        .collect();
    absorb_rounding(&mut amounts, budget);
    amounts
}

/// Funds goals fully in `order` until the budget runs out; the shortfall
/// lands on the last-funded goals.
fn fill_in_order(
    requirements: &[MonthlyRequirement],
    flexible: &[usize],
    order: &[usize],
    budget: Decimal,
) -> Vec<Decimal> {
    let mut amounts = vec![Decimal::ZERO; flexible.len()];
    let mut left = budget;
    for &pos in order {
        if left <= Decimal::ZERO {
            break;
        }
        let wanted = requirements[flexible[pos]].required_monthly;
        let granted = wanted.min(left);
        amounts[pos] = granted;
        left -= granted;
    }
    amounts
}

/// Every flexible goal keeps its requirement; the surplus goes first to the
/// least-funded goals (strategy order breaks ties), each capped at what it
/// still lacks. Surplus left after all caps is spread proportionally.
fn top_up(
    requirements: &[MonthlyRequirement],
    flexible: &[usize],
    strategy: RedistributionStrategy,
    surplus: Decimal,
) -> Vec<Decimal> {
    let mut amounts: Vec<Decimal> = flexible
        .iter()
        .map(|&i| requirements[i].required_monthly)
        .collect();

    let strategy_rank = priority_order(requirements, flexible, strategy);
    let mut order = strategy_rank.clone();
    order.sort_by(|&a, &b| {
        let ra = &requirements[flexible[a]];
        let rb = &requirements[flexible[b]];
        ra.progress.cmp(&rb.progress).then_with(|| {
            let pa = strategy_rank.iter().position(|&p| p == a);
            let pb = strategy_rank.iter().position(|&p| p == b);
            pa.cmp(&pb)
        })
    });

    let mut left = surplus;
    for &pos in &order {
        if left <= Decimal::ZERO {
            break;
        }
        let requirement = &requirements[flexible[pos]];
        let capacity = (requirement.remaining_amount - requirement.required_monthly).max(Decimal::ZERO);
        let granted = capacity.min(left);
        amounts[pos] += granted;
        left -= granted;
    }

    if left > Decimal::ZERO {
        let base_total: Decimal = flexible
            .iter()
            .map(|&i| requirements[i].required_monthly)
            .sum();
        let target_total: Decimal = amounts.iter().copied().sum::<Decimal>() + left;
        for (pos, &i) in flexible.iter().enumerate() {
            amounts[pos] += left * requirements[i].required_monthly / base_total;
        }
        absorb_rounding(&mut amounts, target_total);
    }
    amounts
}

/// Positions into `flexible`, highest priority first.
fn priority_order(
    requirements: &[MonthlyRequirement],
    flexible: &[usize],
    strategy: RedistributionStrategy,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..flexible.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = &requirements[flexible[a]];
        let rb = &requirements[flexible[b]];
        let primary = match strategy {
            RedistributionStrategy::Balanced => Ordering::Equal,
            RedistributionStrategy::UrgentFirst => ra.deadline.cmp(&rb.deadline),
            RedistributionStrategy::LargestFirst => rb.required_monthly.cmp(&ra.required_monthly),
            RedistributionStrategy::MinimizeRisk => ra
                .status
                .severity()
                .cmp(&rb.status.severity())
                .then_with(|| ra.deadline.cmp(&rb.deadline)),
        };
        primary.then_with(|| ra.goal_id.cmp(&rb.goal_id))
    });
    order
}

fn absorb_rounding(amounts: &mut [Decimal], expected_total: Decimal) {
    let actual: Decimal = amounts.iter().copied().sum();
    let drift = expected_total - actual;
    if drift.is_zero() {
        return;
    }
    if let Some(last) = amounts.iter_mut().rev().find(|a| **a + drift >= Decimal::ZERO) {
        *last += drift;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirements::RequirementStatus;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn req(id: &str, amount: Decimal, deadline_day: u32) -> MonthlyRequirement {
        MonthlyRequirement {
            goal_id: id.to_string(),
            goal_name: id.to_uppercase(),
            currency: "USD".to_string(),
            deadline: NaiveDate::from_ymd_opt(2025, 1, deadline_day).unwrap(),
            target_amount: amount * dec!(10),
            current_total: Decimal::ZERO,
            remaining_amount: amount * dec!(10),
            months_remaining: 10,
            required_monthly: amount,
            progress: Decimal::ZERO,
            status: RequirementStatus::OnTrack,
        }
    }

    fn request(factor: Decimal, strategy: RedistributionStrategy) -> FlexAdjustmentRequest {
        FlexAdjustmentRequest::new(factor, strategy)
    }

    fn adjusted(result: &FlexAdjustmentResult, id: &str) -> Decimal {
        result.adjustment_for(id).unwrap().adjusted_amount
    }

    #[test]
    fn test_identity_factor_changes_nothing() {
        let reqs = vec![req("a", dec!(100), 1), req("b", dec!(250.5), 2)];
        let result = apply_flex_adjustment(&reqs, &request(Decimal::ONE, RedistributionStrategy::UrgentFirst));
        assert_eq!(adjusted(&result, "a"), dec!(100));
        assert_eq!(adjusted(&result, "b"), dec!(250.5));
        assert!(result.adjustments.iter().all(|a| a.delta.is_zero()));
    }

    #[test]
    fn test_balanced_half_with_protected_goal() {
        let reqs = vec![
            req("a", dec!(1000), 1),
            req("b", dec!(800), 2),
            req("c", dec!(600), 3),
        ];
        let mut req_half = request(dec!(0.5), RedistributionStrategy::Balanced);
        req_half.protected_ids.insert("c".to_string());

        let result = apply_flex_adjustment(&reqs, &req_half);
        assert_eq!(adjusted(&result, "a"), dec!(500));
        assert_eq!(adjusted(&result, "b"), dec!(400));
        assert_eq!(adjusted(&result, "c"), dec!(600));
        assert_eq!(result.total_original, dec!(2400));
        assert_eq!(result.total_adjusted, dec!(1500));
        assert_eq!(result.adjustment_for("a").unwrap().delta, dec!(-500));
    }

    #[test]
    fn test_skipped_goal_is_zero_and_excluded_from_budget() {
        let reqs = vec![req("a", dec!(100), 1), req("b", dec!(300), 2)];
        let mut r = request(dec!(0.5), RedistributionStrategy::Balanced);
        r.skipped_ids.insert("b".to_string());

        let result = apply_flex_adjustment(&reqs, &r);
        assert_eq!(adjusted(&result, "b"), Decimal::ZERO);
        assert_eq!(adjusted(&result, "a"), dec!(50));
        assert_eq!(result.flexible_original_total, dec!(100));
    }

    #[test]
    fn test_urgent_first_funds_nearest_deadline_fully() {
        let reqs = vec![
            req("late", dec!(400), 20),
            req("soon", dec!(400), 5),
            req("mid", dec!(200), 10),
        ];
        // budget = 0.6 * 1000 = 600 -> soon 400, mid 200, late 0
        let result = apply_flex_adjustment(&reqs, &request(dec!(0.6), RedistributionStrategy::UrgentFirst));
        assert_eq!(adjusted(&result, "soon"), dec!(400));
        assert_eq!(adjusted(&result, "mid"), dec!(200));
        assert_eq!(adjusted(&result, "late"), Decimal::ZERO);
        assert_eq!(result.flexible_adjusted_total, dec!(600));
    }

    #[test]
    fn test_largest_first_shortfall_lands_on_last_funded() {
        let reqs = vec![req("small", dec!(100), 1), req("big", dec!(900), 2)];
        // budget = 0.95 * 1000 = 950 -> big 900, small 50
        let result = apply_flex_adjustment(&reqs, &request(dec!(0.95), RedistributionStrategy::LargestFirst));
        assert_eq!(adjusted(&result, "big"), dec!(900));
        assert_eq!(adjusted(&result, "small"), dec!(50));
    }

    #[test]
    fn test_minimize_risk_leaves_critical_goals_last() {
        let mut critical = req("critical", dec!(500), 1);
        critical.status = RequirementStatus::Critical;
        let calm = req("calm", dec!(500), 28);
        let result = apply_flex_adjustment(
            &[critical, calm],
            &request(dec!(0.5), RedistributionStrategy::MinimizeRisk),
        );
        assert_eq!(adjusted(&result, "calm"), dec!(500));
        assert_eq!(adjusted(&result, "critical"), Decimal::ZERO);
    }

    #[test]
    fn test_top_up_favours_least_funded_goal() {
        let mut funded = req("funded", dec!(100), 1);
        funded.progress = dec!(0.8);
        funded.remaining_amount = dec!(1000);
        let mut starving = req("starving", dec!(100), 2);
        starving.progress = dec!(0.1);
        starving.remaining_amount = dec!(1000);

        // budget = 1.5 * 200 = 300 -> surplus 100 goes to "starving"
        let result = apply_flex_adjustment(
            &[funded, starving],
            &request(dec!(1.5), RedistributionStrategy::UrgentFirst),
        );
        assert_eq!(adjusted(&result, "starving"), dec!(200));
        assert_eq!(adjusted(&result, "funded"), dec!(100));
        assert_eq!(result.flexible_adjusted_total, dec!(300));
    }

    #[test]
    fn test_top_up_beyond_capacity_still_meets_budget() {
        let mut a = req("a", dec!(100), 1);
        a.remaining_amount = dec!(120);
        let mut b = req("b", dec!(300), 2);
        b.remaining_amount = dec!(300);

        // budget = 2 * 400 = 800; caps absorb 20, the other 380 is spread
        let result = apply_flex_adjustment(&[a, b], &request(dec!(2), RedistributionStrategy::LargestFirst));
        assert_eq!(result.flexible_adjusted_total, dec!(800));
        assert!(result.adjustments.iter().all(|x| x.adjusted_amount >= Decimal::ZERO));
    }

    #[test]
    fn test_factor_is_clamped() {
        let reqs = vec![req("a", dec!(100), 1)];
        let result = apply_flex_adjustment(&reqs, &request(dec!(3), RedistributionStrategy::Balanced));
        assert_eq!(result.factor, dec!(2));
        assert_eq!(adjusted(&result, "a"), dec!(200));

        let result = apply_flex_adjustment(&reqs, &request(dec!(-1), RedistributionStrategy::Balanced));
        assert_eq!(result.factor, Decimal::ZERO);
        assert_eq!(adjusted(&result, "a"), Decimal::ZERO);
    }

    #[test]
    fn test_balanced_thirds_sum_exactly() {
        let reqs = vec![
            req("a", dec!(100), 1),
            req("b", dec!(100), 2),
            req("c", dec!(100), 3),
        ];
        let factor = Decimal::ONE / dec!(3);
        let result = apply_flex_adjustment(&reqs, &request(factor, RedistributionStrategy::Balanced));
        assert_eq!(result.flexible_adjusted_total, factor * dec!(300));
    }
}
