//! Per-goal monthly requirement projection.
//!
//! Pure functions of their inputs: recomputing at any time yields the same
//! answer and never accumulates drift.

use chrono::NaiveDate;
use num_traits::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use super::requirements_model::{MonthlyRequirement, RequirementParams, RequirementStatus};
use crate::constants::DECIMAL_PRECISION;
use crate::goals::Goal;
use crate::settings::MonthRounding;
use crate::utils::days_until;

/// Months left until `deadline`, never less than 1.
pub fn months_remaining(today: NaiveDate, deadline: NaiveDate, params: &RequirementParams) -> u32 {
    let days = days_until(today, deadline);
    if days <= 0 || params.days_per_month <= Decimal::ZERO {
        return 1;
    }

    let months = Decimal::from(days) / params.days_per_month;
    let rounded = match params.month_rounding {
        MonthRounding::Ceil => months.ceil(),
        MonthRounding::Floor => months.floor(),
    };
    rounded.to_u32().unwrap_or(u32::MAX).max(1)
}

/// Projects how much `goal` needs per month given what is already funded.
pub fn calculate_requirement(
    goal: &Goal,
    current_total: Decimal,
    today: NaiveDate,
    params: &RequirementParams,
) -> MonthlyRequirement {
    let target = goal.target_amount.max(Decimal::ZERO);
    let remaining = (target - current_total).max(Decimal::ZERO);
    let months = months_remaining(today, goal.deadline, params);

    let required_monthly = if months > 0 {
        (remaining / Decimal::from(months))
            .round_dp_with_strategy(DECIMAL_PRECISION, RoundingStrategy::MidpointAwayFromZero)
    } else {
        remaining
    };

    let progress = if target > Decimal::ZERO {
        (current_total / target).clamp(Decimal::ZERO, Decimal::ONE)
    } else {
        Decimal::ONE
    };

    let status = classify(remaining, required_monthly, today, goal.deadline, params);

    MonthlyRequirement {
        goal_id: goal.id.clone(),
        goal_name: goal.name.clone(),
        currency: goal.currency.clone(),
        deadline: goal.deadline,
        target_amount: target,
        current_total,
        remaining_amount: remaining,
        months_remaining: months,
        required_monthly,
        progress,
        status,
    }
}

/// First matching rule wins.
fn classify(
    remaining: Decimal,
    required_monthly: Decimal,
    today: NaiveDate,
    deadline: NaiveDate,
    params: &RequirementParams,
) -> RequirementStatus {
    if remaining.is_zero() {
        return RequirementStatus::Completed;
    }
    if today > deadline {
        return RequirementStatus::Critical;
    }
    if params
        .critical_threshold
        .is_some_and(|threshold| required_monthly > threshold)
    {
        return RequirementStatus::Critical;
    }
    if params
        .attention_threshold
        .is_some_and(|threshold| required_monthly > threshold)
    {
        return RequirementStatus::Attention;
    }
    RequirementStatus::OnTrack
}
