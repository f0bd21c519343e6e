use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::execution::ExecutionRecord;
use crate::flex::FlexAdjustmentResult;
use crate::requirements::MonthlyRequirement;

/// Requirements of every active goal at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementSet {
    pub computed_at: DateTime<Utc>,
    pub requirements: Vec<MonthlyRequirement>,
    /// Some current total was computed with a stale or missing rate.
    pub rates_stale: bool,
}

/// Requirements with the month's flex adjustment applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub computed_at: DateTime<Utc>,
    pub requirements: Vec<MonthlyRequirement>,
    pub adjustments: FlexAdjustmentResult,
    pub rates_stale: bool,
}

/// What the planner shows for a month: its record and the live plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPlan {
    pub record: ExecutionRecord,
    #[serde(flatten)]
    pub plan: PlanSummary,
}
