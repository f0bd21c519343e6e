//! Monthly requirement models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::settings::{MonthRounding, PlannerSettings};

/// Health of a goal's funding pace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequirementStatus {
    OnTrack,
    Attention,
    Critical,
    Completed,
}

impl RequirementStatus {
    /// Ordering key from least to most severe.
    pub fn severity(&self) -> u8 {
        match self {
            RequirementStatus::Completed => 0,
            RequirementStatus::OnTrack => 1,
            RequirementStatus::Attention => 2,
            RequirementStatus::Critical => 3,
        }
    }
}

/// Transient per-goal requirement; recomputed on demand and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRequirement {
    pub goal_id: String,
    pub goal_name: String,
    pub currency: String,
    pub deadline: NaiveDate,
    pub target_amount: Decimal,
    pub current_total: Decimal,
    pub remaining_amount: Decimal,
    pub months_remaining: u32,
    pub required_monthly: Decimal,
    /// Fraction of the target already funded, in `[0, 1]`.
    pub progress: Decimal,
    pub status: RequirementStatus,
}

/// Calculator parameters, usually derived from [`PlannerSettings`].
#[derive(Debug, Clone, PartialEq)]
pub struct RequirementParams {
    pub days_per_month: Decimal,
    pub month_rounding: MonthRounding,
    pub attention_threshold: Option<Decimal>,
    pub critical_threshold: Option<Decimal>,
}

impl From<&PlannerSettings> for RequirementParams {
    fn from(settings: &PlannerSettings) -> Self {
        Self {
            days_per_month: settings.days_per_month,
            month_rounding: settings.month_rounding,
            attention_threshold: settings.attention_threshold,
            critical_threshold: settings.critical_threshold,
        }
    }
}

impl Default for RequirementParams {
    fn default() -> Self {
        Self::from(&PlannerSettings::default())
    }
}
