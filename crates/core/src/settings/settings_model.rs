//! Planner configuration model.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DAYS_PER_MONTH, DEFAULT_HISTORY_PAGE_SIZE, DEFAULT_RECALC_DEBOUNCE_MS,
    DEFAULT_UNDO_GRACE_PERIOD_HOURS,
};
use crate::flex::RedistributionStrategy;

pub const UNDO_GRACE_PERIOD_HOURS_KEY: &str = "undo_grace_period_hours";
pub const DAYS_PER_MONTH_KEY: &str = "days_per_month";
pub const MONTH_ROUNDING_KEY: &str = "month_rounding";
pub const ATTENTION_THRESHOLD_KEY: &str = "attention_threshold";
pub const CRITICAL_THRESHOLD_KEY: &str = "critical_threshold";
pub const DEFAULT_STRATEGY_KEY: &str = "default_strategy";
pub const RECALC_DEBOUNCE_MS_KEY: &str = "recalc_debounce_ms";
pub const HISTORY_PAGE_SIZE_KEY: &str = "history_page_size";

/// How a partial month at the end of a goal's horizon is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MonthRounding {
    /// A started month counts as a full month.
    #[default]
    Ceil,
    /// Only complete months count.
    Floor,
}

impl MonthRounding {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonthRounding::Ceil => "ceil",
            MonthRounding::Floor => "floor",
        }
    }
}

impl FromStr for MonthRounding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ceil" => Ok(MonthRounding::Ceil),
            "floor" => Ok(MonthRounding::Floor),
            other => Err(format!("unknown month rounding '{}'", other)),
        }
    }
}

/// Tunables for the planning engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlannerSettings {
    pub undo_grace_period_hours: i64,
    pub days_per_month: Decimal,
    pub month_rounding: MonthRounding,
    /// Monthly amount (goal currency) above which a goal needs attention.
    pub attention_threshold: Option<Decimal>,
    /// Monthly amount (goal currency) above which a goal is critical.
    pub critical_threshold: Option<Decimal>,
    pub default_strategy: RedistributionStrategy,
    pub recalc_debounce_ms: u64,
    pub history_page_size: usize,
}

impl PlannerSettings {
    pub fn undo_grace_period(&self) -> chrono::Duration {
        chrono::Duration::hours(self.undo_grace_period_hours)
    }

    pub fn recalc_debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.recalc_debounce_ms)
    }
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            undo_grace_period_hours: DEFAULT_UNDO_GRACE_PERIOD_HOURS,
            days_per_month: Decimal::from_str(DEFAULT_DAYS_PER_MONTH)
                .unwrap_or(Decimal::from(30)),
            month_rounding: MonthRounding::default(),
            attention_threshold: None,
            critical_threshold: None,
            default_strategy: RedistributionStrategy::default(),
            recalc_debounce_ms: DEFAULT_RECALC_DEBOUNCE_MS,
            history_page_size: DEFAULT_HISTORY_PAGE_SIZE,
        }
    }
}
