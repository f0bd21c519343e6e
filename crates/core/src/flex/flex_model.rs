//! Flex adjustment domain models.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::requirements::RequirementStatus;

/// Per-goal participation in the global flex adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlexState {
    /// Scaled by the global factor.
    #[default]
    Flexible,
    /// Always keeps its original amount.
    Protected,
    /// Always contributes 0 this month.
    Skipped,
}

/// Long-lived flex preference, one per goal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlexPreference {
    pub goal_id: String,
    pub flex_state: FlexState,
    /// Replaces the calculated monthly requirement when set.
    pub custom_amount: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
}

impl FlexPreference {
    pub fn flexible(goal_id: impl Into<String>, updated_at: DateTime<Utc>) -> Self {
        Self {
            goal_id: goal_id.into(),
            flex_state: FlexState::Flexible,
            custom_amount: None,
            updated_at,
        }
    }
}

/// Ordering used when a constrained budget does not cover every flexible goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum RedistributionStrategy {
    /// Every flexible goal is scaled by the same ratio.
    #[default]
    Balanced,
    /// Nearest deadline funded first.
    UrgentFirst,
    /// Largest monthly requirement funded first.
    LargestFirst,
    /// Least severe status funded first; critical goals are left for a
    /// deliberate decision.
    MinimizeRisk,
}

impl RedistributionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedistributionStrategy::Balanced => "balanced",
            RedistributionStrategy::UrgentFirst => "urgentFirst",
            RedistributionStrategy::LargestFirst => "largestFirst",
            RedistributionStrategy::MinimizeRisk => "minimizeRisk",
        }
    }
}

impl FromStr for RedistributionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "balanced" => Ok(RedistributionStrategy::Balanced),
            "urgentFirst" | "urgent_first" => Ok(RedistributionStrategy::UrgentFirst),
            "largestFirst" | "largest_first" => Ok(RedistributionStrategy::LargestFirst),
            "minimizeRisk" | "minimize_risk" => Ok(RedistributionStrategy::MinimizeRisk),
            other => Err(format!("unknown redistribution strategy '{}'", other)),
        }
    }
}

/// Input of the flex adjustment engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlexAdjustmentRequest {
    /// Global factor in `[0, 2]`; values outside are clamped.
    pub factor: Decimal,
    pub strategy: RedistributionStrategy,
    #[serde(default)]
    pub protected_ids: HashSet<String>,
    #[serde(default)]
    pub skipped_ids: HashSet<String>,
}

impl FlexAdjustmentRequest {
    pub fn new(factor: Decimal, strategy: RedistributionStrategy) -> Self {
        Self {
            factor,
            strategy,
            protected_ids: HashSet::new(),
            skipped_ids: HashSet::new(),
        }
    }

    /// Builds the protected/skipped sets from stored preferences.
    pub fn from_preferences(
        factor: Decimal,
        strategy: RedistributionStrategy,
        preferences: &[FlexPreference],
    ) -> Self {
        let mut request = Self::new(factor, strategy);
        for preference in preferences {
            match preference.flex_state {
                FlexState::Protected => {
                    request.protected_ids.insert(preference.goal_id.clone());
                }
                FlexState::Skipped => {
                    request.skipped_ids.insert(preference.goal_id.clone());
                }
                FlexState::Flexible => {}
            }
        }
        request
    }

    /// Skipped wins over protected when a goal appears in both sets.
    pub fn flex_state_of(&self, goal_id: &str) -> FlexState {
        if self.skipped_ids.contains(goal_id) {
            FlexState::Skipped
        } else if self.protected_ids.contains(goal_id) {
            FlexState::Protected
        } else {
            FlexState::Flexible
        }
    }
}

/// One goal's result of a flex adjustment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdjustedRequirement {
    pub goal_id: String,
    pub goal_name: String,
    pub currency: String,
    pub deadline: NaiveDate,
    pub status: RequirementStatus,
    pub flex_state: FlexState,
    pub original_amount: Decimal,
    pub adjusted_amount: Decimal,
    /// `adjusted_amount - original_amount`
    pub delta: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlexAdjustmentResult {
    pub factor: Decimal,
    pub strategy: RedistributionStrategy,
    pub adjustments: Vec<AdjustedRequirement>,
    pub flexible_original_total: Decimal,
    pub flexible_adjusted_total: Decimal,
    pub total_original: Decimal,
    pub total_adjusted: Decimal,
}

impl FlexAdjustmentResult {
    pub fn adjustment_for(&self, goal_id: &str) -> Option<&AdjustedRequirement> {
        self.adjustments.iter().find(|a| a.goal_id == goal_id)
    }
}

/// One-tap presets over the flex preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuickAction {
    /// Every non-protected goal is skipped this month.
    SkipMonth,
    /// Factor 0.5.
    PayHalf,
    /// Factor 1.0.
    PayExact,
    /// Clears overrides and skips; explicit protections stay.
    Reset,
}

impl QuickAction {
    /// Global factor the action implies, if it changes the factor.
    pub fn factor(&self) -> Option<Decimal> {
        match self {
            QuickAction::PayHalf => Some(Decimal::new(5, 1)),
            QuickAction::PayExact | QuickAction::Reset => Some(Decimal::ONE),
            QuickAction::SkipMonth => None,
        }
    }

    /// Returns the preference set after applying the action to every goal in
    /// `goal_ids`. Goals with no stored preference are treated as flexible.
    pub fn apply_to_preferences(
        &self,
        goal_ids: &[String],
        preferences: &[FlexPreference],
        now: DateTime<Utc>,
    ) -> Vec<FlexPreference> {
        goal_ids
            .iter()
            .map(|goal_id| {
                let mut preference = preferences
                    .iter()
                    .find(|p| &p.goal_id == goal_id)
                    .cloned()
                    .unwrap_or_else(|| FlexPreference::flexible(goal_id.clone(), now));

                match self {
                    QuickAction::SkipMonth => {
                        if preference.flex_state != FlexState::Protected {
                            preference.flex_state = FlexState::Skipped;
                            preference.updated_at = now;
                        }
                    }
                    QuickAction::Reset => {
                        if preference.flex_state == FlexState::Skipped
                            || preference.custom_amount.is_some()
                        {
                            preference.updated_at = now;
                        }
                        preference.custom_amount = None;
                        if preference.flex_state != FlexState::Protected {
                            preference.flex_state = FlexState::Flexible;
                        }
                    }
                    QuickAction::PayHalf | QuickAction::PayExact => {}
                }
                preference
            })
            .collect()
    }
}
