use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use rust_decimal::Decimal;

use super::planning_model::{PlanSummary, RequirementSet};
use crate::allocations::AllocationHistoryRepositoryTrait;
use crate::assets::{AssetRepositoryTrait, TransactionSourceTrait};
use crate::contributions::{current_totals, load_inputs, required_rate_pairs, GoalRef};
use crate::errors::{Result, ValidationError};
use crate::flex::{
    apply_flex_adjustment, FlexAdjustmentRequest, FlexAdjustmentResult, FlexPreference,
    RedistributionStrategy,
};
use crate::fx::FxServiceTrait;
use crate::goals::GoalServiceTrait;
use crate::requirements::{calculate_requirement, MonthlyRequirement, RequirementParams};
use crate::settings::SettingsServiceTrait;
use crate::utils::Clock;

#[async_trait]
pub trait PlanningServiceTrait: Send + Sync {
    /// Requirements of all active goals as of now.
    async fn compute_requirements(&self) -> Result<RequirementSet>;

    /// Applies a flex adjustment without committing anything.
    async fn preview_flex_adjustment(
        &self,
        factor: Decimal,
        strategy: RedistributionStrategy,
        protected_ids: HashSet<String>,
        skipped_ids: HashSet<String>,
    ) -> Result<FlexAdjustmentResult>;

    /// Requirements adjusted with `factor` and the stored flex preferences.
    async fn build_plan(
        &self,
        factor: Decimal,
        strategy: RedistributionStrategy,
    ) -> Result<PlanSummary>;
}

pub struct PlanningService {
    goal_service: Arc<dyn GoalServiceTrait>,
    asset_repo: Arc<dyn AssetRepositoryTrait>,
    transactions: Arc<dyn TransactionSourceTrait>,
    history_repo: Arc<dyn AllocationHistoryRepositoryTrait>,
    fx_service: Arc<dyn FxServiceTrait>,
    settings_service: Arc<dyn SettingsServiceTrait>,
    clock: Arc<dyn Clock>,
}

impl PlanningService {
    pub fn new(
        goal_service: Arc<dyn GoalServiceTrait>,
        asset_repo: Arc<dyn AssetRepositoryTrait>,
        transactions: Arc<dyn TransactionSourceTrait>,
        history_repo: Arc<dyn AllocationHistoryRepositoryTrait>,
        fx_service: Arc<dyn FxServiceTrait>,
        settings_service: Arc<dyn SettingsServiceTrait>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            goal_service,
            asset_repo,
            transactions,
            history_repo,
            fx_service,
            settings_service,
            clock,
        }
    }

    fn validate_factor(factor: Decimal) -> Result<()> {
        if factor < Decimal::ZERO || factor > Decimal::TWO {
            return Err(ValidationError::InvalidInput(format!(
                "Flex factor must be between 0 and 2, got {}",
                factor
            ))
            .into());
        }
        Ok(())
    }
}

/// Replaces a goal's required amount by its custom override, if any.
fn with_overrides(
    requirements: &[MonthlyRequirement],
    preferences: &[FlexPreference],
) -> Vec<MonthlyRequirement> {
    requirements
        .iter()
        .map(|requirement| {
            let mut requirement = requirement.clone();
            if let Some(amount) = preferences
                .iter()
                .find(|p| p.goal_id == requirement.goal_id)
                .and_then(|p| p.custom_amount)
            {
                requirement.required_monthly = amount;
            }
            requirement
        })
        .collect()
}

#[async_trait]
impl PlanningServiceTrait for PlanningService {
    async fn compute_requirements(&self) -> Result<RequirementSet> {
        let settings = self.settings_service.get_settings()?;
        let params = RequirementParams::from(&settings);
        let goals = self.goal_service.get_active_goals()?;
        let now = self.clock.now();

        let inputs = load_inputs(
            self.asset_repo.as_ref(),
            self.transactions.as_ref(),
            self.history_repo.as_ref(),
        )?;
        let refs: Vec<GoalRef<'_>> = goals
            .iter()
            .map(|g| GoalRef {
                goal_id: &g.id,
                currency: &g.currency,
            })
            .collect();
        let live = self
            .fx_service
            .get_live_rates(&required_rate_pairs(&inputs, &refs))
            .await;
        let (totals, rates_stale) = current_totals(&inputs, &refs, now, &live);
        if rates_stale {
            warn!("Requirements computed with stale or missing exchange rates");
        }

        let today = now.date_naive();
        let requirements: Vec<MonthlyRequirement> = goals
            .iter()
            .map(|goal| {
                let current = totals.get(&goal.id).copied().unwrap_or(Decimal::ZERO);
                calculate_requirement(goal, current, today, &params)
            })
            .collect();
        debug!("Computed {} requirement(s)", requirements.len());

        Ok(RequirementSet {
            computed_at: now,
            requirements,
            rates_stale,
        })
    }

    async fn preview_flex_adjustment(
        &self,
        factor: Decimal,
        strategy: RedistributionStrategy,
        protected_ids: HashSet<String>,
        skipped_ids: HashSet<String>,
    ) -> Result<FlexAdjustmentResult> {
        Self::validate_factor(factor)?;
        let set = self.compute_requirements().await?;
        let preferences = self.goal_service.get_flex_preferences()?;
        let request = FlexAdjustmentRequest {
            factor,
            strategy,
            protected_ids,
            skipped_ids,
        };
        Ok(apply_flex_adjustment(
            &with_overrides(&set.requirements, &preferences),
            &request,
        ))
    }

    async fn build_plan(
        &self,
        factor: Decimal,
        strategy: RedistributionStrategy,
    ) -> Result<PlanSummary> {
        Self::validate_factor(factor)?;
        let set = self.compute_requirements().await?;
        let preferences = self.goal_service.get_flex_preferences()?;
        let request = FlexAdjustmentRequest::from_preferences(factor, strategy, &preferences);
        let adjustments =
            apply_flex_adjustment(&with_overrides(&set.requirements, &preferences), &request);

        Ok(PlanSummary {
            computed_at: set.computed_at,
            requirements: set.requirements,
            adjustments,
            rates_stale: set.rates_stale,
        })
    }
}
