use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use uuid::Uuid;

use crate::errors::{Result, ValidationError};
use crate::events::{DomainEvent, DomainEventSink, NoOpDomainEventSink};
use crate::flex::{FlexPreference, QuickAction};
use crate::goals::goals_model::{Goal, GoalStatus, GoalUpdate, NewGoal};
use crate::goals::goals_traits::{
    FlexPreferenceRepositoryTrait, GoalRepositoryTrait, GoalServiceTrait,
};
use crate::utils::Clock;

pub struct GoalService {
    goal_repo: Arc<dyn GoalRepositoryTrait>,
    flex_repo: Arc<dyn FlexPreferenceRepositoryTrait>,
    clock: Arc<dyn Clock>,
    event_sink: Arc<dyn DomainEventSink>,
}

impl GoalService {
    pub fn new(
        goal_repo: Arc<dyn GoalRepositoryTrait>,
        flex_repo: Arc<dyn FlexPreferenceRepositoryTrait>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        GoalService {
            goal_repo,
            flex_repo,
            clock,
            event_sink: Arc::new(NoOpDomainEventSink),
        }
    }

    /// Sets the domain event sink for this service.
    pub fn with_event_sink(mut self, event_sink: Arc<dyn DomainEventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }
}

#[async_trait]
impl GoalServiceTrait for GoalService {
    fn get_goals(&self) -> Result<Vec<Goal>> {
        self.goal_repo.load_goals()
    }

    fn get_active_goals(&self) -> Result<Vec<Goal>> {
        Ok(self
            .goal_repo
            .load_goals()?
            .into_iter()
            .filter(Goal::is_active)
            .collect())
    }

    async fn create_goal(&self, new_goal: NewGoal) -> Result<Goal> {
        new_goal.validate()?;
        let goal = Goal {
            id: new_goal
                .id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: new_goal.name.trim().to_string(),
            target_amount: new_goal.target_amount,
            currency: new_goal.currency.trim().to_uppercase(),
            deadline: new_goal.deadline,
            created_at: self.clock.now(),
            status: GoalStatus::Active,
        };
        let created = self.goal_repo.insert_new_goal(goal).await?;
        info!("Created goal {} ({})", created.name, created.id);
        self.event_sink
            .emit(DomainEvent::goals_changed(vec![created.id.clone()]));
        Ok(created)
    }

    async fn update_goal(&self, goal_id: &str, update: GoalUpdate) -> Result<Goal> {
        let existing = self.goal_repo.get_goal(goal_id)?;
        let mut updated = update.apply_to(&existing)?;
        updated.currency = updated.currency.trim().to_uppercase();
        if existing.deadline != updated.deadline {
            debug!(
                "Goal {} deadline moved {} -> {}",
                goal_id, existing.deadline, updated.deadline
            );
        }
        let saved = self.goal_repo.update_goal(updated).await?;
        self.event_sink
            .emit(DomainEvent::goals_changed(vec![saved.id.clone()]));
        Ok(saved)
    }

    async fn delete_goal(&self, goal_id: &str) -> Result<usize> {
        let deleted = self.goal_repo.delete_goal(goal_id).await?;
        self.flex_repo.delete_preference(goal_id).await?;
        self.event_sink
            .emit(DomainEvent::goals_changed(vec![goal_id.to_string()]));
        Ok(deleted)
    }

    fn get_flex_preferences(&self) -> Result<Vec<FlexPreference>> {
        self.flex_repo.load_preferences()
    }

    async fn upsert_flex_preferences(&self, preferences: Vec<FlexPreference>) -> Result<usize> {
        for preference in &preferences {
            if let Some(amount) = preference.custom_amount {
                if amount.is_sign_negative() && !amount.is_zero() {
                    return Err(ValidationError::InvalidInput(format!(
                        "Custom amount for goal {} must not be negative",
                        preference.goal_id
                    ))
                    .into());
                }
            }
        }
        let goal_ids = preferences.iter().map(|p| p.goal_id.clone()).collect();
        let count = self.flex_repo.upsert_preferences(preferences).await?;
        self.event_sink.emit(DomainEvent::goals_changed(goal_ids));
        Ok(count)
    }

    async fn apply_quick_action(&self, action: QuickAction) -> Result<Vec<FlexPreference>> {
        let goal_ids: Vec<String> = self
            .get_active_goals()?
            .into_iter()
            .map(|g| g.id)
            .collect();
        let current = self.flex_repo.load_preferences()?;
        let updated = action.apply_to_preferences(&goal_ids, &current, self.clock.now());

        if updated.iter().any(|p| !current.contains(p)) {
            self.flex_repo.upsert_preferences(updated.clone()).await?;
            self.event_sink.emit(DomainEvent::goals_changed(goal_ids));
        }
        info!("Applied quick action {:?} to {} goal(s)", action, updated.len());
        Ok(updated)
    }
}
