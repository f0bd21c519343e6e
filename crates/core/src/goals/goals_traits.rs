use crate::errors::Result;
use crate::flex::{FlexPreference, QuickAction};
use crate::goals::goals_model::{Goal, GoalUpdate, NewGoal};
use async_trait::async_trait;

/// Trait for goal repository operations
#[async_trait]
pub trait GoalRepositoryTrait: Send + Sync {
    fn load_goals(&self) -> Result<Vec<Goal>>;
    fn get_goal(&self, goal_id: &str) -> Result<Goal>;
    async fn insert_new_goal(&self, goal: Goal) -> Result<Goal>;
    async fn update_goal(&self, goal: Goal) -> Result<Goal>;
    async fn delete_goal(&self, goal_id: &str) -> Result<usize>;
}

/// Trait for the per-goal flex preference store
#[async_trait]
pub trait FlexPreferenceRepositoryTrait: Send + Sync {
    fn load_preferences(&self) -> Result<Vec<FlexPreference>>;
    async fn upsert_preferences(&self, preferences: Vec<FlexPreference>) -> Result<usize>;
    async fn delete_preference(&self, goal_id: &str) -> Result<usize>;
}

/// Trait for goal service operations
#[async_trait]
pub trait GoalServiceTrait: Send + Sync {
    fn get_goals(&self) -> Result<Vec<Goal>>;
    fn get_active_goals(&self) -> Result<Vec<Goal>>;
    async fn create_goal(&self, new_goal: NewGoal) -> Result<Goal>;
    async fn update_goal(&self, goal_id: &str, update: GoalUpdate) -> Result<Goal>;
    async fn delete_goal(&self, goal_id: &str) -> Result<usize>;
    fn get_flex_preferences(&self) -> Result<Vec<FlexPreference>>;
    async fn upsert_flex_preferences(&self, preferences: Vec<FlexPreference>) -> Result<usize>;
    async fn apply_quick_action(&self, action: QuickAction) -> Result<Vec<FlexPreference>>;
}
