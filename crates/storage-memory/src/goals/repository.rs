use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use goalpace_core::flex::FlexPreference;
use goalpace_core::goals::{FlexPreferenceRepositoryTrait, Goal, GoalRepositoryTrait};
use goalpace_core::Result;
use log::debug;

use crate::errors::{duplicate, not_found, IntoCore};

const GOALS: &str = "goals";
const PREFERENCES: &str = "goal_flex_preferences";

#[derive(Default)]
pub struct GoalRepository {
    goals: RwLock<BTreeMap<String, Goal>>,
}

impl GoalRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GoalRepositoryTrait for GoalRepository {
    fn load_goals(&self) -> Result<Vec<Goal>> {
        let goals = self.goals.read().into_core(GOALS)?;
        let mut loaded: Vec<Goal> = goals.values().cloned().collect();
        loaded.sort_by(|a, b| a.deadline.cmp(&b.deadline).then_with(|| a.id.cmp(&b.id)));
        Ok(loaded)
    }

    fn get_goal(&self, goal_id: &str) -> Result<Goal> {
        self.goals
            .read()
            .into_core(GOALS)?
            .get(goal_id)
            .cloned()
            .ok_or_else(|| not_found(GOALS, goal_id))
    }

    async fn insert_new_goal(&self, goal: Goal) -> Result<Goal> {
        let mut goals = self.goals.write().into_core(GOALS)?;
        if goals.contains_key(&goal.id) {
            return Err(duplicate(GOALS, goal.id));
        }
        goals.insert(goal.id.clone(), goal.clone());
        Ok(goal)
    }

    async fn update_goal(&self, goal: Goal) -> Result<Goal> {
        let mut goals = self.goals.write().into_core(GOALS)?;
        match goals.get_mut(&goal.id) {
            Some(slot) => {
                *slot = goal.clone();
                Ok(goal)
            }
            None => Err(not_found(GOALS, goal.id)),
        }
    }

    async fn delete_goal(&self, goal_id: &str) -> Result<usize> {
        let removed = self.goals.write().into_core(GOALS)?.remove(goal_id);
        Ok(usize::from(removed.is_some()))
    }
}

#[derive(Default)]
pub struct FlexPreferenceRepository {
    preferences: RwLock<BTreeMap<String, FlexPreference>>,
}

impl FlexPreferenceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlexPreferenceRepositoryTrait for FlexPreferenceRepository {
    fn load_preferences(&self) -> Result<Vec<FlexPreference>> {
        Ok(self
            .preferences
            .read()
            .into_core(PREFERENCES)?
            .values()
            .cloned()
            .collect())
    }

    async fn upsert_preferences(&self, preferences: Vec<FlexPreference>) -> Result<usize> {
        let mut stored = self.preferences.write().into_core(PREFERENCES)?;
        let count = preferences.len();
        for preference in preferences {
            stored.insert(preference.goal_id.clone(), preference);
        }
        debug!("Upserted {} flex preference(s)", count);
        Ok(count)
    }

    async fn delete_preference(&self, goal_id: &str) -> Result<usize> {
        let removed = self
            .preferences
            .write()
            .into_core(PREFERENCES)?
            .remove(goal_id);
        Ok(usize::from(removed.is_some()))
    }
}
