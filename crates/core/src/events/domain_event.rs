//! Domain event types.

use serde::{Deserialize, Serialize};

use crate::execution::ExecutionStatus;
use crate::utils::MonthLabel;

/// Domain events emitted by core services after successful mutations.
///
/// Goal, asset and allocation changes are triggers for recalculating the
/// current month's plan. Lifecycle transitions are informational.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// Goals were created, updated, deleted, or had their flex preference changed.
    GoalsChanged { goal_ids: Vec<String> },

    /// Asset balances changed (a transaction arrived).
    AssetsChanged { asset_ids: Vec<String> },

    /// Allocation targets changed for an asset.
    AllocationsChanged {
        asset_id: String,
        goal_ids: Vec<String>,
    },

    /// An execution record moved between lifecycle states.
    ExecutionTransitioned {
        month: MonthLabel,
        from: ExecutionStatus,
        to: ExecutionStatus,
    },
}

impl DomainEvent {
    /// Creates a GoalsChanged event.
    pub fn goals_changed(goal_ids: Vec<String>) -> Self {
        Self::GoalsChanged { goal_ids }
    }

    /// Creates an AssetsChanged event.
    pub fn assets_changed(asset_ids: Vec<String>) -> Self {
        Self::AssetsChanged { asset_ids }
    }

    /// Creates an AllocationsChanged event.
    pub fn allocations_changed(asset_id: String, goal_ids: Vec<String>) -> Self {
        Self::AllocationsChanged { asset_id, goal_ids }
    }

    /// Creates an ExecutionTransitioned event.
    pub fn execution_transitioned(
        month: MonthLabel,
        from: ExecutionStatus,
        to: ExecutionStatus,
    ) -> Self {
        Self::ExecutionTransitioned { month, from, to }
    }

    /// Whether this event should cause the current plan to be recomputed.
    pub fn triggers_recalculation(&self) -> bool {
        !matches!(self, DomainEvent::ExecutionTransitioned { .. })
    }
}
