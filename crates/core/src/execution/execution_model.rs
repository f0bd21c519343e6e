//! Execution lifecycle models.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::execution_errors::ExecutionError;
use crate::contributions::{
    AssetShortfall, ContributionEvent, DerivationWindow, GoalProgress, ProgressReport,
    RateBasisKind,
};
use crate::flex::{FlexState, RedistributionStrategy};
use crate::fx::FrozenRates;
use crate::planning::MonthlyPlan;
use crate::utils::MonthLabel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionStatus {
    #[default]
    Draft,
    Executing,
    Closed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Draft => "draft",
            ExecutionStatus::Executing => "executing",
            ExecutionStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One month's plan-and-track record.
///
/// Moves `draft -> executing -> closed`. Each forward transition opens an
/// undo window ending at `undo_deadline`; inside it the most recent
/// transition can be reversed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: String,
    pub month_label: MonthLabel,
    pub status: ExecutionStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub undo_deadline: Option<DateTime<Utc>>,
    /// Committed global flex factor for the month.
    pub flex_factor: Decimal,
    pub strategy: RedistributionStrategy,
}

impl ExecutionRecord {
    pub fn new_draft(
        id: String,
        month_label: MonthLabel,
        created_at: DateTime<Utc>,
        strategy: RedistributionStrategy,
    ) -> Self {
        Self {
            id,
            month_label,
            status: ExecutionStatus::Draft,
            created_at,
            started_at: None,
            completed_at: None,
            undo_deadline: None,
            flex_factor: Decimal::ONE,
            strategy,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status != ExecutionStatus::Closed
    }

    pub fn can_undo(&self, now: DateTime<Utc>) -> bool {
        self.status != ExecutionStatus::Draft && self.undo_deadline.is_some_and(|d| now < d)
    }

    /// `draft -> executing`.
    pub fn start(&mut self, now: DateTime<Utc>, grace: Duration) -> Result<(), ExecutionError> {
        if self.status != ExecutionStatus::Draft {
            return Err(ExecutionError::invalid_transition(
                self.month_label,
                self.status,
                "start",
            ));
        }
        self.status = ExecutionStatus::Executing;
        self.started_at = Some(now);
        self.undo_deadline = Some(now + grace);
        Ok(())
    }

    /// `executing -> closed`.
    pub fn complete(&mut self, now: DateTime<Utc>, grace: Duration) -> Result<(), ExecutionError> {
        if self.status != ExecutionStatus::Executing {
            return Err(ExecutionError::invalid_transition(
                self.month_label,
                self.status,
                "complete",
            ));
        }
        self.status = ExecutionStatus::Closed;
        self.completed_at = Some(now);
        self.undo_deadline = Some(now + grace);
        Ok(())
    }

    /// Reverses the most recent transition and returns the status left.
    ///
    /// After `closed -> executing` the window of the original start applies
    /// again, so a second undo can only reach `draft` while that is open.
    pub fn revert(
        &mut self,
        now: DateTime<Utc>,
        grace: Duration,
    ) -> Result<ExecutionStatus, ExecutionError> {
        if self.status == ExecutionStatus::Draft {
            return Err(ExecutionError::invalid_transition(
                self.month_label,
                self.status,
                "undo",
            ));
        }
        let deadline = self.undo_deadline.ok_or_else(|| {
            ExecutionError::invalid_transition(self.month_label, self.status, "undo")
        })?;
        if now >= deadline {
            return Err(ExecutionError::GracePeriodExpired {
                month: self.month_label,
                deadline,
            });
        }

        let from = self.status;
        match from {
            ExecutionStatus::Closed => {
                self.status = ExecutionStatus::Executing;
                self.completed_at = None;
                self.undo_deadline = self.started_at.map(|s| s + grace);
            }
            ExecutionStatus::Executing => {
                self.status = ExecutionStatus::Draft;
                self.started_at = None;
                self.undo_deadline = None;
            }
            ExecutionStatus::Draft => {}
        }
        Ok(from)
    }
}

/// A goal as planned at the instant tracking started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotGoal {
    pub goal_id: String,
    pub goal_name: String,
    pub planned_amount: Decimal,
    pub currency: String,
    pub flex_state: FlexState,
}

/// Immutable plan captured at `draft -> executing`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSnapshot {
    pub id: String,
    pub record_id: String,
    pub month_label: MonthLabel,
    pub captured_at: DateTime<Utc>,
    pub goals: Vec<SnapshotGoal>,
}

impl ExecutionSnapshot {
    pub fn goal(&self, goal_id: &str) -> Option<&SnapshotGoal> {
        self.goals.iter().find(|g| g.goal_id == goal_id)
    }

    pub fn total_planned(&self) -> Decimal {
        self.goals.iter().map(|g| g.planned_amount).sum()
    }
}

/// Planned versus actual for one goal of a finished month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedGoal {
    pub goal_id: String,
    pub goal_name: String,
    pub currency: String,
    pub flex_state: FlexState,
    pub planned_amount: Decimal,
    pub actual_amount: Decimal,
    pub percent_complete: Decimal,
    pub fulfilled: bool,
}

/// Immutable record of a finished month, created at `executing -> closed`.
///
/// Undo within the grace window deletes it; nothing ever edits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedExecution {
    pub id: String,
    pub record_id: String,
    pub month_label: MonthLabel,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub exchange_rates: FrozenRates,
    pub goals: Vec<CompletedGoal>,
    pub contributions: Vec<ContributionEvent>,
    /// Over-allocated assets as they stood at `completed_at`.
    #[serde(default)]
    pub shortfalls: Vec<AssetShortfall>,
}

impl CompletedExecution {
    pub fn goal(&self, goal_id: &str) -> Option<&CompletedGoal> {
        self.goals.iter().find(|g| g.goal_id == goal_id)
    }

    pub fn fulfilled_count(&self) -> usize {
        self.goals.iter().filter(|g| g.fulfilled).count()
    }

    /// The month's progress exactly as frozen at completion. Facts recorded
    /// after the close never reach this report.
    pub fn to_progress_report(&self) -> ProgressReport {
        ProgressReport {
            month: self.month_label,
            window: DerivationWindow::new(self.started_at, self.completed_at),
            basis: RateBasisKind::Frozen,
            goals: self
                .goals
                .iter()
                .map(|g| GoalProgress {
                    goal_id: g.goal_id.clone(),
                    goal_name: g.goal_name.clone(),
                    currency: g.currency.clone(),
                    planned_amount: g.planned_amount,
                    derived_total: g.actual_amount,
                    fulfilled: g.fulfilled,
                })
                .collect(),
            shortfalls: self.shortfalls.clone(),
            events: self.contributions.clone(),
        }
    }
}

/// Result of re-running the plan for a non-closed month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recalculation {
    pub plan: MonthlyPlan,
    /// Fulfillment re-check; present while the month is executing.
    pub progress: Option<ProgressReport>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 3, 8, 0, 0).unwrap()
    }

    fn draft() -> ExecutionRecord {
        ExecutionRecord::new_draft(
            "rec-1".to_string(),
            "2024-05".parse().unwrap(),
            now(),
            RedistributionStrategy::Balanced,
        )
    }

    #[test]
    fn test_forward_transitions_set_timestamps() {
        let grace = Duration::hours(24);
        let mut record = draft();

        record.start(now(), grace).unwrap();
        assert_eq!(record.status, ExecutionStatus::Executing);
        assert_eq!(record.started_at, Some(now()));
        assert_eq!(record.undo_deadline, Some(now() + grace));

        let later = now() + Duration::days(20);
        record.complete(later, grace).unwrap();
        assert_eq!(record.status, ExecutionStatus::Closed);
        assert_eq!(record.completed_at, Some(later));
        assert_eq!(record.undo_deadline, Some(later + grace));
        assert!(!record.is_active());
    }

    #[test]
    fn test_wrong_state_is_invalid_transition() {
        let grace = Duration::hours(24);
        let mut record = draft();
        assert!(matches!(
            record.complete(now(), grace),
            Err(ExecutionError::InvalidTransition { status: ExecutionStatus::Draft, .. })
        ));

        record.start(now(), grace).unwrap();
        let err = record.start(now(), grace).unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::InvalidTransition { status: ExecutionStatus::Executing, .. }
        ));
        assert!(matches!(
            draft().revert(now(), grace),
            Err(ExecutionError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_revert_steps_back_one_state_at_a_time() {
        let grace = Duration::hours(24);
        let mut record = draft();
        record.start(now(), grace).unwrap();
        let closed_at = now() + Duration::hours(2);
        record.complete(closed_at, grace).unwrap();

        let from = record.revert(closed_at + Duration::hours(1), grace).unwrap();
        assert_eq!(from, ExecutionStatus::Closed);
        assert_eq!(record.status, ExecutionStatus::Executing);
        assert_eq!(record.completed_at, None);
        assert_eq!(record.undo_deadline, Some(now() + grace));

        record.revert(now() + Duration::hours(4), grace).unwrap();
        assert_eq!(record.status, ExecutionStatus::Draft);
        assert_eq!(record.started_at, None);
        assert_eq!(record.undo_deadline, None);
    }

    #[test]
    fn test_revert_after_deadline_is_refused() {
        let grace = Duration::hours(24);
        let mut record = draft();
        record.start(now(), grace).unwrap();
        let err = record.revert(now() + grace, grace).unwrap_err();
        assert_eq!(
            err,
            ExecutionError::GracePeriodExpired {
                month: record.month_label,
                deadline: now() + grace,
            }
        );
        assert_eq!(record.status, ExecutionStatus::Executing);
        assert!(!record.can_undo(now() + grace));
        assert!(record.can_undo(now()));
    }

    #[test]
    fn test_completed_report_uses_stored_figures() {
        let completed = CompletedExecution {
            id: "done-1".to_string(),
            record_id: "rec-1".to_string(),
            month_label: "2024-05".parse().unwrap(),
            started_at: now(),
            completed_at: now() + Duration::days(27),
            exchange_rates: FrozenRates::default(),
            goals: vec![CompletedGoal {
                goal_id: "fund".to_string(),
                goal_name: "Emergency Fund".to_string(),
                currency: "USD".to_string(),
                flex_state: FlexState::Flexible,
                planned_amount: Decimal::new(600, 0),
                actual_amount: Decimal::new(100, 0),
                percent_complete: Decimal::new(1667, 2),
                fulfilled: false,
            }],
            contributions: Vec::new(),
            shortfalls: Vec::new(),
        };

        let report = completed.to_progress_report();
        assert_eq!(report.basis, RateBasisKind::Frozen);
        assert_eq!(report.window.end, now() + Duration::days(27));
        let fund = report.progress_for("fund").unwrap();
        assert_eq!(fund.derived_total, Decimal::new(100, 0));
        assert!(!fund.fulfilled);
    }

    #[test]
    fn test_status_serializes_camel_case() {
        assert_eq!(
            serde_json::to_string(&ExecutionStatus::Executing).unwrap(),
            "\"executing\""
        );
    }
}
