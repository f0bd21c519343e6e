//! Lifecycle error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::execution_model::ExecutionStatus;
use crate::utils::MonthLabel;

/// Errors raised by execution record transitions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    /// A lifecycle method was called from the wrong state.
    #[error("Cannot {action} month {month} while it is {status}")]
    InvalidTransition {
        month: MonthLabel,
        status: ExecutionStatus,
        action: String,
    },

    /// Undo was attempted after the grace window closed.
    #[error("Undo window for month {month} closed at {deadline}")]
    GracePeriodExpired {
        month: MonthLabel,
        deadline: DateTime<Utc>,
    },

    /// A second non-closed record was about to exist for a month.
    #[error("Month {month} already has an active execution record")]
    DuplicateActiveRecord { month: MonthLabel },

    /// A closed record has no completed execution attached.
    #[error("Closed month {month} has no completed execution")]
    MissingSnapshot { month: MonthLabel },

    #[error("No execution record for month {0}")]
    RecordNotFound(MonthLabel),
}

impl ExecutionError {
    pub(crate) fn invalid_transition(
        month: MonthLabel,
        status: ExecutionStatus,
        action: &str,
    ) -> Self {
        Self::InvalidTransition {
            month,
            status,
            action: action.to_string(),
        }
    }

    /// Actionable text for the person using the planner.
    pub fn user_message(&self) -> String {
        match self {
            ExecutionError::InvalidTransition { status, .. } => match status {
                ExecutionStatus::Draft => "This month hasn't started tracking yet".to_string(),
                ExecutionStatus::Executing => "This month is already being tracked".to_string(),
                ExecutionStatus::Closed => "This month is already completed".to_string(),
            },
            ExecutionError::GracePeriodExpired { .. } => {
                "The 24-hour undo window has passed".to_string()
            }
            ExecutionError::DuplicateActiveRecord { .. } => {
                "This month is already being tracked".to_string()
            }
            ExecutionError::MissingSnapshot { month } => {
                format!("The record for {} is incomplete and cannot be shown", month)
            }
            ExecutionError::RecordNotFound(month) => format!("Nothing is planned for {} yet", month),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;

    #[test]
    fn test_user_messages_are_actionable() {
        let month: MonthLabel = "2024-05".parse().unwrap();
        let err = ExecutionError::invalid_transition(month, ExecutionStatus::Executing, "start");
        assert_eq!(err.user_message(), "This month is already being tracked");
        assert_eq!(
            err.to_string(),
            "Cannot start month 2024-05 while it is executing"
        );

        let late: Error = ExecutionError::GracePeriodExpired {
            month,
            deadline: Utc::now(),
        }
        .into();
        assert_eq!(late.user_message(), "The 24-hour undo window has passed");
    }
}
