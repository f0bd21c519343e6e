//! Goals domain models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Lifecycle of a savings goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    #[default]
    Active,
    Cancelled,
    Finished,
}

/// Domain model representing a savings goal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub name: String,
    pub target_amount: Decimal,
    pub currency: String,
    pub deadline: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub status: GoalStatus,
}

impl Goal {
    pub fn is_active(&self) -> bool {
        self.status == GoalStatus::Active
    }
}

/// Input model for creating a new goal
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewGoal {
    pub id: Option<String>,
    pub name: String,
    pub target_amount: Decimal,
    pub currency: String,
    pub deadline: NaiveDate,
}

impl NewGoal {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.name, self.target_amount, &self.currency)
    }
}

/// Partial update for an existing goal. `None` leaves the field unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GoalUpdate {
    pub name: Option<String>,
    pub target_amount: Option<Decimal>,
    pub currency: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub status: Option<GoalStatus>,
}

impl GoalUpdate {
    /// Applies the update to `goal`, returning the validated result.
    pub fn apply_to(&self, goal: &Goal) -> Result<Goal, ValidationError> {
        let mut updated = goal.clone();
        if let Some(name) = &self.name {
            updated.name = name.clone();
        }
        if let Some(target_amount) = self.target_amount {
            updated.target_amount = target_amount;
        }
        if let Some(currency) = &self.currency {
            updated.currency = currency.clone();
        }
        if let Some(deadline) = self.deadline {
            updated.deadline = deadline;
        }
        if let Some(status) = self.status {
            updated.status = status;
        }
        validate_fields(&updated.name, updated.target_amount, &updated.currency)?;
        Ok(updated)
    }
}

fn validate_fields(name: &str, target_amount: Decimal, currency: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::MissingField("name".to_string()));
    }
    if target_amount.is_sign_negative() && !target_amount.is_zero() {
        return Err(ValidationError::InvalidInput(format!(
            "Target amount must not be negative, got {}",
            target_amount
        )));
    }
    if currency.trim().is_empty() {
        return Err(ValidationError::MissingField("currency".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn goal() -> Goal {
        Goal {
            id: "g1".to_string(),
            name: "Emergency Fund".to_string(),
            target_amount: dec!(600),
            currency: "USD".to_string(),
            deadline: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            created_at: Utc::now(),
            status: GoalStatus::Active,
        }
    }

    #[test]
    fn test_update_changes_only_given_fields() {
        let update = GoalUpdate {
            deadline: Some(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()),
            ..GoalUpdate::default()
        };
        let updated = update.apply_to(&goal()).unwrap();
        assert_eq!(updated.deadline, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(updated.target_amount, dec!(600));
        assert_eq!(updated.name, "Emergency Fund");
    }

    #[test]
    fn test_negative_target_rejected() {
        let update = GoalUpdate {
            target_amount: Some(dec!(-1)),
            ..GoalUpdate::default()
        };
        assert!(update.apply_to(&goal()).is_err());
    }

    #[test]
    fn test_zero_target_allowed() {
        let new_goal = NewGoal {
            id: None,
            name: "Nothing".to_string(),
            target_amount: Decimal::ZERO,
            currency: "EUR".to_string(),
            deadline: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        assert!(new_goal.validate().is_ok());
    }
}
