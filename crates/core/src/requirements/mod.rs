//! Requirements module - per-goal monthly amount projection.

mod requirements_calculator;
mod requirements_model;

pub use requirements_calculator::{calculate_requirement, months_remaining};
pub use requirements_model::{MonthlyRequirement, RequirementParams, RequirementStatus};
