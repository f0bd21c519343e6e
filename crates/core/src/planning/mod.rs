//! Planning module - the live plan of a month.
//!
//! Combines goal requirements, current allocation totals and the flex
//! preferences into the amounts a month should receive.

mod planning_model;
mod planning_service;

pub use planning_model::{MonthlyPlan, PlanSummary, RequirementSet};
pub use planning_service::{PlanningService, PlanningServiceTrait};
