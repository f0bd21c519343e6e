//! Execution module - the monthly plan-and-track lifecycle.

mod execution_errors;
mod execution_model;
mod execution_service;
mod execution_traits;


pub use execution_errors::ExecutionError;
pub use execution_model::{
    CompletedExecution, CompletedGoal, ExecutionRecord, ExecutionSnapshot, ExecutionStatus,
    Recalculation, SnapshotGoal,
};
pub use execution_service::ExecutionService;
pub use execution_traits::{ExecutionRepositoryTrait, ExecutionServiceTrait};
