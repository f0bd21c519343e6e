//! In-process storage for execution records, snapshots and completed
//! executions.

mod repository;

pub use repository::ExecutionRepository;
