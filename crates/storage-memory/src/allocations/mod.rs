//! In-process storage for allocation targets and the append-only
//! allocation history.

mod repository;

pub use repository::{AllocationHistoryRepository, AllocationTargetRepository};
