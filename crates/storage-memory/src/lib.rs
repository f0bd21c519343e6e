//! In-process storage implementation for Goalpace.
//!
//! This crate implements the repository traits defined in `goalpace-core`
//! on top of locked in-memory tables. It is the persistence layer used by
//! embedders that do not bring their own, and by the end-to-end tests.
//!
//! ```text
//!      core (domain, services, traits)
//!                  │
//!                  ▼
//!      storage-memory (this crate)
//! ```
//!
//! - `ExecutionRepository` keeps all execution tables behind one lock and
//!   refuses a second non-closed record per month at write time.
//! - `AllocationHistoryRepository` serializes appends per (asset, goal).

pub mod allocations;
pub mod assets;
pub mod errors;
pub mod execution;
pub mod fx;
pub mod goals;
pub mod settings;

pub use allocations::{AllocationHistoryRepository, AllocationTargetRepository};
pub use assets::{AssetRepository, TransactionStore};
pub use errors::{IntoCore, StorageError};
pub use execution::ExecutionRepository;
pub use fx::ManualRateSource;
pub use goals::{FlexPreferenceRepository, GoalRepository};
pub use settings::SettingsRepository;

// Re-export from goalpace-core for convenience
pub use goalpace_core::errors::{Error, Result};
