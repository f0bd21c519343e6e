//! Goalpace Core - Domain entities, services, and traits.
//!
//! This crate contains the planning and execution-tracking logic for
//! savings goals. It is storage-agnostic and defines repository traits
//! that are implemented by the `storage-memory` crate.

pub mod allocations;
pub mod assets;
pub mod constants;
pub mod contributions;
pub mod errors;
pub mod events;
pub mod execution;
pub mod flex;
pub mod fx;
pub mod goals;
pub mod planning;
pub mod requirements;
pub mod settings;
pub mod utils;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
