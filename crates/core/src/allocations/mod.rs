//! Allocations module - earmarking asset balances for goals.
//!
//! Current targets live in [`AllocationTarget`]; every change to a target is
//! also appended to the allocation history, which is the only source used
//! to reconstruct what was allocated at a past instant.

mod allocations_ledger;
mod allocations_model;
mod allocations_service;
mod allocations_traits;


pub use allocations_ledger::{AllocationLedger, AllocationSeries};
pub use allocations_model::{
    split_balance, AllocationHistoryEntry, AllocationKey, AllocationSplit, AllocationTarget,
    EffectiveAllocation, RoutingDecision,
};
pub use allocations_service::AllocationService;
pub use allocations_traits::{
    AllocationHistoryRepositoryTrait, AllocationServiceTrait, AllocationTargetRepositoryTrait,
};
