//! Assets module - balance-holding units and their transaction feed.

mod assets_model;
mod assets_traits;

pub use assets_model::{balance_at, Asset, AssetKind, Transaction};
pub use assets_traits::{AssetRepositoryTrait, TransactionSourceTrait};
