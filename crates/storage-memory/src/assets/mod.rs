//! In-process storage for assets and the balance transaction feed.

mod repository;

pub use repository::{AssetRepository, TransactionStore};
