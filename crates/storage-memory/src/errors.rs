//! Storage-specific error types for the in-process stores.
//!
//! Internal failures are converted to the storage-agnostic error types
//! defined in `goalpace_core` before being returned to callers.

use std::sync::PoisonError;

use goalpace_core::errors::{Error, StorageError as CoreStorageError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Lock poisoned while accessing {0}")]
    Poisoned(&'static str),

    #[error("{table} record not found: {id}")]
    NotFound { table: &'static str, id: String },

    #[error("{table} record already exists: {id}")]
    Duplicate { table: &'static str, id: String },
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Poisoned(_) => {
                Error::Storage(CoreStorageError::LockPoisoned(err.to_string()))
            }
            StorageError::NotFound { .. } => {
                Error::Storage(CoreStorageError::NotFound(err.to_string()))
            }
            StorageError::Duplicate { .. } => {
                Error::Storage(CoreStorageError::UniqueViolation(err.to_string()))
            }
        }
    }
}

/// Extension trait turning a poisoned lock into a core error.
///
/// Provides `.into_core(table)` on any `LockResult`.
pub trait IntoCore<T> {
    fn into_core(self, table: &'static str) -> goalpace_core::Result<T>;
}

impl<T, G> IntoCore<T> for std::result::Result<T, PoisonError<G>> {
    fn into_core(self, table: &'static str) -> goalpace_core::Result<T> {
        self.map_err(|_| StorageError::Poisoned(table).into())
    }
}

pub(crate) fn not_found(table: &'static str, id: impl Into<String>) -> Error {
    StorageError::NotFound {
        table,
        id: id.into(),
    }
    .into()
}

pub(crate) fn duplicate(table: &'static str, id: impl Into<String>) -> Error {
    StorageError::Duplicate {
        table,
        id: id.into(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_not_found_maps_to_core_not_found() {
        let err = not_found("goals", "g-1");
        assert!(matches!(err, Error::Storage(CoreStorageError::NotFound(_))));
        assert!(err.to_string().contains("goals record not found: g-1"));
    }

    #[test]
    fn test_poisoned_lock_maps_to_core_error() {
        let lock = Arc::new(Mutex::new(0));
        let poisoner = lock.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison");
        })
        .join();
        let err = lock.lock().into_core("goals").unwrap_err();
        assert!(matches!(err, Error::Storage(CoreStorageError::LockPoisoned(_))));
    }
}
