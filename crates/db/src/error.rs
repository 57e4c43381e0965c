use std::fmt::Display;

use catalog_core::error::CoreError;

use crate::store::StoreError;

/// Error returned by repositories and the pagination engine.
///
/// Store failures are always wrapped with the attempted operation and the
/// entity they concern.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// `NotFound` and `Validation` from the domain layer.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A write rejected by a uniqueness or foreign-key constraint.
    #[error("{operation}: constraint violation on {target}: {source}")]
    Constraint {
        operation: &'static str,
        target: String,
        #[source]
        source: StoreError,
    },

    #[error("{operation} failed for {target}: {source}")]
    Store {
        operation: &'static str,
        target: String,
        #[source]
        source: StoreError,
    },
}

impl RepoError {
    /// Wrap a store error, keeping constraint violations distinguishable.
    pub fn store(operation: &'static str, target: impl Display, source: StoreError) -> Self {
        let target = target.to_string();
        if source.is_constraint() {
            RepoError::Constraint {
                operation,
                target,
                source,
            }
        } else {
            RepoError::Store {
                operation,
                target,
                source,
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepoError::Core(CoreError::NotFound { .. }))
    }
}
