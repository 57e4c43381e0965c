//! Store seams.
//!
//! The repository and the pagination engine talk to storage only through the
//! traits in this module. PostgreSQL implementations live next to the
//! repositories; [`crate::memory::MemoryStore`] implements the same traits in
//! memory.

use async_trait::async_trait;
use catalog_core::filter::{FieldValue, Filter, Record};
use catalog_core::pagination::OrderBy;
use sqlx::postgres::PgRow;
use sqlx::FromRow;

/// PostgreSQL SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL SQLSTATE for `foreign_key_violation`.
const FOREIGN_KEY_VIOLATION: &str = "23503";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// An error reported by a store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness or foreign-key constraint rejected a write.
    #[error("constraint `{constraint}` violated: {message}")]
    Constraint { constraint: String, message: String },

    /// A failure from a non-SQL store.
    #[error("{0}")]
    Backend(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl StoreError {
    pub fn is_constraint(&self) -> bool {
        matches!(self, StoreError::Constraint { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let code = db_err.code();
            if matches!(
                code.as_deref(),
                Some(UNIQUE_VIOLATION) | Some(FOREIGN_KEY_VIOLATION)
            ) {
                return StoreError::Constraint {
                    constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                    message: db_err.message().to_string(),
                };
            }
        }
        StoreError::Sqlx(err)
    }
}

// ---------------------------------------------------------------------------
// Entities and queryable sets
// ---------------------------------------------------------------------------

/// A record type stored in its own table.
pub trait Entity:
    Record + for<'r> FromRow<'r, PgRow> + Clone + Send + Sync + Unpin + 'static
{
    const TABLE: &'static str;

    /// Column list shared across queries.
    const COLUMNS: &'static str;

    /// Value of the key field.
    fn key(&self) -> FieldValue {
        self.field_value(Self::KEY)
    }
}

/// The part of a filtered, ordered set requested by the pagination engine.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a, F> {
    pub filter: Option<&'a Filter<F>>,
    pub order_by: &'a [OrderBy<F>],
    pub limit: i64,
    pub offset: i64,
}

/// Items of a window together with the size of the whole filtered set.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowPage<E> {
    pub total_count: i64,
    pub items: Vec<E>,
}

/// A set of entities that can be counted and windowed under one filter.
///
/// Implementations must compute `total_count` and `items` against the same
/// filtered view, order by `order_by` followed by the entity key ascending,
/// and never modify the set.
#[async_trait]
pub trait QueryableSet<E: Entity>: Send + Sync {
    async fn fetch_window(
        &self,
        window: Window<'_, E::Field>,
    ) -> Result<WindowPage<E>, StoreError>;
}
