//! Pagination contract shared by every list operation.
//!
//! A [`ListQuery`] names the window (1-based `page`, `page_size`), an optional
//! [`Filter`] and ordering keys. A [`ListResult`] echoes the window back with
//! the size of the filtered set.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::filter::Filter;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// First page number.
pub const DEFAULT_PAGE: i64 = 1;

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

fn default_page() -> i64 {
    DEFAULT_PAGE
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy<F> {
    pub field: F,
    #[serde(default)]
    pub direction: SortDirection,
}

impl<F> OrderBy<F> {
    pub fn asc(field: F) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: F) -> Self {
        Self {
            field,
            direction: SortDirection::Desc,
        }
    }
}

// ---------------------------------------------------------------------------
// ListQuery
// ---------------------------------------------------------------------------

/// Input to a paginated list operation. Immutable per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))]
pub struct ListQuery<F> {
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    #[serde(default)]
    pub filter: Option<Filter<F>>,
    /// Ordering keys, applied before the record key tiebreaker.
    #[serde(default)]
    pub order_by: Vec<OrderBy<F>>,
}

impl<F> Default for ListQuery<F> {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_PAGE_SIZE)
    }
}

impl<F> ListQuery<F> {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page,
            page_size,
            filter: None,
            order_by: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: Filter<F>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_order(mut self, order: OrderBy<F>) -> Self {
        self.order_by.push(order);
        self
    }

    /// Reject malformed windows. Values are never clamped.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.page < 1 {
            return Err(CoreError::Validation(format!(
                "page must be >= 1, got {}",
                self.page
            )));
        }
        if self.page_size < 1 {
            return Err(CoreError::Validation(format!(
                "page_size must be >= 1, got {}",
                self.page_size
            )));
        }
        Ok(())
    }

    /// Row offset of the first item of the window: `(page - 1) * page_size`.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

// ---------------------------------------------------------------------------
// ListResult
// ---------------------------------------------------------------------------

/// One page of a filtered, ordered set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListResult<T> {
    pub items: Vec<T>,
    /// Size of the filtered set, independent of the window.
    pub total_count: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> ListResult<T> {
    pub fn new<F>(items: Vec<T>, total_count: i64, query: &ListQuery<F>) -> Self {
        let total_pages = if total_count <= 0 {
            0
        } else {
            total_count / query.page_size + i64::from(total_count % query.page_size != 0)
        };
        Self {
            items,
            total_count,
            page: query.page,
            page_size: query.page_size,
            total_pages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ListResult<U> {
        ListResult {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
