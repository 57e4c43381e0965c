//! Domain types shared by the catalog store crates.
//!
//! Nothing in here performs I/O: the pagination contract, the filter
//! predicate, search-text handling and the error taxonomy live here so the
//! storage layer and any calling layer agree on them.

pub mod error;
pub mod filter;
pub mod pagination;
pub mod search;
pub mod types;
