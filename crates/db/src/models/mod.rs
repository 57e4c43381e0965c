//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A field enum naming the filterable/sortable columns
//! - `Deserialize` DTOs for inserts and replacements

pub mod product;
