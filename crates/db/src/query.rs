//! Translation of [`Filter`] and [`OrderBy`] into PostgreSQL clauses.
//!
//! Column names come only from [`Field::column`]; every value is sent as a
//! bind parameter.

use catalog_core::filter::{Field, FieldValue, Filter};
use catalog_core::pagination::OrderBy;
use sqlx::postgres::PgArguments;
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::Postgres;

/// A `WHERE` clause with its bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFilter {
    /// Empty when there is no filter, otherwise starts with `WHERE `.
    pub clause: String,
    pub binds: Vec<FieldValue>,
    /// Index of the next free `$n` placeholder.
    pub next_idx: u32,
}

/// Build a `WHERE` clause and bind values from an optional filter.
pub fn build_where<F: Field>(filter: Option<&Filter<F>>) -> SqlFilter {
    let mut binds = Vec::new();
    let mut bind_idx = 1u32;

    let clause = match filter {
        None => String::new(),
        Some(filter) => format!(
            "WHERE {}",
            predicate(filter, &mut binds, &mut bind_idx)
        ),
    };

    SqlFilter {
        clause,
        binds,
        next_idx: bind_idx,
    }
}

fn push_bind(binds: &mut Vec<FieldValue>, bind_idx: &mut u32, value: FieldValue) -> String {
    let placeholder = format!("${bind_idx}");
    *bind_idx += 1;
    binds.push(value);
    placeholder
}

fn predicate<F: Field>(filter: &Filter<F>, binds: &mut Vec<FieldValue>, bind_idx: &mut u32) -> String {
    match filter {
        Filter::Equals { field, value } if value.is_null() => {
            format!("{} IS NULL", field.column())
        }
        Filter::Equals { field, value } => {
            let p = push_bind(binds, bind_idx, value.clone());
            format!("{} = {p}", field.column())
        }
        Filter::InSet { field, values } => {
            // NULL never equals anything, so it cannot widen the set.
            let placeholders: Vec<String> = values
                .iter()
                .filter(|v| !v.is_null())
                .map(|v| push_bind(binds, bind_idx, v.clone()))
                .collect();
            if placeholders.is_empty() {
                "FALSE".to_string()
            } else {
                format!("{} IN ({})", field.column(), placeholders.join(", "))
            }
        }
        // Keeps PostgreSQL from rejecting `uuid ILIKE text` and agrees with
        // the in-memory evaluation.
        Filter::TextMatch { field, .. } if !field.is_text() => "FALSE".to_string(),
        Filter::TextMatch { field, text } => {
            let pattern = format!("%{}%", escape_like(text));
            let p = push_bind(binds, bind_idx, FieldValue::Text(pattern));
            format!("{} ILIKE {p}", field.column())
        }
        Filter::All(parts) if parts.is_empty() => "TRUE".to_string(),
        Filter::All(parts) => parts
            .iter()
            .map(|part| format!("({})", predicate(part, binds, bind_idx)))
            .collect::<Vec<_>>()
            .join(" AND "),
    }
}

/// Escape `LIKE` metacharacters (`\`, `%`, `_`) so user text matches literally.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Build an `ORDER BY` clause. The key column is appended ascending unless the
/// caller already orders by it.
pub fn build_order_by<F: Field>(order_by: &[OrderBy<F>], key: F) -> String {
    let mut keys: Vec<String> = order_by
        .iter()
        .map(|o| format!("{} {}", o.field.column(), o.direction.as_sql()))
        .collect();

    if !order_by.iter().any(|o| o.field == key) {
        keys.push(format!("{} ASC", key.column()));
    }

    format!("ORDER BY {}", keys.join(", "))
}

/// Bind a slice of `FieldValue` to a sqlx `QueryAs`.
pub fn bind_values<'q, O>(
    mut q: QueryAs<'q, Postgres, O, PgArguments>,
    bind_values: &'q [FieldValue],
) -> QueryAs<'q, Postgres, O, PgArguments> {
    for val in bind_values {
        q = match val {
            FieldValue::Null => q.bind(None::<String>),
            FieldValue::Bool(v) => q.bind(*v),
            FieldValue::Int(v) => q.bind(*v),
            FieldValue::Float(v) => q.bind(*v),
            FieldValue::Text(v) => q.bind(v.as_str()),
            FieldValue::Uuid(v) => q.bind(*v),
            FieldValue::Timestamp(v) => q.bind(*v),
        };
    }
    q
}

/// Bind a slice of `FieldValue` to a sqlx `QueryScalar`.
pub fn bind_values_scalar<'q>(
    mut q: QueryScalar<'q, Postgres, i64, PgArguments>,
    bind_values: &'q [FieldValue],
) -> QueryScalar<'q, Postgres, i64, PgArguments> {
    for val in bind_values {
        q = match val {
            FieldValue::Null => q.bind(None::<String>),
            FieldValue::Bool(v) => q.bind(*v),
            FieldValue::Int(v) => q.bind(*v),
            FieldValue::Float(v) => q.bind(*v),
            FieldValue::Text(v) => q.bind(v.as_str()),
            FieldValue::Uuid(v) => q.bind(*v),
            FieldValue::Timestamp(v) => q.bind(*v),
        };
    }
    q
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
