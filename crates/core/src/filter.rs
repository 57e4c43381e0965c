//! Filter predicates over typed record fields.
//!
//! A [`Filter`] is a small tagged tree built by repositories. It never carries
//! raw SQL: the storage layer translates it into its native query form, and
//! [`Filter::matches`] evaluates it against in-memory records with the same
//! semantics.

use std::cmp::Ordering;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::types::{EntityId, Timestamp};

// ---------------------------------------------------------------------------
// Fields and records
// ---------------------------------------------------------------------------

/// A filterable, sortable field of a record type. Each field maps to exactly
/// one column of the backing table.
pub trait Field: Copy + Eq + Debug + Send + Sync + 'static {
    /// Column name in the backing table.
    fn column(self) -> &'static str;

    /// Whether the column holds text. [`Filter::TextMatch`] on any other
    /// field matches nothing.
    fn is_text(self) -> bool;
}

/// A record whose field values can be read for in-memory filtering and
/// ordering.
pub trait Record {
    type Field: Field;

    /// Field that uniquely identifies a record. Always used as the last
    /// ordering key so that pagination windows are stable.
    const KEY: Self::Field;

    fn field_value(&self, field: Self::Field) -> FieldValue;
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A typed value compared against a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(EntityId),
    Timestamp(Timestamp),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Total order used for in-memory sorting.
    ///
    /// `Null` sorts after every other value, matching PostgreSQL's default
    /// `NULLS LAST` for ascending order. Integers and floats compare
    /// numerically. Values of unrelated types fall back to a fixed type rank.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        use FieldValue::*;

        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Null, _) => Ordering::Greater,
            (_, Null) => Ordering::Less,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Int(a), Float(b)) => (*a as f64).total_cmp(b),
            (Float(a), Int(b)) => a.total_cmp(&(*b as f64)),
            (Text(a), Text(b)) => a.cmp(b),
            (Uuid(a), Uuid(b)) => a.cmp(b),
            (Timestamp(a), Timestamp(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            FieldValue::Bool(_) => 0,
            FieldValue::Int(_) | FieldValue::Float(_) => 1,
            FieldValue::Text(_) => 2,
            FieldValue::Uuid(_) => 3,
            FieldValue::Timestamp(_) => 4,
            FieldValue::Null => 5,
        }
    }

    /// SQL `=` semantics: a NULL on either side never compares equal.
    fn sql_eq(&self, other: &Self) -> bool {
        !self.is_null() && !other.is_null() && self.total_cmp(other) == Ordering::Equal
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<EntityId> for FieldValue {
    fn from(v: EntityId) -> Self {
        FieldValue::Uuid(v)
    }
}

impl From<Timestamp> for FieldValue {
    fn from(v: Timestamp) -> Self {
        FieldValue::Timestamp(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Null, Into::into)
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// A condition narrowing which records are counted and paginated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    rename_all = "snake_case",
    bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>")
)]
pub enum Filter<F> {
    /// `field = value`, or `field IS NULL` when `value` is `Null`.
    Equals { field: F, value: FieldValue },
    /// `field` equals one of `values`. An empty set matches nothing.
    InSet { field: F, values: Vec<FieldValue> },
    /// Case-insensitive substring match on a text field. Never matches a
    /// field whose [`Field::is_text`] is false.
    TextMatch { field: F, text: String },
    /// Conjunction. An empty list matches everything.
    All(Vec<Filter<F>>),
}

impl<F: Field> Filter<F> {
    pub fn equals(field: F, value: impl Into<FieldValue>) -> Self {
        Filter::Equals {
            field,
            value: value.into(),
        }
    }

    pub fn in_set<V: Into<FieldValue>>(field: F, values: impl IntoIterator<Item = V>) -> Self {
        Filter::InSet {
            field,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn text_match(field: F, text: impl Into<String>) -> Self {
        Filter::TextMatch {
            field,
            text: text.into(),
        }
    }

    /// Combine two filters, flattening nested conjunctions.
    pub fn and(self, other: Filter<F>) -> Self {
        let mut parts = match self {
            Filter::All(parts) => parts,
            single => vec![single],
        };
        match other {
            Filter::All(more) => parts.extend(more),
            single => parts.push(single),
        }
        Filter::All(parts)
    }

    /// Evaluate the filter against an in-memory record.
    pub fn matches<R>(&self, record: &R) -> bool
    where
        R: Record<Field = F>,
    {
        match self {
            Filter::Equals { field, value } => {
                let actual = record.field_value(*field);
                if value.is_null() {
                    actual.is_null()
                } else {
                    actual.sql_eq(value)
                }
            }
            Filter::InSet { field, values } => {
                let actual = record.field_value(*field);
                values.iter().any(|v| actual.sql_eq(v))
            }
            Filter::TextMatch { field, .. } if !field.is_text() => false,
            Filter::TextMatch { field, text } => match record.field_value(*field) {
                FieldValue::Text(actual) => actual.to_lowercase().contains(&text.to_lowercase()),
                _ => false,
            },
            Filter::All(parts) => parts.iter().all(|f| f.matches(record)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
