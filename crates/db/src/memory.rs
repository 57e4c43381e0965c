//! In-memory store.
//!
//! [`MemoryStore`] implements [`QueryableSet`] for any [`Entity`] and
//! [`ProductStore`] for products, with the same filtering, ordering and
//! windowing semantics as the PostgreSQL implementations. It counts the calls
//! that reach it so callers can assert which store operations were issued.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use catalog_core::filter::{FieldValue, Record};
use catalog_core::pagination::{OrderBy, SortDirection};
use catalog_core::types::EntityId;
use tokio::sync::RwLock;

use crate::models::product::{CreateProduct, Product, UpdateProduct};
use crate::repositories::product_store::ProductStore;
use crate::store::{Entity, QueryableSet, StoreError, Window, WindowPage};

/// A shared, cloneable in-memory table.
pub struct MemoryStore<E> {
    rows: Arc<RwLock<Vec<E>>>,
    window_calls: Arc<AtomicUsize>,
    delete_calls: Arc<AtomicUsize>,
}

impl<E> Clone for MemoryStore<E> {
    fn clone(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
            window_calls: Arc::clone(&self.window_calls),
            delete_calls: Arc::clone(&self.delete_calls),
        }
    }
}

impl<E> Default for MemoryStore<E> {
    fn default() -> Self {
        Self {
            rows: Arc::new(RwLock::new(Vec::new())),
            window_calls: Arc::new(AtomicUsize::new(0)),
            delete_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

fn same_key(a: &FieldValue, b: &FieldValue) -> bool {
    a.total_cmp(b) == Ordering::Equal
}

impl<E: Entity> MemoryStore<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Number of window reads that reached the store.
    pub fn window_calls(&self) -> usize {
        self.window_calls.load(AtomicOrdering::SeqCst)
    }

    /// Number of delete statements that reached the store.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(AtomicOrdering::SeqCst)
    }

    pub async fn get_row(&self, key: &FieldValue) -> Option<E> {
        self.rows
            .read()
            .await
            .iter()
            .find(|row| same_key(&row.key(), key))
            .cloned()
    }

    /// Insert a row, rejecting a duplicate key like a primary key constraint.
    pub async fn insert_row(&self, entity: E) -> Result<E, StoreError> {
        let mut rows = self.rows.write().await;
        let key = entity.key();
        if rows.iter().any(|row| same_key(&row.key(), &key)) {
            return Err(StoreError::Constraint {
                constraint: format!("{}_pkey", E::TABLE),
                message: format!("duplicate key value {key:?}"),
            });
        }
        rows.push(entity.clone());
        Ok(entity)
    }

    /// Replace the row with the same key as the one `build` returns, or insert
    /// it. `build` sees the current row under the write lock.
    pub async fn upsert_row(&self, key: &FieldValue, build: impl FnOnce(Option<&E>) -> E) -> E {
        let mut rows = self.rows.write().await;
        match rows.iter().position(|row| same_key(&row.key(), key)) {
            Some(idx) => {
                let entity = build(Some(&rows[idx]));
                rows[idx] = entity.clone();
                entity
            }
            None => {
                let entity = build(None);
                rows.push(entity.clone());
                entity
            }
        }
    }

    /// Delete by key, returning the number of rows removed.
    pub async fn remove_row(&self, key: &FieldValue) -> u64 {
        self.delete_calls.fetch_add(1, AtomicOrdering::SeqCst);
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|row| !same_key(&row.key(), key));
        (before - rows.len()) as u64
    }
}

fn compare<E: Record>(a: &E, b: &E, order_by: &[OrderBy<E::Field>]) -> Ordering {
    for order in order_by {
        let ord = a
            .field_value(order.field)
            .total_cmp(&b.field_value(order.field));
        let ord = match order.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.field_value(E::KEY).total_cmp(&b.field_value(E::KEY))
}

#[async_trait]
impl<E: Entity> QueryableSet<E> for MemoryStore<E> {
    async fn fetch_window(
        &self,
        window: Window<'_, E::Field>,
    ) -> Result<WindowPage<E>, StoreError> {
        self.window_calls.fetch_add(1, AtomicOrdering::SeqCst);
        let rows = self.rows.read().await;

        let mut matching: Vec<&E> = rows
            .iter()
            .filter(|row| window.filter.map_or(true, |f| f.matches(*row)))
            .collect();
        matching.sort_by(|a, b| compare(*a, *b, window.order_by));

        let total_count = matching.len() as i64;
        let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(window.limit).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok(WindowPage { total_count, items })
    }
}

#[async_trait]
impl ProductStore for MemoryStore<Product> {
    async fn find_by_id(&self, id: EntityId) -> Result<Option<Product>, StoreError> {
        Ok(self.get_row(&id.into()).await)
    }

    async fn insert(&self, id: EntityId, input: &CreateProduct) -> Result<Product, StoreError> {
        let now = chrono::Utc::now();
        self.insert_row(Product {
            product_id: id,
            name: input.name.clone(),
            description: input.description.clone(),
            price: input.price,
            created_at: now,
            updated_at: now,
        })
        .await
    }

    async fn upsert(&self, input: &UpdateProduct) -> Result<Product, StoreError> {
        let now = chrono::Utc::now();
        let product = self
            .upsert_row(&input.product_id.into(), |existing| Product {
                product_id: input.product_id,
                name: input.name.clone(),
                description: input.description.clone(),
                price: input.price,
                created_at: existing.map_or(now, |p| p.created_at),
                updated_at: now,
            })
            .await;
        Ok(product)
    }

    async fn delete(&self, id: EntityId) -> Result<u64, StoreError> {
        Ok(self.remove_row(&id.into()).await)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
