//! Store operations behind the product repository, and their PostgreSQL
//! implementation for the `products` table.

use async_trait::async_trait;
use catalog_core::types::EntityId;
use sqlx::PgPool;

use crate::models::product::{CreateProduct, Product, ProductField, UpdateProduct};
use crate::pagination::fetch_window;
use crate::store::{Entity, QueryableSet, StoreError, Window, WindowPage};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = <Product as Entity>::COLUMNS;

/// Raw product storage. Callers get `Option`/row counts back and decide what a
/// missing row means.
#[async_trait]
pub trait ProductStore: QueryableSet<Product> {
    async fn find_by_id(&self, id: EntityId) -> Result<Option<Product>, StoreError>;

    /// Insert a new row under `id`. A duplicate id is a constraint error.
    async fn insert(&self, id: EntityId, input: &CreateProduct) -> Result<Product, StoreError>;

    /// Insert or fully replace the row with `input.product_id`.
    async fn upsert(&self, input: &UpdateProduct) -> Result<Product, StoreError>;

    /// Delete by id, returning the number of rows removed.
    async fn delete(&self, id: EntityId) -> Result<u64, StoreError>;
}

/// Provides product storage on the `products` table.
#[derive(Debug, Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl QueryableSet<Product> for PgProductStore {
    async fn fetch_window(
        &self,
        window: Window<'_, ProductField>,
    ) -> Result<WindowPage<Product>, StoreError> {
        fetch_window(&self.pool, window).await
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn find_by_id(&self, id: EntityId) -> Result<Option<Product>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM products WHERE product_id = $1");
        let product = sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn insert(&self, id: EntityId, input: &CreateProduct) -> Result<Product, StoreError> {
        let query = format!(
            "INSERT INTO products (product_id, name, description, price)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        let product = sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.price)
            .fetch_one(&self.pool)
            .await?;
        Ok(product)
    }

    async fn upsert(&self, input: &UpdateProduct) -> Result<Product, StoreError> {
        let query = format!(
            "INSERT INTO products (product_id, name, description, price)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (product_id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                price = EXCLUDED.price,
                updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        let product = sqlx::query_as::<_, Product>(&query)
            .bind(input.product_id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.price)
            .fetch_one(&self.pool)
            .await?;
        Ok(product)
    }

    async fn delete(&self, id: EntityId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE product_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
