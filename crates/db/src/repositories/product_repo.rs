//! Product repository.

use async_trait::async_trait;
use catalog_core::error::CoreError;
use catalog_core::filter::Filter;
use catalog_core::pagination::{ListQuery, ListResult};
use catalog_core::search::tokenize;
use catalog_core::types::EntityId;
use uuid::Uuid;

use crate::error::RepoError;
use crate::models::product::{CreateProduct, Product, ProductField, UpdateProduct};
use crate::pagination::paginate;
use crate::repositories::product_store::ProductStore;

const ENTITY: &str = "product";

/// Product operations exposed to callers.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// One page of products under the query's filter and ordering.
    async fn get_all_products(
        &self,
        query: &ListQuery<ProductField>,
    ) -> Result<ListResult<Product>, RepoError>;

    /// One page of products whose name is one of the tokens in `search_text`
    /// or the whole trimmed text, so "Widget Pro" finds both "Widget" and
    /// "Widget Pro".
    ///
    /// Text with no usable tokens (empty, whitespace, punctuation) does not
    /// filter at all and returns the same page as [`get_all_products`].
    ///
    /// [`get_all_products`]: ProductRepository::get_all_products
    async fn search_products(
        &self,
        search_text: &str,
        query: &ListQuery<ProductField>,
    ) -> Result<ListResult<Product>, RepoError>;

    /// Fails with `NotFound` when no product has this id.
    async fn get_product_by_id(&self, id: EntityId) -> Result<Product, RepoError>;

    /// Persist a new product. A missing id is assigned (UUIDv7).
    async fn create_product(&self, input: &CreateProduct) -> Result<Product, RepoError>;

    /// Insert or fully replace the product with `input.product_id`.
    async fn update_product(&self, input: &UpdateProduct) -> Result<Product, RepoError>;

    /// Fails with `NotFound`, without issuing a delete, when no product has
    /// this id. Also `NotFound` when the row is gone by the time the delete
    /// runs.
    async fn delete_product_by_id(&self, id: EntityId) -> Result<(), RepoError>;
}

/// Repository logic over a [`ProductStore`]. Holds no cache.
#[derive(Debug, Clone)]
pub struct ProductRepo<S> {
    store: S,
}

impl<S: ProductStore> ProductRepo<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Conjoin a name-in-tokens-or-phrase predicate with whatever filter `query`
/// carries.
fn with_search_filter(
    search_text: &str,
    query: &ListQuery<ProductField>,
) -> ListQuery<ProductField> {
    let mut query = query.clone();
    let mut tokens = tokenize(search_text);
    if tokens.is_empty() {
        return query;
    }
    // Names with spaces or edge punctuation only match the whole phrase.
    let phrase = search_text.trim();
    if !tokens.iter().any(|t| t == phrase) {
        tokens.push(phrase.to_string());
    }

    let by_name = Filter::in_set(ProductField::Name, tokens);
    query.filter = Some(match query.filter.take() {
        Some(existing) => existing.and(by_name),
        None => by_name,
    });
    query
}

#[async_trait]
impl<S: ProductStore> ProductRepository for ProductRepo<S> {
    async fn get_all_products(
        &self,
        query: &ListQuery<ProductField>,
    ) -> Result<ListResult<Product>, RepoError> {
        paginate::<Product, _>(query, &self.store).await
    }

    async fn search_products(
        &self,
        search_text: &str,
        query: &ListQuery<ProductField>,
    ) -> Result<ListResult<Product>, RepoError> {
        let query = with_search_filter(search_text, query);
        paginate::<Product, _>(&query, &self.store).await
    }

    async fn get_product_by_id(&self, id: EntityId) -> Result<Product, RepoError> {
        self.store
            .find_by_id(id)
            .await
            .map_err(|e| RepoError::store("get_product_by_id", format!("{ENTITY} {id}"), e))?
            .ok_or_else(|| CoreError::not_found(ENTITY, id).into())
    }

    async fn create_product(&self, input: &CreateProduct) -> Result<Product, RepoError> {
        let id = input.product_id.unwrap_or_else(Uuid::now_v7);
        self.store
            .insert(id, input)
            .await
            .map_err(|e| RepoError::store("create_product", format!("{ENTITY} {id}"), e))
    }

    async fn update_product(&self, input: &UpdateProduct) -> Result<Product, RepoError> {
        let id = input.product_id;
        self.store
            .upsert(input)
            .await
            .map_err(|e| RepoError::store("update_product", format!("{ENTITY} {id}"), e))
    }

    async fn delete_product_by_id(&self, id: EntityId) -> Result<(), RepoError> {
        // Existence check first so a missing id is a NotFound, not "0 rows".
        self.get_product_by_id(id).await?;

        let deleted = self
            .store
            .delete(id)
            .await
            .map_err(|e| RepoError::store("delete_product_by_id", format!("{ENTITY} {id}"), e))?;
        // Removed by a concurrent caller after the check above.
        if deleted == 0 {
            return Err(CoreError::not_found(ENTITY, id).into());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
