//! Span-per-operation decorator for product repositories.
//!
//! Each call opens a span named after the operation before any store I/O and
//! closes it when the call finishes, whether it succeeded or not. Failures are
//! logged inside the span. With no subscriber installed the spans are no-ops,
//! so tracing never affects the result of an operation.

use std::future::Future;

use async_trait::async_trait;
use catalog_core::pagination::{ListQuery, ListResult};
use catalog_core::types::EntityId;
use tracing::{Instrument, Span};

use crate::error::RepoError;
use crate::models::product::{CreateProduct, Product, ProductField, UpdateProduct};
use crate::repositories::product_repo::ProductRepository;

/// Wraps a [`ProductRepository`] in one `tracing` span per operation.
#[derive(Debug, Clone)]
pub struct TracedProductRepository<R> {
    inner: R,
}

impl<R: ProductRepository> TracedProductRepository<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

async fn traced<T, F>(span: Span, operation: F) -> Result<T, RepoError>
where
    F: Future<Output = Result<T, RepoError>>,
{
    async move {
        let result = operation.await;
        if let Err(err) = &result {
            tracing::warn!(error = %err, not_found = err.is_not_found(), "Product repository operation failed");
        }
        result
    }
    .instrument(span)
    .await
}

#[async_trait]
impl<R: ProductRepository> ProductRepository for TracedProductRepository<R> {
    async fn get_all_products(
        &self,
        query: &ListQuery<ProductField>,
    ) -> Result<ListResult<Product>, RepoError> {
        let span = tracing::info_span!(
            "product_repository.get_all_products",
            page = query.page,
            page_size = query.page_size,
        );
        traced(span, self.inner.get_all_products(query)).await
    }

    async fn search_products(
        &self,
        search_text: &str,
        query: &ListQuery<ProductField>,
    ) -> Result<ListResult<Product>, RepoError> {
        let span = tracing::info_span!(
            "product_repository.search_products",
            search_text,
            page = query.page,
            page_size = query.page_size,
        );
        traced(span, self.inner.search_products(search_text, query)).await
    }

    async fn get_product_by_id(&self, id: EntityId) -> Result<Product, RepoError> {
        let span = tracing::info_span!("product_repository.get_product_by_id", product_id = %id);
        traced(span, self.inner.get_product_by_id(id)).await
    }

    async fn create_product(&self, input: &CreateProduct) -> Result<Product, RepoError> {
        let span = tracing::info_span!(
            "product_repository.create_product",
            product_id = ?input.product_id,
            name = %input.name,
        );
        traced(span, self.inner.create_product(input)).await
    }

    async fn update_product(&self, input: &UpdateProduct) -> Result<Product, RepoError> {
        let span = tracing::info_span!(
            "product_repository.update_product",
            product_id = %input.product_id,
        );
        traced(span, self.inner.update_product(input)).await
    }

    async fn delete_product_by_id(&self, id: EntityId) -> Result<(), RepoError> {
        let span = tracing::info_span!("product_repository.delete_product_by_id", product_id = %id);
        traced(span, self.inner.delete_product_by_id(id)).await
    }
}
