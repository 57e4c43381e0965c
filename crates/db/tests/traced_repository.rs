//! Span-per-operation behaviour of the traced product repository.

use std::sync::{Arc, Mutex};

use catalog_core::pagination::ListQuery;
use catalog_db::memory::MemoryStore;
use catalog_db::models::product::{CreateProduct, Product};
use catalog_db::repositories::{ProductRepo, ProductRepository, TracedProductRepository};
use tracing::span::{Attributes, Id};
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Spans {
    opened: Vec<String>,
    closed: Vec<String>,
}

/// Records the names of spans as they open and close.
#[derive(Clone, Default)]
struct SpanRecorder {
    spans: Arc<Mutex<Spans>>,
}

impl SpanRecorder {
    fn opened(&self) -> Vec<String> {
        self.spans.lock().unwrap().opened.clone()
    }

    fn closed(&self) -> Vec<String> {
        self.spans.lock().unwrap().closed.clone()
    }
}

impl<S> Layer<S> for SpanRecorder
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        self.spans
            .lock()
            .unwrap()
            .opened
            .push(attrs.metadata().name().to_string());
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(&id) {
            self.spans
                .lock()
                .unwrap()
                .closed
                .push(span.name().to_string());
        }
    }
}

fn traced_repo() -> TracedProductRepository<ProductRepo<MemoryStore<Product>>> {
    TracedProductRepository::new(ProductRepo::new(MemoryStore::new()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_operations_open_and_close_one_span_each() {
    let recorder = SpanRecorder::default();
    let subscriber = tracing_subscriber::registry().with(recorder.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let repo = traced_repo();
    let created = repo
        .create_product(&CreateProduct {
            product_id: None,
            name: "Widget".into(),
            description: None,
            price: 1.0,
        })
        .await
        .unwrap();
    repo.get_all_products(&ListQuery::new(1, 10)).await.unwrap();
    repo.get_product_by_id(created.product_id).await.unwrap();

    let expected = vec![
        "product_repository.create_product",
        "product_repository.get_all_products",
        "product_repository.get_product_by_id",
    ];
    assert_eq!(recorder.opened(), expected);
    assert_eq!(recorder.closed(), expected);
}

#[tokio::test]
async fn failed_operations_still_close_their_span() {
    let recorder = SpanRecorder::default();
    let subscriber = tracing_subscriber::registry().with(recorder.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let repo = traced_repo();
    let err = repo.delete_product_by_id(Uuid::now_v7()).await.unwrap_err();
    assert!(err.is_not_found());

    let search = repo.search_products("Widget", &ListQuery::new(0, 10)).await;
    assert!(search.is_err());

    let expected = vec![
        "product_repository.delete_product_by_id",
        "product_repository.search_products",
    ];
    assert_eq!(recorder.opened(), expected);
    assert_eq!(recorder.closed(), expected);
}

#[tokio::test]
async fn results_are_identical_without_a_subscriber() {
    let repo = traced_repo();
    let created = repo
        .create_product(&CreateProduct {
            product_id: None,
            name: "Gadget".into(),
            description: Some("plain".into()),
            price: 2.0,
        })
        .await
        .unwrap();

    assert_eq!(
        repo.get_product_by_id(created.product_id).await.unwrap(),
        created
    );
    assert_eq!(
        repo.inner().store().len().await,
        1
    );
}
