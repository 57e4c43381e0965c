//! Repository layer.
//!
//! [`ProductRepository`] is the interface callers use. [`ProductRepo`] holds the
//! repository logic over any [`ProductStore`], and
//! [`TracedProductRepository`] wraps any repository in one span per operation.

pub mod product_repo;
pub mod product_store;
pub mod traced;

pub use product_repo::{ProductRepo, ProductRepository};
pub use product_store::{PgProductStore, ProductStore};
pub use traced::TracedProductRepository;

/// The production stack: traced repository logic over PostgreSQL.
pub type PgProductRepository = TracedProductRepository<ProductRepo<PgProductStore>>;

/// Build the production product repository on top of a pool.
pub fn pg_product_repository(pool: sqlx::PgPool) -> PgProductRepository {
    TracedProductRepository::new(ProductRepo::new(PgProductStore::new(pool)))
}
