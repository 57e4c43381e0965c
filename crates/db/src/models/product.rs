//! Product entity model and DTOs.

use catalog_core::filter::{Field, FieldValue, Record};
use catalog_core::types::{EntityId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::store::Entity;

/// A product row from the `products` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Product {
    pub product_id: EntityId,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Filterable and sortable product columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductField {
    ProductId,
    Name,
    Description,
    Price,
    CreatedAt,
    UpdatedAt,
}

impl Field for ProductField {
    fn column(self) -> &'static str {
        match self {
            ProductField::ProductId => "product_id",
            ProductField::Name => "name",
            ProductField::Description => "description",
            ProductField::Price => "price",
            ProductField::CreatedAt => "created_at",
            ProductField::UpdatedAt => "updated_at",
        }
    }

    fn is_text(self) -> bool {
        matches!(self, ProductField::Name | ProductField::Description)
    }
}

impl Record for Product {
    type Field = ProductField;
    const KEY: ProductField = ProductField::ProductId;

    fn field_value(&self, field: ProductField) -> FieldValue {
        match field {
            ProductField::ProductId => self.product_id.into(),
            ProductField::Name => self.name.as_str().into(),
            ProductField::Description => self.description.as_deref().into(),
            ProductField::Price => self.price.into(),
            ProductField::CreatedAt => self.created_at.into(),
            ProductField::UpdatedAt => self.updated_at.into(),
        }
    }
}

impl Entity for Product {
    const TABLE: &'static str = "products";
    const COLUMNS: &'static str =
        "product_id, name, description, price, created_at, updated_at";
}

/// DTO for creating a new product.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProduct {
    /// Assigned by the repository when omitted.
    pub product_id: Option<EntityId>,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
}

/// DTO for replacing a product by id. Inserts the row if it does not exist.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProduct {
    pub product_id: EntityId,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
}
