//! Catalog and stock records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Product category. `name` is unique among live categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sellable product. `sku` is stored in canonical upper-case form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub sku: String,
    pub category_id: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for a new product. Its stock row is created alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub sku: String,
    pub category_id: i32,
}

/// Partial product update; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub sku: Option<String>,
    pub category_id: Option<i32>,
    pub is_active: Option<bool>,
}

impl ProductPatch {
    /// Apply the patch over an existing product.
    pub fn apply(self, mut product: Product) -> Product {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(sku) = self.sku {
            product.sku = sku;
        }
        if let Some(category_id) = self.category_id {
            product.category_id = category_id;
        }
        if let Some(is_active) = self.is_active {
            product.is_active = is_active;
        }
        product
    }
}

/// Stock row, one per product. `quantity` is never negative once committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Inventory {
    /// Quantity after applying `delta`.
    ///
    /// A result below zero is `InsufficientStock`; a change the stock level
    /// cannot represent is a validation error.
    pub fn quantity_after(&self, delta: i32) -> DomainResult<i32> {
        match self.quantity.checked_add(delta) {
            Some(quantity) if quantity >= 0 => Ok(quantity),
            Some(_) => Err(DomainError::InsufficientStock),
            None => Err(DomainError::validation(
                "Quantity change exceeds the maximum stock level",
            )),
        }
    }
}

/// Product read model assembled from product, category and stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub product: Product,
    pub category: Category,
    pub inventory: Inventory,
}
