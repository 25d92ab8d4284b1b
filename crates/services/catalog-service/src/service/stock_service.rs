//! Stock controller - the quantity adjustment workflow.
//!
//! A cache-aware read feeds an advisory check that rejects obviously
//! impossible consumptions without opening a transaction. The repository
//! then applies the change under a row lock and re-checks the locked row,
//! so the advisory read may be stale without risking a negative quantity.

use async_trait::async_trait;
use std::sync::Arc;

use common::{AppError, AppResult};
use domain::Inventory;

use crate::repository::{InventoryRepository, ListQuery, Page};

#[async_trait]
pub trait StockService: Send + Sync {
    /// Apply a signed delta (positive restocks, negative consumes) and
    /// return the committed quantity.
    async fn adjust_quantity(&self, product_id: i32, delta: i32) -> AppResult<i32>;

    async fn get_inventory(&self, id: i32) -> AppResult<Inventory>;

    async fn get_inventory_by_product(&self, product_id: i32) -> AppResult<Inventory>;

    async fn list_inventories(&self, query: &ListQuery) -> AppResult<Page<Inventory>>;
}

pub struct StockController {
    repo: Arc<dyn InventoryRepository>,
}

impl StockController {
    pub fn new(repo: Arc<dyn InventoryRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl StockService for StockController {
    async fn adjust_quantity(&self, product_id: i32, delta: i32) -> AppResult<i32> {
        if delta == 0 {
            return Err(AppError::invalid_input("Quantity change must not be zero"));
        }

        let current = self.repo.get_by_product_id(product_id).await?;

        if let Err(e) = current.quantity_after(delta) {
            tracing::debug!(
                product_id,
                delta,
                quantity = current.quantity,
                "Adjustment rejected by advisory check"
            );
            return Err(e.into());
        }

        let updated = self.repo.adjust_quantity(product_id, delta).await?;
        Ok(updated.quantity)
    }

    async fn get_inventory(&self, id: i32) -> AppResult<Inventory> {
        self.repo.get_by_id(id).await
    }

    async fn get_inventory_by_product(&self, product_id: i32) -> AppResult<Inventory> {
        self.repo.get_by_product_id(product_id).await
    }

    async fn list_inventories(&self, query: &ListQuery) -> AppResult<Page<Inventory>> {
        self.repo.list(query).await
    }
}
