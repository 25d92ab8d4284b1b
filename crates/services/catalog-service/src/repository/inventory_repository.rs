//! Inventory repository and the transactional stock adjustment.

use async_trait::async_trait;
use std::time::Duration;

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QuerySelect, Set,
};

use super::base::{fetch_page, in_transaction, read_through, resolve_sort, ListQuery, Page};
use super::entities::inventory::{self, ActiveModel, Entity as InventoryEntity};
use crate::cache::{CacheLayer, Cacheable, InventoryKey};
use common::{AppError, AppResult, OptionExt};
use domain::Inventory;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<Inventory>;

    async fn get_by_product_id(&self, product_id: i32) -> AppResult<Inventory>;

    /// Bypasses the cache; `search` is ignored
    async fn list(&self, query: &ListQuery) -> AppResult<Page<Inventory>>;

    /// Standalone zero-quantity stock row for an existing product
    async fn create(&self, product_id: i32) -> AppResult<Inventory>;

    async fn delete(&self, product_id: i32) -> AppResult<()>;

    /// Apply `delta` under an exclusive row lock.
    ///
    /// The non-negative rule is re-checked against the locked row, so a
    /// stale advisory read can never commit a negative quantity. A deadline,
    /// when set, bounds the transaction only; once it commits the call
    /// succeeds.
    async fn adjust_quantity(&self, product_id: i32, delta: i32) -> AppResult<Inventory>;
}

pub struct InventoryStore {
    db: DatabaseConnection,
    cache: CacheLayer<Inventory>,
    deadline: Option<Duration>,
}

impl InventoryStore {
    pub fn new(db: DatabaseConnection, cache: CacheLayer<Inventory>) -> Self {
        Self {
            db,
            cache,
            deadline: None,
        }
    }

    /// Bound each adjustment transaction; zero means unbounded. On expiry
    /// the transaction is dropped and rolls back.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline).filter(|d| !d.is_zero());
        self
    }

    async fn adjust_in_transaction(&self, product_id: i32, delta: i32) -> AppResult<Inventory> {
        let work = in_transaction(&self.db, move |txn| Box::pin(apply_delta(txn, product_id, delta)));

        match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, work).await.map_err(|_| {
                tracing::warn!(product_id, delta, "Quantity adjustment timed out");
                AppError::internal("Quantity adjustment timed out")
            })?,
            None => work.await,
        }
    }
}

#[async_trait]
impl InventoryRepository for InventoryStore {
    async fn get_by_id(&self, id: i32) -> AppResult<Inventory> {
        read_through(&self.cache, InventoryKey::Id(id), || async {
            let model = InventoryEntity::find_by_id(id)
                .filter(inventory::Column::DeletedAt.is_null())
                .one(&self.db)
                .await?;
            Ok(model.map(Inventory::from))
        })
        .await
    }

    async fn get_by_product_id(&self, product_id: i32) -> AppResult<Inventory> {
        read_through(&self.cache, InventoryKey::ProductId(product_id), || async {
            let model = InventoryEntity::find()
                .filter(inventory::Column::ProductId.eq(product_id))
                .filter(inventory::Column::DeletedAt.is_null())
                .one(&self.db)
                .await?;
            Ok(model.map(Inventory::from))
        })
        .await
    }

    async fn list(&self, query: &ListQuery) -> AppResult<Page<Inventory>> {
        let order = resolve_sort(
            query.sort.as_deref(),
            &[
                ("id", inventory::Column::Id),
                ("product_id", inventory::Column::ProductId),
                ("quantity", inventory::Column::Quantity),
                ("created_at", inventory::Column::CreatedAt),
                ("updated_at", inventory::Column::UpdatedAt),
            ],
            inventory::Column::CreatedAt,
            inventory::Column::Id,
        )?;

        let select = InventoryEntity::find().filter(inventory::Column::DeletedAt.is_null());
        let (models, total) = fetch_page(&self.db, select, order, query).await?;

        Ok(Page {
            items: models.into_iter().map(Inventory::from).collect(),
            total,
        })
    }

    async fn create(&self, product_id: i32) -> AppResult<Inventory> {
        let now = chrono::Utc::now();
        let model = ActiveModel {
            product_id: Set(product_id),
            quantity: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|e| AppError::from(e).label_conflict("Inventory for product"))?;
        let inventory = Inventory::from(model);

        self.cache.invalidate(&inventory.cache_keys()).await;
        tracing::info!(product_id, inventory_id = inventory.id, "Inventory created");

        Ok(inventory)
    }

    async fn delete(&self, product_id: i32) -> AppResult<()> {
        let inventory =
            in_transaction(&self.db, move |txn| Box::pin(soft_delete_locked(txn, product_id)))
                .await?;

        self.cache.invalidate(&inventory.cache_keys()).await;
        tracing::info!(product_id, "Inventory deleted");

        Ok(())
    }

    async fn adjust_quantity(&self, product_id: i32, delta: i32) -> AppResult<Inventory> {
        let started = std::time::Instant::now();

        let inventory = match self.adjust_in_transaction(product_id, delta).await {
            Ok(inventory) => inventory,
            Err(e) => {
                tracing::debug!(product_id, delta, error = %e, "Quantity adjustment rolled back");
                return Err(e);
            }
        };

        self.cache.invalidate(&inventory.cache_keys()).await;
        tracing::info!(
            product_id,
            delta,
            quantity = inventory.quantity,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Quantity adjusted"
        );

        Ok(inventory)
    }
}

/// Lock the live stock row of `product_id` for the rest of the transaction.
async fn lock_stock_row(txn: &DatabaseTransaction, product_id: i32) -> AppResult<inventory::Model> {
    InventoryEntity::find()
        .filter(inventory::Column::ProductId.eq(product_id))
        .filter(inventory::Column::DeletedAt.is_null())
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_not_found()
}

async fn apply_delta(txn: &DatabaseTransaction, product_id: i32, delta: i32) -> AppResult<Inventory> {
    let current = Inventory::from(lock_stock_row(txn, product_id).await?);

    let quantity = current.quantity_after(delta).map_err(|e| {
        tracing::debug!(
            product_id,
            delta,
            quantity = current.quantity,
            "Adjustment rejected against locked row"
        );
        AppError::from(e)
    })?;

    let now = chrono::Utc::now();
    InventoryEntity::update_many()
        .col_expr(
            inventory::Column::Quantity,
            Expr::col(inventory::Column::Quantity).add(delta),
        )
        .col_expr(inventory::Column::UpdatedAt, Expr::value(now))
        .filter(inventory::Column::Id.eq(current.id))
        .exec(txn)
        .await?;

    Ok(Inventory {
        quantity,
        updated_at: now,
        ..current
    })
}

async fn soft_delete_locked(txn: &DatabaseTransaction, product_id: i32) -> AppResult<Inventory> {
    let model = lock_stock_row(txn, product_id).await?;
    let inventory = Inventory::from(model.clone());

    let now = chrono::Utc::now();
    let mut active: ActiveModel = model.into();
    active.deleted_at = Set(Some(now));
    active.updated_at = Set(now);
    active.update(txn).await?;

    Ok(inventory)
}
