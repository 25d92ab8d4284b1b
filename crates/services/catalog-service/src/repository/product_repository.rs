//! Product repository.
//!
//! A product and its stock row are created together and removed together,
//! each pair inside one transaction.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QuerySelect, Set,
};

use super::base::{
    contains_ci, fetch_page, in_transaction, read_through, resolve_sort, ListQuery, Page,
};
use super::entities::inventory;
use super::entities::product::{self, ActiveModel, Entity as ProductEntity};
use crate::cache::{CacheLayer, Cacheable, InventoryKey, ProductKey};
use common::{AppError, AppResult, OptionExt};
use domain::{Inventory, NewProduct, Product};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<Product>;

    /// Lookup by canonical (upper-case) SKU
    async fn get_by_sku(&self, sku: &str) -> AppResult<Product>;

    /// Filter by name or SKU; bypasses the cache
    async fn list(&self, query: &ListQuery) -> AppResult<Page<Product>>;

    /// Insert the product and its zero-quantity stock row atomically
    async fn create(&self, new: NewProduct) -> AppResult<(Product, Inventory)>;

    async fn update(&self, product: Product) -> AppResult<Product>;

    /// Soft delete the product and its stock row atomically
    async fn delete(&self, id: i32) -> AppResult<()>;
}

pub struct ProductStore {
    db: DatabaseConnection,
    cache: CacheLayer<Product>,
    inventory_cache: CacheLayer<Inventory>,
}

impl ProductStore {
    pub fn new(
        db: DatabaseConnection,
        cache: CacheLayer<Product>,
        inventory_cache: CacheLayer<Inventory>,
    ) -> Self {
        Self {
            db,
            cache,
            inventory_cache,
        }
    }

    async fn find_live(&self, id: i32) -> AppResult<Option<product::Model>> {
        let model = ProductEntity::find_by_id(id)
            .filter(product::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;
        Ok(model)
    }
}

#[async_trait]
impl ProductRepository for ProductStore {
    async fn get_by_id(&self, id: i32) -> AppResult<Product> {
        read_through(&self.cache, ProductKey::Id(id), || async {
            Ok(self.find_live(id).await?.map(Product::from))
        })
        .await
    }

    async fn get_by_sku(&self, sku: &str) -> AppResult<Product> {
        let key = ProductKey::Sku(sku.to_string());
        if let Some(hit) = self.cache.lookup(&key).await {
            tracing::debug!(sku = %sku, "Cache hit");
            return Ok(hit);
        }

        let product: Product = ProductEntity::find()
            .filter(product::Column::Sku.eq(sku))
            .filter(product::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or_not_found()?
            .into();

        // A by-SKU load also warms the by-id entry
        self.cache.store(&key, &product).await;
        self.cache.store(&ProductKey::Id(product.id), &product).await;
        tracing::debug!(product_id = product.id, sku = %sku, "Loaded from store");

        Ok(product)
    }

    async fn list(&self, query: &ListQuery) -> AppResult<Page<Product>> {
        let order = resolve_sort(
            query.sort.as_deref(),
            &[
                ("id", product::Column::Id),
                ("name", product::Column::Name),
                ("sku", product::Column::Sku),
                ("price", product::Column::Price),
                ("created_at", product::Column::CreatedAt),
                ("updated_at", product::Column::UpdatedAt),
            ],
            product::Column::CreatedAt,
            product::Column::Id,
        )?;

        let mut select = ProductEntity::find().filter(product::Column::DeletedAt.is_null());
        if let Some(term) = query.search_term() {
            select = select.filter(
                Condition::any()
                    .add(contains_ci(product::Column::Name, term))
                    .add(contains_ci(product::Column::Sku, term)),
            );
        }

        let (models, total) = fetch_page(&self.db, select, order, query).await?;
        tracing::debug!(total, returned = models.len(), "Listed products");

        Ok(Page {
            items: models.into_iter().map(Product::from).collect(),
            total,
        })
    }

    async fn create(&self, new: NewProduct) -> AppResult<(Product, Inventory)> {
        let (product, inventory) =
            in_transaction(&self.db, move |txn| Box::pin(insert_with_stock(txn, new))).await?;

        self.cache.invalidate(&product.cache_keys()).await;
        self.inventory_cache.invalidate(&inventory.cache_keys()).await;
        tracing::info!(product_id = product.id, sku = %product.sku, "Product created");

        Ok((product, inventory))
    }

    async fn update(&self, product: Product) -> AppResult<Product> {
        let existing = self.find_live(product.id).await?.ok_or_not_found()?;
        let previous_sku = existing.sku.clone();

        let mut active: ActiveModel = existing.into();
        active.name = Set(product.name);
        active.description = Set(product.description);
        active.price = Set(product.price);
        active.sku = Set(product.sku);
        active.category_id = Set(product.category_id);
        active.is_active = Set(product.is_active);
        active.updated_at = Set(chrono::Utc::now());

        let model = active
            .update(&self.db)
            .await
            .map_err(|e| AppError::from(e).label_conflict("SKU"))?;
        let updated = Product::from(model);

        let mut keys = updated.cache_keys();
        if previous_sku != updated.sku {
            keys.push(ProductKey::Sku(previous_sku));
        }
        self.cache.invalidate(&keys).await;
        tracing::info!(product_id = updated.id, "Product updated");

        Ok(updated)
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let (product, inventory) =
            in_transaction(&self.db, move |txn| Box::pin(soft_delete_with_stock(txn, id))).await?;

        self.cache.invalidate(&product.cache_keys()).await;
        let inventory_keys = match inventory {
            Some(inventory) => inventory.cache_keys(),
            None => vec![InventoryKey::ProductId(id)],
        };
        self.inventory_cache.invalidate(&inventory_keys).await;
        tracing::info!(product_id = id, "Product deleted");

        Ok(())
    }
}

async fn insert_with_stock(
    txn: &DatabaseTransaction,
    new: NewProduct,
) -> AppResult<(Product, Inventory)> {
    let now = chrono::Utc::now();

    let product = ActiveModel {
        name: Set(new.name),
        description: Set(new.description),
        price: Set(new.price),
        sku: Set(new.sku),
        category_id: Set(new.category_id),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(txn)
    .await
    .map_err(|e| AppError::from(e).label_conflict("SKU"))?;

    let inventory = inventory::ActiveModel {
        product_id: Set(product.id),
        quantity: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    Ok((Product::from(product), Inventory::from(inventory)))
}

/// Soft delete a product, then lock and soft delete its stock row.
///
/// The lock makes this wait for any in-flight quantity adjustment.
async fn soft_delete_with_stock(
    txn: &DatabaseTransaction,
    id: i32,
) -> AppResult<(Product, Option<Inventory>)> {
    let now = chrono::Utc::now();

    let existing = ProductEntity::find_by_id(id)
        .filter(product::Column::DeletedAt.is_null())
        .one(txn)
        .await?
        .ok_or_not_found()?;
    let product = Product::from(existing.clone());

    let mut active: ActiveModel = existing.into();
    active.deleted_at = Set(Some(now));
    active.updated_at = Set(now);
    active.update(txn).await?;

    let stock = inventory::Entity::find()
        .filter(inventory::Column::ProductId.eq(id))
        .filter(inventory::Column::DeletedAt.is_null())
        .lock_exclusive()
        .one(txn)
        .await?;

    let inventory = match stock {
        Some(model) => {
            let inventory = Inventory::from(model.clone());
            let mut active: inventory::ActiveModel = model.into();
            active.deleted_at = Set(Some(now));
            active.updated_at = Set(now);
            active.update(txn).await?;
            Some(inventory)
        }
        None => {
            tracing::warn!(product_id = id, "Deleted product had no stock row");
            None
        }
    };

    Ok((product, inventory))
}
