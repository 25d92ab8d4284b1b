//! Shared fixtures: an in-memory SQLite store with migrations applied, and
//! cache backends for the healthy, absent and failing cases.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{ConnectOptions, Database as SeaDatabase, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use catalog_service_lib::cache::{CacheBackend, CacheError, MemoryCache};
use catalog_service_lib::infra::Migrator;
use catalog_service_lib::Catalog;
use common::config::CacheTtls;
use domain::{NewProduct, ProductDetail};

/// Fresh store. One connection, so every test gets its own database and
/// concurrent transactions queue behind each other.
pub async fn memory_store() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .sqlx_logging(false);

    let db = SeaDatabase::connect(options)
        .await
        .expect("Failed to open in-memory SQLite");
    Migrator::up(&db, None)
        .await
        .expect("Failed to apply migrations");
    db
}

/// Catalog with a healthy in-process cache; the cache handle is returned
/// so tests can inspect which keys exist.
pub async fn cached_catalog() -> (Catalog, Arc<MemoryCache>) {
    let cache = Arc::new(MemoryCache::new());
    let backend: Arc<dyn CacheBackend> = cache.clone();
    let catalog = Catalog::from_parts(memory_store().await, Some(backend), CacheTtls::default());
    (catalog, cache)
}

pub async fn uncached_catalog() -> Catalog {
    Catalog::from_parts(memory_store().await, None, CacheTtls::default())
}

pub async fn failing_cache_catalog() -> Catalog {
    let backend: Arc<dyn CacheBackend> = Arc::new(FailingCache);
    Catalog::from_parts(memory_store().await, Some(backend), CacheTtls::default())
}

/// Backend whose every call fails, as if Redis were unreachable.
pub struct FailingCache;

#[async_trait]
impl CacheBackend for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn set_ex(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn del(&self, _keys: &[String]) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

/// Healthy in-process cache whose invalidations stall, as under a slow Redis.
pub struct SlowInvalidationCache {
    inner: MemoryCache,
    delay: Duration,
}

impl SlowInvalidationCache {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryCache::new(),
            delay,
        }
    }
}

#[async_trait]
impl CacheBackend for SlowInvalidationCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.inner.get(key).await
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.inner.set_ex(key, value, ttl).await
    }

    async fn del(&self, keys: &[String]) -> Result<(), CacheError> {
        tokio::time::sleep(self.delay).await;
        self.inner.del(keys).await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.inner.ping().await
    }
}

pub fn new_product(sku: &str, category_id: i32) -> NewProduct {
    NewProduct {
        name: format!("Part {}", sku),
        description: "Spare part".to_string(),
        price: 99.5,
        sku: sku.to_string(),
        category_id,
    }
}

/// Create a category and a product in it, then stock it to `quantity`.
pub async fn seed_product(catalog: &Catalog, sku: &str, quantity: i32) -> ProductDetail {
    let category = catalog
        .category_service()
        .create_category(&format!("Category {}", sku))
        .await
        .expect("Failed to create category");

    let detail = catalog
        .product_service()
        .create_product(new_product(sku, category.id))
        .await
        .expect("Failed to create product");

    if quantity > 0 {
        catalog
            .stock()
            .adjust_quantity(detail.product.id, quantity)
            .await
            .expect("Failed to stock product");
    }

    detail
}
