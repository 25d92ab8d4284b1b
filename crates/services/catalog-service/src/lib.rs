//! Catalog Service Library
//!
//! Data-access core for a point-of-sale catalog: categories, products,
//! stock and accounts, each served through a read-through cache over a
//! relational store. [`Catalog`] is the composition root; it owns the store
//! handle and one cache layer per record type, and hands them to the
//! repositories and services it builds.

pub mod cache;
pub mod config;
pub mod infra;
pub mod repository;
pub mod service;

use std::sync::Arc;
use std::time::Duration;

use common::config::CacheTtls;
use common::AppResult;
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::cache::{CacheBackend, CacheLayer, RedisCache};
use crate::config::CatalogConfig;
use crate::infra::Database;
use crate::repository::{
    CategoryRepository, CategoryStore, InventoryRepository, InventoryStore, ProductRepository,
    ProductStore, UserRepository, UserStore,
};
use crate::service::{
    AccountManager, AccountService, CategoryManager, CategoryService, ProductManager,
    ProductService, StockController, StockService,
};

/// Composition root wiring store, caches, repositories and services.
#[derive(Clone)]
pub struct Catalog {
    db: Database,
    cache: Option<Arc<dyn CacheBackend>>,
    ttls: CacheTtls,
    categories: Arc<dyn CategoryRepository>,
    products: Arc<dyn ProductRepository>,
    inventories: Arc<dyn InventoryRepository>,
    users: Arc<dyn UserRepository>,
    stock: Arc<dyn StockService>,
}

impl Catalog {
    /// Connect to the store (running pending migrations) and, when
    /// configured, to Redis. An unreachable Redis leaves the cache disabled.
    pub async fn connect(config: &CatalogConfig) -> AppResult<Self> {
        let db = Database::connect(&config.database).await?;

        let backend: Option<Arc<dyn CacheBackend>> = match config.cache.url.as_deref() {
            Some(url) if config.cache.is_enabled() => match RedisCache::connect(url).await {
                Ok(redis) => Some(Arc::new(redis) as Arc<dyn CacheBackend>),
                Err(e) => {
                    tracing::warn!(error = %e, "Redis unavailable, running without cache");
                    None
                }
            },
            _ => {
                info!("No cache configured, running store-only");
                None
            }
        };

        let catalog = Self::from_parts(db.get_connection(), backend, config.cache.ttls)
            .with_operation_timeout(config.operation_timeout);
        Ok(catalog)
    }

    /// Wire everything over an existing connection and optional backend.
    pub fn from_parts(
        db: DatabaseConnection,
        cache: Option<Arc<dyn CacheBackend>>,
        ttls: CacheTtls,
    ) -> Self {
        let categories: Arc<dyn CategoryRepository> = Arc::new(CategoryStore::new(
            db.clone(),
            CacheLayer::new(cache.clone(), ttls.category),
        ));
        let products: Arc<dyn ProductRepository> = Arc::new(ProductStore::new(
            db.clone(),
            CacheLayer::new(cache.clone(), ttls.product),
            CacheLayer::new(cache.clone(), ttls.inventory),
        ));
        let inventories: Arc<dyn InventoryRepository> = Arc::new(InventoryStore::new(
            db.clone(),
            CacheLayer::new(cache.clone(), ttls.inventory),
        ));
        let users: Arc<dyn UserRepository> = Arc::new(UserStore::new(
            db.clone(),
            CacheLayer::new(cache.clone(), ttls.user),
        ));
        let stock: Arc<dyn StockService> = Arc::new(StockController::new(inventories.clone()));

        Self {
            db: Database::from_connection(db),
            cache,
            ttls,
            categories,
            products,
            inventories,
            users,
            stock,
        }
    }

    /// Bound each stock adjustment transaction; zero means unbounded.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        let inventories = InventoryStore::new(
            self.db.get_connection(),
            CacheLayer::new(self.cache.clone(), self.ttls.inventory),
        )
        .with_deadline(timeout);

        self.inventories = Arc::new(inventories);
        self.stock = Arc::new(StockController::new(self.inventories.clone()));
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    // =========================================================================
    // Repositories
    // =========================================================================

    pub fn categories(&self) -> Arc<dyn CategoryRepository> {
        self.categories.clone()
    }

    pub fn products(&self) -> Arc<dyn ProductRepository> {
        self.products.clone()
    }

    pub fn inventories(&self) -> Arc<dyn InventoryRepository> {
        self.inventories.clone()
    }

    pub fn users(&self) -> Arc<dyn UserRepository> {
        self.users.clone()
    }

    // =========================================================================
    // Services
    // =========================================================================

    pub fn category_service(&self) -> Arc<dyn CategoryService> {
        Arc::new(CategoryManager::new(self.categories.clone()))
    }

    pub fn product_service(&self) -> Arc<dyn ProductService> {
        Arc::new(ProductManager::new(
            self.products.clone(),
            self.categories.clone(),
            self.inventories.clone(),
        ))
    }

    pub fn stock(&self) -> Arc<dyn StockService> {
        self.stock.clone()
    }

    pub fn account_service(&self) -> Arc<dyn AccountService> {
        Arc::new(AccountManager::new(self.users.clone()))
    }

    /// Probe the store and, if configured, the cache.
    pub async fn health(&self) -> HealthReport {
        let store = match self.db.ping().await {
            Ok(()) => ComponentHealth::Up,
            Err(e) => {
                tracing::error!(error = %e, "Store health check failed");
                ComponentHealth::Down
            }
        };

        let cache = match &self.cache {
            None => ComponentHealth::Disabled,
            Some(backend) => match backend.ping().await {
                Ok(()) => ComponentHealth::Up,
                Err(e) => {
                    tracing::warn!(error = %e, "Cache health check failed");
                    ComponentHealth::Down
                }
            },
        };

        HealthReport { store, cache }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentHealth {
    Up,
    Down,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthReport {
    pub store: ComponentHealth,
    pub cache: ComponentHealth,
}

impl HealthReport {
    /// A failing cache degrades service but does not make it unhealthy.
    pub fn is_healthy(&self) -> bool {
        self.store == ComponentHealth::Up
    }
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(action: MigrateAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = CatalogConfig::from_env();
    let db = Database::connect_without_migrations(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}
