//! Cache coherence and degradation.

mod support;

use std::sync::Arc;

use catalog_service_lib::cache::{CacheBackend, MemoryCache};
use catalog_service_lib::{Catalog, ComponentHealth};
use common::config::CacheTtls;
use common::AppError;

use support::{cached_catalog, failing_cache_catalog, memory_store, seed_product, uncached_catalog};

#[tokio::test]
async fn test_reads_match_with_and_without_cache() {
    let (cached, _) = cached_catalog().await;
    let uncached = uncached_catalog().await;

    for catalog in [&cached, &uncached] {
        seed_product(catalog, "EQ-1", 3).await;
    }

    for _ in 0..2 {
        let a = cached.product_service().get_product_detail(1).await.unwrap();
        let b = uncached.product_service().get_product_detail(1).await.unwrap();

        assert_eq!(a.product.sku, b.product.sku);
        assert_eq!(a.product.name, b.product.name);
        assert_eq!(a.category.name, b.category.name);
        assert_eq!(a.inventory.quantity, b.inventory.quantity);
    }
}

#[tokio::test]
async fn test_failing_cache_never_fails_a_request() {
    let catalog = failing_cache_catalog().await;
    let detail = seed_product(&catalog, "FAIL-1", 5).await;
    let pid = detail.product.id;

    let read = catalog.product_service().get_product_detail(pid).await.unwrap();
    assert_eq!(read.inventory.quantity, 5);

    assert_eq!(catalog.stock().adjust_quantity(pid, -5).await.unwrap(), 0);
    assert!(matches!(
        catalog.stock().adjust_quantity(pid, -1).await.unwrap_err(),
        AppError::InsufficientStock
    ));

    catalog.product_service().delete_product(pid).await.unwrap();
    assert!(matches!(
        catalog.products().get_by_id(pid).await.unwrap_err(),
        AppError::NotFound
    ));
}

#[tokio::test]
async fn test_misses_are_not_cached() {
    let (catalog, cache) = cached_catalog().await;

    assert!(catalog.products().get_by_id(42).await.is_err());
    assert!(catalog.users().get_by_username("nobody").await.is_err());

    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_write_then_read_never_sees_old_value() {
    let (catalog, _) = cached_catalog().await;
    let repo = catalog.categories();
    let category = repo.create("Seat".to_string()).await.unwrap();

    for round in 0..3 {
        // Warm the cache, then overwrite
        repo.get_by_id(category.id).await.unwrap();
        let name = format!("Seat v{}", round);
        let current = repo.get_by_id(category.id).await.unwrap();
        repo.update(domain::Category {
            name: name.clone(),
            ..current
        })
        .await
        .unwrap();

        assert_eq!(repo.get_by_id(category.id).await.unwrap().name, name);
    }
}

#[tokio::test]
async fn test_zero_ttl_disables_one_entity_only() {
    let cache = Arc::new(MemoryCache::new());
    let backend: Arc<dyn CacheBackend> = cache.clone();
    let ttls = CacheTtls {
        product: 0,
        ..CacheTtls::default()
    };
    let catalog = Catalog::from_parts(memory_store().await, Some(backend), ttls);

    let detail = seed_product(&catalog, "TTL-1", 0).await;
    catalog.products().get_by_id(detail.product.id).await.unwrap();
    catalog.categories().get_by_id(detail.category.id).await.unwrap();

    assert!(!cache.contains(&format!("product:id:{}", detail.product.id)));
    assert!(cache.contains(&format!("category:id:{}", detail.category.id)));
}

#[tokio::test]
async fn test_health_reports_each_component() {
    let (healthy, _) = cached_catalog().await;
    let report = healthy.health().await;
    assert_eq!(report.store, ComponentHealth::Up);
    assert_eq!(report.cache, ComponentHealth::Up);

    let report = uncached_catalog().await.health().await;
    assert_eq!(report.cache, ComponentHealth::Disabled);
    assert!(report.is_healthy());

    let report = failing_cache_catalog().await.health().await;
    assert_eq!(report.cache, ComponentHealth::Down);
    assert!(report.is_healthy());
}
