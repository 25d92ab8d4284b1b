//! Read-through cache layer.
//!
//! One [`CacheLayer`] per record type, each with its own TTL fixed at
//! construction. The layer never fails a request: callers go through
//! [`CacheLayer::lookup`], [`CacheLayer::store`] and
//! [`CacheLayer::invalidate`], which log faults and degrade to a miss.

mod keys;
mod memory;
mod redis;

use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

pub use self::keys::{CacheKey, Cacheable, CategoryKey, InventoryKey, ProductKey, UserKey};
pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;

/// Cache faults. These never leave a repository.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache transport error: {0}")]
    Transport(#[from] ::redis::RedisError),

    #[error("Cache payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

/// Byte-level key-value backend shared by every cache layer.
///
/// A miss is `Ok(None)`; only transport failures are errors.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Plain overwrite with expiry; no compare-and-swap.
    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    async fn del(&self, keys: &[String]) -> Result<(), CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;
}

/// Typed cache for one record type.
pub struct CacheLayer<T: Cacheable> {
    backend: Option<Arc<dyn CacheBackend>>,
    ttl: Duration,
    _record: PhantomData<fn() -> T>,
}

impl<T: Cacheable> Clone for CacheLayer<T> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            ttl: self.ttl,
            _record: PhantomData,
        }
    }
}

impl<T: Cacheable> CacheLayer<T> {
    /// Build a layer over `backend`. No backend, or a zero TTL, yields a
    /// disabled layer.
    pub fn new(backend: Option<Arc<dyn CacheBackend>>, ttl_seconds: u64) -> Self {
        let backend = backend.filter(|_| ttl_seconds > 0);
        Self {
            backend,
            ttl: Duration::from_secs(ttl_seconds),
            _record: PhantomData,
        }
    }

    /// A layer that always misses and never errors.
    pub fn disabled() -> Self {
        Self::new(None, 0)
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Render a typed key as `{entity}:{attribute}:{value}`.
    pub fn render(key: &T::Key) -> String {
        format!("{}:{}:{}", T::ENTITY, key.attribute(), key.value())
    }

    // =========================================================================
    // Raw operations (errors surfaced)
    // =========================================================================

    pub async fn get(&self, key: &T::Key) -> Result<Option<T>, CacheError> {
        let Some(backend) = &self.backend else {
            return Ok(None);
        };

        match backend.get(&Self::render(key)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn set(&self, key: &T::Key, value: &T) -> Result<(), CacheError> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };

        let bytes = serde_json::to_vec(value)?;
        backend.set_ex(&Self::render(key), bytes, self.ttl).await
    }

    pub async fn del(&self, keys: &[T::Key]) -> Result<(), CacheError> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };
        if keys.is_empty() {
            return Ok(());
        }

        let rendered: Vec<String> = keys.iter().map(Self::render).collect();
        backend.del(&rendered).await
    }

    // =========================================================================
    // Best-effort operations (errors logged, never propagated)
    // =========================================================================

    /// Read a key; a fault counts as a miss.
    pub async fn lookup(&self, key: &T::Key) -> Option<T> {
        match self.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %Self::render(key), error = %e, "Cache read failed, falling back to store");
                None
            }
        }
    }

    /// Populate a key; a fault is logged and ignored.
    pub async fn store(&self, key: &T::Key, value: &T) {
        if let Err(e) = self.set(key, value).await {
            tracing::warn!(key = %Self::render(key), error = %e, "Cache populate failed");
        }
    }

    /// Drop keys after a committed write; a fault leaves entries to expire.
    pub async fn invalidate(&self, keys: &[T::Key]) {
        if let Err(e) = self.del(keys).await {
            tracing::warn!(
                entity = T::ENTITY,
                keys = keys.len(),
                error = %e,
                "Cache invalidation failed, entries expire with TTL"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::{Category, Inventory};

    fn category() -> Category {
        let now = Utc::now();
        Category {
            id: 7,
            name: "Wheel".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_keys_are_namespaced_per_attribute() {
        assert_eq!(
            CacheLayer::<Inventory>::render(&InventoryKey::Id(7)),
            "inventory:id:7"
        );
        assert_eq!(
            CacheLayer::<Inventory>::render(&InventoryKey::ProductId(7)),
            "inventory:product_id:7"
        );
        assert_eq!(
            CacheLayer::<Category>::render(&CategoryKey::Name("Wheel".to_string())),
            "category:name:Wheel"
        );
    }

    #[tokio::test]
    async fn test_disabled_layer_misses_without_error() {
        let layer = CacheLayer::<Category>::disabled();

        assert!(!layer.is_enabled());
        assert!(layer.get(&CategoryKey::Id(1)).await.unwrap().is_none());
        assert!(layer.set(&CategoryKey::Id(1), &category()).await.is_ok());
        assert!(layer.del(&[CategoryKey::Id(1)]).await.is_ok());
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_layer() {
        let backend: Arc<dyn CacheBackend> = Arc::new(MemoryCache::new());
        let layer = CacheLayer::<Category>::new(Some(backend), 0);
        assert!(!layer.is_enabled());
    }

    #[tokio::test]
    async fn test_set_then_get_round_trips() {
        let backend: Arc<dyn CacheBackend> = Arc::new(MemoryCache::new());
        let layer = CacheLayer::<Category>::new(Some(backend), 60);
        let value = category();

        layer.set(&CategoryKey::Id(7), &value).await.unwrap();

        assert_eq!(layer.get(&CategoryKey::Id(7)).await.unwrap(), Some(value));
        assert!(layer.get(&CategoryKey::Name("Wheel".into())).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_uses_fixed_ttl() {
        let mut backend = MockCacheBackend::new();
        backend
            .expect_set_ex()
            .withf(|key, _, ttl| key == "category:id:7" && *ttl == Duration::from_secs(90))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let layer = CacheLayer::<Category>::new(Some(Arc::new(backend)), 90);
        layer.set(&CategoryKey::Id(7), &category()).await.unwrap();
    }

    #[tokio::test]
    async fn test_transport_fault_is_a_miss_for_lookup() {
        let mut backend = MockCacheBackend::new();
        backend
            .expect_get()
            .returning(|_| Err(CacheError::Unavailable("connection refused".into())));

        let layer = CacheLayer::<Category>::new(Some(Arc::new(backend)), 60);

        assert!(layer.get(&CategoryKey::Id(7)).await.is_err());
        assert!(layer.lookup(&CategoryKey::Id(7)).await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_an_error() {
        let mut backend = MockCacheBackend::new();
        backend
            .expect_get()
            .returning(|_| Ok(Some(b"{not json".to_vec())));

        let layer = CacheLayer::<Category>::new(Some(Arc::new(backend)), 60);

        assert!(matches!(
            layer.get(&CategoryKey::Id(7)).await,
            Err(CacheError::Payload(_))
        ));
        assert!(layer.lookup(&CategoryKey::Id(7)).await.is_none());
    }

    #[tokio::test]
    async fn test_del_sends_all_keys_in_one_call() {
        let mut backend = MockCacheBackend::new();
        backend
            .expect_del()
            .withf(|keys| keys.len() == 2 && keys[0] == "product:id:1" && keys[1] == "product:sku:ABC-1")
            .times(1)
            .returning(|_| Ok(()));

        let layer = CacheLayer::<domain::Product>::new(Some(Arc::new(backend)), 60);
        layer
            .del(&[ProductKey::Id(1), ProductKey::Sku("ABC-1".into())])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_invalidate_swallows_faults() {
        let mut backend = MockCacheBackend::new();
        backend
            .expect_del()
            .returning(|_| Err(CacheError::Unavailable("timeout".into())));

        let layer = CacheLayer::<Category>::new(Some(Arc::new(backend)), 60);
        layer.invalidate(&[CategoryKey::Id(7)]).await;
    }
}
