//! Catalog service configuration.

use std::env;
use std::time::Duration;

use common::config::{CacheConfig, CacheTtls, DatabaseConfig};

/// Default bound on a single stock adjustment, in milliseconds.
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 5_000;

/// Catalog service configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    /// Zero disables the bound
    pub operation_timeout: Duration,
}

impl CatalogConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let ttls = defaults.cache.ttls;

        Self {
            database: DatabaseConfig {
                url: env::var("CATALOG_DATABASE_URL")
                    .or_else(|_| env::var("DATABASE_URL"))
                    .unwrap_or(defaults.database.url),
                max_connections: env_parse("CATALOG_DB_MAX_CONNECTIONS")
                    .unwrap_or(defaults.database.max_connections),
                min_connections: env_parse("CATALOG_DB_MIN_CONNECTIONS")
                    .unwrap_or(defaults.database.min_connections),
            },
            cache: CacheConfig {
                url: env::var("CATALOG_REDIS_URL")
                    .or_else(|_| env::var("REDIS_URL"))
                    .ok()
                    .filter(|url| !url.trim().is_empty()),
                ttls: CacheTtls {
                    user: env_parse("CATALOG_CACHE_TTL_USER_SECS").unwrap_or(ttls.user),
                    product: env_parse("CATALOG_CACHE_TTL_PRODUCT_SECS").unwrap_or(ttls.product),
                    category: env_parse("CATALOG_CACHE_TTL_CATEGORY_SECS")
                        .unwrap_or(ttls.category),
                    inventory: env_parse("CATALOG_CACHE_TTL_INVENTORY_SECS")
                        .unwrap_or(ttls.inventory),
                },
            },
            operation_timeout: env_parse("CATALOG_OPERATION_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.operation_timeout),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            operation_timeout: Duration::from_millis(DEFAULT_OPERATION_TIMEOUT_MS),
        }
    }
}

/// Parse an environment variable, ignoring absent or malformed values.
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_entity_ttls() {
        let config = CatalogConfig::default();

        assert_eq!(config.cache.ttls.user, 300);
        assert_eq!(config.cache.ttls.product, 1800);
        assert_eq!(config.cache.ttls.category, 86_400);
        assert_eq!(config.cache.ttls.inventory, 36_000);
        assert_eq!(config.operation_timeout, Duration::from_secs(5));
        assert!(!config.cache.is_enabled());
    }

    #[test]
    fn test_debug_output_hides_urls() {
        let mut config = CatalogConfig::default();
        config.cache.url = Some("redis://:hunter2@cache:6379".to_string());

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("password@localhost"));
    }
}
