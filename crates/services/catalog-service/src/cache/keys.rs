use domain::{Category, Inventory, Product, User};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// One addressable attribute of a cached record.
pub trait CacheKey: Send + Sync {
    fn attribute(&self) -> &'static str;
    fn value(&self) -> String;
}

/// A record type that can live in a [`super::CacheLayer`].
pub trait Cacheable: Serialize + DeserializeOwned + Send + Sync + 'static {
    const ENTITY: &'static str;

    type Key: CacheKey;

    /// Every key under which this record may be cached.
    fn cache_keys(&self) -> Vec<Self::Key>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryKey {
    Id(i32),
    Name(String),
}

impl CacheKey for CategoryKey {
    fn attribute(&self) -> &'static str {
        match self {
            Self::Id(_) => "id",
            Self::Name(_) => "name",
        }
    }

    fn value(&self) -> String {
        match self {
            Self::Id(id) => id.to_string(),
            Self::Name(name) => name.clone(),
        }
    }
}

impl Cacheable for Category {
    const ENTITY: &'static str = "category";
    type Key = CategoryKey;

    fn cache_keys(&self) -> Vec<CategoryKey> {
        vec![CategoryKey::Id(self.id), CategoryKey::Name(self.name.clone())]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductKey {
    Id(i32),
    Sku(String),
}

impl CacheKey for ProductKey {
    fn attribute(&self) -> &'static str {
        match self {
            Self::Id(_) => "id",
            Self::Sku(_) => "sku",
        }
    }

    fn value(&self) -> String {
        match self {
            Self::Id(id) => id.to_string(),
            Self::Sku(sku) => sku.clone(),
        }
    }
}

impl Cacheable for Product {
    const ENTITY: &'static str = "product";
    type Key = ProductKey;

    fn cache_keys(&self) -> Vec<ProductKey> {
        vec![ProductKey::Id(self.id), ProductKey::Sku(self.sku.clone())]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryKey {
    Id(i32),
    ProductId(i32),
}

impl CacheKey for InventoryKey {
    fn attribute(&self) -> &'static str {
        match self {
            Self::Id(_) => "id",
            Self::ProductId(_) => "product_id",
        }
    }

    fn value(&self) -> String {
        match self {
            Self::Id(id) | Self::ProductId(id) => id.to_string(),
        }
    }
}

impl Cacheable for Inventory {
    const ENTITY: &'static str = "inventory";
    type Key = InventoryKey;

    fn cache_keys(&self) -> Vec<InventoryKey> {
        vec![InventoryKey::Id(self.id), InventoryKey::ProductId(self.product_id)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserKey {
    Id(i32),
    Username(String),
    Email(String),
}

impl CacheKey for UserKey {
    fn attribute(&self) -> &'static str {
        match self {
            Self::Id(_) => "id",
            Self::Username(_) => "username",
            Self::Email(_) => "email",
        }
    }

    fn value(&self) -> String {
        match self {
            Self::Id(id) => id.to_string(),
            Self::Username(v) | Self::Email(v) => v.clone(),
        }
    }
}

impl Cacheable for User {
    const ENTITY: &'static str = "user";
    type Key = UserKey;

    fn cache_keys(&self) -> Vec<UserKey> {
        vec![
            UserKey::Id(self.id),
            UserKey::Username(self.username.clone()),
            UserKey::Email(self.email.clone()),
        ]
    }
}
