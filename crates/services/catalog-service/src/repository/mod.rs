//! Repository layer: store access composed with per-entity caches.

mod base;
mod category_repository;
pub mod entities;
mod inventory_repository;
mod product_repository;
mod user_repository;

pub use base::{normalize_pagination, ListQuery, Page};
pub use category_repository::{CategoryRepository, CategoryStore};
pub use inventory_repository::{InventoryRepository, InventoryStore};
pub use product_repository::{ProductRepository, ProductStore};
pub use user_repository::{UserRepository, UserStore};

#[cfg(any(test, feature = "test-utils"))]
pub use category_repository::MockCategoryRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use inventory_repository::MockInventoryRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use product_repository::MockProductRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
