//! Domain layer - Catalog, stock and account records.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.
//! Records here are what repositories return and what the cache mirrors.

pub mod catalog;
pub mod constants;
pub mod error;
pub mod normalize;
pub mod password;
pub mod user;

pub use catalog::{Category, Inventory, NewProduct, Product, ProductDetail, ProductPatch};
pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use password::Password;
pub use user::{NewUser, User, UserRole};
