//! SeaORM entities. Every table carries a `deleted_at` soft-delete marker.

pub mod category;
pub mod inventory;
pub mod product;
pub mod user;
