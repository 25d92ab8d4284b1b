//! Service layer: input normalisation and cross-repository workflows.

mod account_service;
mod category_service;
mod product_service;
mod stock_service;

pub use account_service::{AccountManager, AccountService, Registration};
pub use category_service::{CategoryManager, CategoryService};
pub use product_service::{ProductManager, ProductService};
pub use stock_service::{StockController, StockService};
