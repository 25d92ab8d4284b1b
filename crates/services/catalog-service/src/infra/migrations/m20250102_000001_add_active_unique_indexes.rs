//! Migration: Unique natural keys among live (non-deleted) rows.
//!
//! Partial indexes are not expressible through the index builder, so these
//! are raw statements; the syntax is shared by PostgreSQL and SQLite.

use sea_orm_migration::prelude::*;

const INDEXES: &[(&str, &str, &str)] = &[
    ("uq_categories_name_active", "categories", "name"),
    ("uq_products_sku_active", "products", "sku"),
    ("uq_inventories_product_id_active", "inventories", "product_id"),
    ("uq_users_username_active", "users", "username"),
    ("uq_users_email_active", "users", "email"),
];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        for (name, table, column) in INDEXES {
            db.execute_unprepared(&format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {name} ON {table} ({column}) WHERE deleted_at IS NULL"
            ))
            .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        for (name, _, _) in INDEXES {
            db.execute_unprepared(&format!("DROP INDEX IF EXISTS {name}"))
                .await?;
        }

        Ok(())
    }
}
