//! Plumbing shared by every repository: list queries, the cache-aside read,
//! and transaction scoping.

use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, EntityTrait,
    FromQueryResult, IsolationLevel, Order, PaginatorTrait, QueryOrder, QuerySelect, Select,
    TransactionTrait,
};

use crate::cache::{CacheLayer, Cacheable};
use common::{AppError, AppResult};
use domain::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

// =============================================================================
// Listing
// =============================================================================

/// Raw list request, as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Case-insensitive substring filter; its target columns vary per entity
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
    /// `field`, `-field`, or `field asc|desc`
    pub sort: Option<String>,
}

impl ListQuery {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit,
            offset,
            ..Self::default()
        }
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Trimmed search term, if any is left.
    pub(crate) fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}

/// One page of rows plus the total matching the same filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Clamp a requested window: limit below 1 becomes the default page size,
/// limit above the maximum is capped, negative offset becomes 0.
pub fn normalize_pagination(limit: i64, offset: i64) -> (u64, u64) {
    let limit = if limit < 1 {
        DEFAULT_PAGE_SIZE
    } else {
        (limit as u64).min(MAX_PAGE_SIZE)
    };
    let offset = offset.max(0) as u64;
    (limit, offset)
}

/// Resolve a sort expression against a whitelist of sortable columns.
///
/// No sort yields `created_at DESC, id DESC`. An explicit sort is followed by
/// the id in the same direction so paging is stable.
pub(crate) fn resolve_sort<C: ColumnTrait>(
    raw: Option<&str>,
    allowed: &[(&'static str, C)],
    created_at: C,
    id: C,
) -> AppResult<Vec<(C, Order)>> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Ok(vec![(created_at, Order::Desc), (id, Order::Desc)]);
    }

    let (field, descending) = parse_sort(raw)?;
    let column = allowed
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, column)| *column)
        .ok_or_else(|| AppError::invalid_input(format!("cannot sort by '{}'", field)))?;

    let order = || if descending { Order::Desc } else { Order::Asc };
    Ok(vec![(column, order()), (id, order())])
}

fn parse_sort(raw: &str) -> AppResult<(&str, bool)> {
    if let Some(field) = raw.strip_prefix('-') {
        return Ok((field.trim(), true));
    }

    let mut parts = raw.split_whitespace();
    let field = parts.next().unwrap_or_default();
    let descending = match parts.next().map(str::to_ascii_lowercase).as_deref() {
        None | Some("asc") => false,
        Some("desc") => true,
        Some(other) => {
            return Err(AppError::invalid_input(format!(
                "invalid sort direction '{}'",
                other
            )))
        }
    };
    if parts.next().is_some() {
        return Err(AppError::invalid_input("invalid sort expression"));
    }

    Ok((field, descending))
}

/// `LOWER(column) LIKE %term%`, portable across PostgreSQL and SQLite.
pub(crate) fn contains_ci<C: ColumnTrait>(column: C, term: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(format!("%{}%", term.to_lowercase()))
}

/// Run the COUNT and the page query for one filtered select concurrently.
pub(crate) async fn fetch_page<E, C>(
    db: &C,
    filtered: Select<E>,
    order: Vec<(E::Column, Order)>,
    query: &ListQuery,
) -> AppResult<(Vec<E::Model>, u64)>
where
    E: EntityTrait,
    E::Model: FromQueryResult + Sized + Send + Sync + 'static,
    C: ConnectionTrait,
{
    let (limit, offset) = normalize_pagination(query.limit, query.offset);

    let mut paged = filtered.clone();
    for (column, direction) in order {
        paged = paged.order_by(column, direction);
    }

    let count = filtered.count(db);
    let rows = paged.limit(limit).offset(offset).all(db);
    let (total, models) = tokio::try_join!(count, rows)?;

    Ok((models, total))
}

// =============================================================================
// Cache-aside read
// =============================================================================

/// Serve `key` from the cache, or load it from the store and populate.
///
/// Misses are never cached; a store `None` surfaces as `NotFound`.
pub(crate) async fn read_through<T, F, Fut>(
    cache: &CacheLayer<T>,
    key: T::Key,
    load: F,
) -> AppResult<T>
where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: Future<Output = AppResult<Option<T>>>,
{
    let started = Instant::now();
    let rendered = CacheLayer::<T>::render(&key);

    if let Some(hit) = cache.lookup(&key).await {
        tracing::debug!(key = %rendered, "Cache hit");
        return Ok(hit);
    }

    match load().await? {
        Some(value) => {
            cache.store(&key, &value).await;
            tracing::debug!(
                key = %rendered,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Loaded from store"
            );
            Ok(value)
        }
        None => {
            tracing::debug!(
                key = %rendered,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Record not found"
            );
            Err(AppError::NotFound)
        }
    }
}

// =============================================================================
// Transactions
// =============================================================================

/// Boxed body of a transaction, borrowing the transaction handle.
pub(crate) type TxFuture<'c, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'c>>;

/// Execute `f` inside one transaction.
///
/// Commits on success and rolls back on error. If the returned future is
/// dropped mid-flight the transaction handle rolls back on drop, so a caller
/// deadline never leaves a partial write behind.
pub(crate) async fn in_transaction<F, T>(db: &DatabaseConnection, f: F) -> AppResult<T>
where
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> TxFuture<'c, T> + Send,
    T: Send,
{
    // SQLite has no per-transaction isolation setting
    let isolation = match db.get_database_backend() {
        DbBackend::Postgres => Some(IsolationLevel::ReadCommitted),
        _ => None,
    };

    let txn = db.begin_with_config(isolation, None).await?;

    match f(&txn).await {
        Ok(result) => {
            txn.commit().await?;
            Ok(result)
        }
        Err(e) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::error!("Transaction rollback failed: {}", rollback_err);
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::Migrator;
    use crate::repository::entities::category;
    use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};
    use sea_orm_migration::MigratorTrait;
    use std::time::Duration;

    async fn memory_db() -> DatabaseConnection {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn insert_category(txn: &DatabaseTransaction, name: &str) -> AppResult<()> {
        let now = chrono::Utc::now();
        category::ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        Ok(())
    }

    #[test]
    fn test_normalize_pagination_bounds() {
        assert_eq!(normalize_pagination(0, 0), (10, 0));
        assert_eq!(normalize_pagination(-5, -3), (10, 0));
        assert_eq!(normalize_pagination(25, 40), (25, 40));
        assert_eq!(normalize_pagination(500, 0), (100, 0));
    }

    #[test]
    fn test_parse_sort_forms() {
        assert_eq!(parse_sort("name").unwrap(), ("name", false));
        assert_eq!(parse_sort("-name").unwrap(), ("name", true));
        assert_eq!(parse_sort("name DESC").unwrap(), ("name", true));
        assert_eq!(parse_sort("name asc").unwrap(), ("name", false));
        assert!(parse_sort("name sideways").is_err());
        assert!(parse_sort("name asc; drop table").is_err());
    }

    #[test]
    fn test_resolve_sort_rejects_unknown_columns() {
        let allowed = [("name", category::Column::Name)];
        let err = resolve_sort(
            Some("password_hash"),
            &allowed,
            category::Column::CreatedAt,
            category::Column::Id,
        )
        .unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_resolve_sort_defaults_to_newest_first() {
        let order = resolve_sort(
            None,
            &[("name", category::Column::Name)],
            category::Column::CreatedAt,
            category::Column::Id,
        )
        .unwrap();

        assert_eq!(order.len(), 2);
        assert!(matches!(order[0], (category::Column::CreatedAt, Order::Desc)));
        assert!(matches!(order[1], (category::Column::Id, Order::Desc)));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        assert_eq!(ListQuery::new(10, 0).search("   ").search_term(), None);
        assert_eq!(ListQuery::new(10, 0).search(" bolt ").search_term(), Some("bolt"));
    }

    #[tokio::test]
    async fn test_in_transaction_commits_on_success() {
        let db = memory_db().await;

        in_transaction(&db, |txn| Box::pin(insert_category(txn, "Brake")))
            .await
            .unwrap();

        assert_eq!(category::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_in_transaction_rolls_back_on_error() {
        let db = memory_db().await;

        let result: AppResult<()> = in_transaction(&db, |txn| {
            Box::pin(async move {
                insert_category(txn, "Brake").await?;
                Err::<(), _>(AppError::InsufficientStock)
            })
        })
        .await;

        assert!(matches!(result, Err(AppError::InsufficientStock)));
        assert_eq!(category::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deadline_mid_transaction_leaves_no_write() {
        let db = memory_db().await;

        let work = in_transaction(&db, |txn| {
            Box::pin(async move {
                insert_category(txn, "Brake").await?;
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<(), AppError>(())
            })
        });
        let outcome = tokio::time::timeout(Duration::from_millis(100), work).await;

        assert!(outcome.is_err());
        assert_eq!(category::Entity::find().count(&db).await.unwrap(), 0);
    }
}
