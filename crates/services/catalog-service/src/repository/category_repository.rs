//! Category repository: store access behind a read-through cache.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use super::base::{contains_ci, fetch_page, read_through, resolve_sort, ListQuery, Page};
use super::entities::category::{self, ActiveModel, Entity as CategoryEntity};
use crate::cache::{CacheLayer, Cacheable, CategoryKey};
use common::{AppError, AppResult, OptionExt};
use domain::Category;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Category repository trait for dependency injection.
///
/// All reads exclude soft-deleted rows.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<Category>;

    async fn get_by_name(&self, name: &str) -> AppResult<Category>;

    /// Filter by name; bypasses the cache
    async fn list(&self, query: &ListQuery) -> AppResult<Page<Category>>;

    async fn create(&self, name: String) -> AppResult<Category>;

    /// Full-row update; `name` must stay unique
    async fn update(&self, category: Category) -> AppResult<Category>;

    /// Soft delete
    async fn delete(&self, id: i32) -> AppResult<()>;
}

/// Concrete implementation of CategoryRepository
pub struct CategoryStore {
    db: DatabaseConnection,
    cache: CacheLayer<Category>,
}

impl CategoryStore {
    pub fn new(db: DatabaseConnection, cache: CacheLayer<Category>) -> Self {
        Self { db, cache }
    }

    async fn find_live(&self, id: i32) -> AppResult<Option<category::Model>> {
        let model = CategoryEntity::find_by_id(id)
            .filter(category::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;
        Ok(model)
    }
}

#[async_trait]
impl CategoryRepository for CategoryStore {
    async fn get_by_id(&self, id: i32) -> AppResult<Category> {
        read_through(&self.cache, CategoryKey::Id(id), || async {
            Ok(self.find_live(id).await?.map(Category::from))
        })
        .await
    }

    async fn get_by_name(&self, name: &str) -> AppResult<Category> {
        read_through(&self.cache, CategoryKey::Name(name.to_string()), || async {
            let model = CategoryEntity::find()
                .filter(category::Column::Name.eq(name))
                .filter(category::Column::DeletedAt.is_null())
                .one(&self.db)
                .await?;
            Ok(model.map(Category::from))
        })
        .await
    }

    async fn list(&self, query: &ListQuery) -> AppResult<Page<Category>> {
        let order = resolve_sort(
            query.sort.as_deref(),
            &[
                ("id", category::Column::Id),
                ("name", category::Column::Name),
                ("created_at", category::Column::CreatedAt),
                ("updated_at", category::Column::UpdatedAt),
            ],
            category::Column::CreatedAt,
            category::Column::Id,
        )?;

        let mut select = CategoryEntity::find().filter(category::Column::DeletedAt.is_null());
        if let Some(term) = query.search_term() {
            select = select.filter(contains_ci(category::Column::Name, term));
        }

        let (models, total) = fetch_page(&self.db, select, order, query).await?;
        tracing::debug!(total, returned = models.len(), "Listed categories");

        Ok(Page {
            items: models.into_iter().map(Category::from).collect(),
            total,
        })
    }

    async fn create(&self, name: String) -> AppResult<Category> {
        let now = chrono::Utc::now();
        let active_model = ActiveModel {
            name: Set(name),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(|e| AppError::from(e).label_conflict("Category name"))?;
        let category = Category::from(model);

        self.cache.invalidate(&category.cache_keys()).await;
        tracing::info!(category_id = category.id, name = %category.name, "Category created");

        Ok(category)
    }

    async fn update(&self, category: Category) -> AppResult<Category> {
        let existing = self.find_live(category.id).await?.ok_or_not_found()?;
        let previous_name = existing.name.clone();

        let mut active: ActiveModel = existing.into();
        active.name = Set(category.name);
        active.updated_at = Set(chrono::Utc::now());

        let model = active
            .update(&self.db)
            .await
            .map_err(|e| AppError::from(e).label_conflict("Category name"))?;
        let updated = Category::from(model);

        let mut keys = updated.cache_keys();
        keys.push(CategoryKey::Name(previous_name));
        self.cache.invalidate(&keys).await;
        tracing::info!(category_id = updated.id, "Category updated");

        Ok(updated)
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let existing = self.find_live(id).await?.ok_or_not_found()?;
        let category = Category::from(existing.clone());

        let mut active: ActiveModel = existing.into();
        let now = chrono::Utc::now();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(now);
        active.update(&self.db).await?;

        self.cache.invalidate(&category.cache_keys()).await;
        tracing::info!(category_id = id, "Category deleted");

        Ok(())
    }
}
