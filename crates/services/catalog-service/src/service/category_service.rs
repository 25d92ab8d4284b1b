//! Category service - naming rules on top of the category repository.

use async_trait::async_trait;
use std::sync::Arc;

use common::{AppError, AppResult};
use domain::normalize::required_text;
use domain::Category;

use crate::repository::{CategoryRepository, ListQuery, Page};

#[async_trait]
pub trait CategoryService: Send + Sync {
    /// Whitespace-collapsed, non-empty, unused name
    async fn create_category(&self, name: &str) -> AppResult<Category>;

    async fn get_category(&self, id: i32) -> AppResult<Category>;

    async fn get_category_by_name(&self, name: &str) -> AppResult<Category>;

    async fn rename_category(&self, id: i32, name: &str) -> AppResult<Category>;

    async fn delete_category(&self, id: i32) -> AppResult<()>;

    async fn list_categories(&self, query: &ListQuery) -> AppResult<Page<Category>>;
}

pub struct CategoryManager {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryManager {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }

    /// The live category holding `name`, if any.
    async fn holder_of(&self, name: &str) -> AppResult<Option<Category>> {
        match self.repo.get_by_name(name).await {
            Ok(category) => Ok(Some(category)),
            Err(AppError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl CategoryService for CategoryManager {
    async fn create_category(&self, name: &str) -> AppResult<Category> {
        let name = required_text("Category name", name)?;

        if self.holder_of(&name).await?.is_some() {
            return Err(AppError::conflict("Category name"));
        }

        self.repo.create(name).await
    }

    async fn get_category(&self, id: i32) -> AppResult<Category> {
        self.repo.get_by_id(id).await
    }

    async fn get_category_by_name(&self, name: &str) -> AppResult<Category> {
        let name = required_text("Category name", name)?;
        self.repo.get_by_name(&name).await
    }

    async fn rename_category(&self, id: i32, name: &str) -> AppResult<Category> {
        let name = required_text("Category name", name)?;
        let current = self.repo.get_by_id(id).await?;

        if current.name == name {
            return Ok(current);
        }
        if let Some(holder) = self.holder_of(&name).await? {
            if holder.id != id {
                return Err(AppError::conflict("Category name"));
            }
        }

        self.repo.update(Category { name, ..current }).await
    }

    async fn delete_category(&self, id: i32) -> AppResult<()> {
        self.repo.delete(id).await
    }

    async fn list_categories(&self, query: &ListQuery) -> AppResult<Page<Category>> {
        self.repo.list(query).await
    }
}
