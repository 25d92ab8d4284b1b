//! User repository implementation with soft delete support.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use super::base::{contains_ci, fetch_page, read_through, resolve_sort, ListQuery, Page};
use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use crate::cache::{CacheLayer, Cacheable, UserKey};
use common::{AppError, AppResult, OptionExt};
use domain::{NewUser, User};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User repository trait for dependency injection.
///
/// All query methods exclude soft-deleted records. Cached users carry the
/// password hash, so every write drops every key the user is reachable by.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find active user by ID
    async fn get_by_id(&self, id: i32) -> AppResult<User>;

    async fn get_by_username(&self, username: &str) -> AppResult<User>;

    /// Lookup by normalised (lower-case) email
    async fn get_by_email(&self, email: &str) -> AppResult<User>;

    /// Filter by username or email; bypasses the cache
    async fn list(&self, query: &ListQuery) -> AppResult<Page<User>>;

    async fn create(&self, new: NewUser) -> AppResult<User>;

    /// Full-row update of every mutable field
    async fn update(&self, user: User) -> AppResult<User>;

    /// Soft delete user by ID (sets deleted_at timestamp)
    async fn delete(&self, id: i32) -> AppResult<()>;
}

/// Concrete implementation of UserRepository with soft delete
pub struct UserStore {
    db: DatabaseConnection,
    cache: CacheLayer<User>,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection, cache: CacheLayer<User>) -> Self {
        Self { db, cache }
    }

    async fn find_live(&self, id: i32) -> AppResult<Option<user::Model>> {
        let model = UserEntity::find_by_id(id)
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;
        Ok(model)
    }

    async fn find_live_by(&self, column: user::Column, value: &str) -> AppResult<Option<User>> {
        let model = UserEntity::find()
            .filter(column.eq(value))
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;
        Ok(model.map(User::from))
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn get_by_id(&self, id: i32) -> AppResult<User> {
        read_through(&self.cache, UserKey::Id(id), || async {
            Ok(self.find_live(id).await?.map(User::from))
        })
        .await
    }

    async fn get_by_username(&self, username: &str) -> AppResult<User> {
        read_through(&self.cache, UserKey::Username(username.to_string()), || {
            self.find_live_by(user::Column::Username, username)
        })
        .await
    }

    async fn get_by_email(&self, email: &str) -> AppResult<User> {
        read_through(&self.cache, UserKey::Email(email.to_string()), || {
            self.find_live_by(user::Column::Email, email)
        })
        .await
    }

    async fn list(&self, query: &ListQuery) -> AppResult<Page<User>> {
        let order = resolve_sort(
            query.sort.as_deref(),
            &[
                ("id", user::Column::Id),
                ("username", user::Column::Username),
                ("email", user::Column::Email),
                ("role", user::Column::Role),
                ("created_at", user::Column::CreatedAt),
                ("updated_at", user::Column::UpdatedAt),
            ],
            user::Column::CreatedAt,
            user::Column::Id,
        )?;

        let mut select = UserEntity::find().filter(user::Column::DeletedAt.is_null());
        if let Some(term) = query.search_term() {
            select = select.filter(
                Condition::any()
                    .add(contains_ci(user::Column::Username, term))
                    .add(contains_ci(user::Column::Email, term)),
            );
        }

        let (models, total) = fetch_page(&self.db, select, order, query).await?;

        Ok(Page {
            items: models.into_iter().map(User::from).collect(),
            total,
        })
    }

    async fn create(&self, new: NewUser) -> AppResult<User> {
        let now = chrono::Utc::now();
        let active_model = ActiveModel {
            username: Set(new.username),
            email: Set(new.email),
            password_hash: Set(new.password_hash),
            role: Set(new.role.as_str().to_string()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(|e| AppError::from(e).label_conflict("Username or email"))?;
        let user = User::from(model);

        self.cache.invalidate(&user.cache_keys()).await;
        tracing::info!(user_id = user.id, role = %user.role, "User created");

        Ok(user)
    }

    async fn update(&self, user: User) -> AppResult<User> {
        let existing = self.find_live(user.id).await?.ok_or_not_found()?;
        let previous = User::from(existing.clone());

        let mut active: ActiveModel = existing.into();
        active.username = Set(user.username);
        active.email = Set(user.email);
        active.password_hash = Set(user.password_hash);
        active.role = Set(user.role.as_str().to_string());
        active.is_active = Set(user.is_active);
        active.updated_at = Set(chrono::Utc::now());

        let model = active
            .update(&self.db)
            .await
            .map_err(|e| AppError::from(e).label_conflict("Username or email"))?;
        let updated = User::from(model);

        let mut keys = updated.cache_keys();
        if previous.username != updated.username {
            keys.push(UserKey::Username(previous.username));
        }
        if previous.email != updated.email {
            keys.push(UserKey::Email(previous.email));
        }
        self.cache.invalidate(&keys).await;
        tracing::info!(user_id = updated.id, "User updated");

        Ok(updated)
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        // Soft delete: set deleted_at timestamp
        let existing = self.find_live(id).await?.ok_or_not_found()?;
        let user = User::from(existing.clone());

        let mut active: ActiveModel = existing.into();
        let now = chrono::Utc::now();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(now);
        active.update(&self.db).await?;

        self.cache.invalidate(&user.cache_keys()).await;
        tracing::info!(user_id = id, "User deleted");

        Ok(())
    }
}
