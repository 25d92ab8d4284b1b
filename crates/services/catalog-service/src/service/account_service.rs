//! Account service - registration and credential checks.
//!
//! Token issuance is not part of this crate; callers receive the verified
//! user and mint whatever session artefact they need.

use async_trait::async_trait;
use std::sync::Arc;

use common::{AppError, AppResult};
use domain::normalize::{normalize_email, required_text};
use domain::{is_valid_role, NewUser, Password, User, UserRole};

use crate::repository::UserRepository;

/// Account registration request.
#[derive(Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    /// `manager` or `cashier`; absent means `cashier`
    pub role: Option<String>,
}

// Don't expose the password in debug output
impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

#[async_trait]
pub trait AccountService: Send + Sync {
    async fn register(&self, registration: Registration) -> AppResult<User>;

    /// Every failure reason yields the same error, so callers cannot
    /// probe which accounts exist.
    async fn verify_credentials(&self, username: &str, password: &str) -> AppResult<User>;

    async fn get_profile(&self, id: i32) -> AppResult<User>;

    async fn delete_user(&self, id: i32) -> AppResult<()>;
}

pub struct AccountManager {
    repo: Arc<dyn UserRepository>,
}

impl AccountManager {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }
}

/// Whether a uniqueness lookup found a live holder.
fn is_taken(lookup: AppResult<User>) -> AppResult<bool> {
    match lookup {
        Ok(_) => Ok(true),
        Err(AppError::NotFound) => Ok(false),
        Err(e) => Err(e),
    }
}

fn invalid_credentials() -> AppError {
    AppError::invalid_input("invalid credentials")
}

#[async_trait]
impl AccountService for AccountManager {
    async fn register(&self, registration: Registration) -> AppResult<User> {
        let username = required_text("Username", &registration.username)?;
        let email = normalize_email(&registration.email)?;

        let role = match registration.role.as_deref().map(str::trim) {
            None | Some("") => UserRole::default(),
            Some(role) if is_valid_role(role) => UserRole::from(role),
            Some(role) => {
                return Err(AppError::invalid_input(format!("Unknown role '{}'", role)));
            }
        };

        Password::check_strength(&registration.password)?;

        if is_taken(self.repo.get_by_username(&username).await)? {
            tracing::warn!(username = %username, "Registration with taken username");
            return Err(AppError::conflict("Username"));
        }
        if is_taken(self.repo.get_by_email(&email).await)? {
            tracing::warn!("Registration with taken email");
            return Err(AppError::conflict("Email"));
        }

        let password_hash = Password::new(&registration.password)?.into_string();

        let user = self
            .repo
            .create(NewUser {
                username,
                email,
                password_hash,
                role,
            })
            .await?;

        tracing::info!(user_id = user.id, role = %user.role, "User registered");
        Ok(user)
    }

    async fn verify_credentials(&self, username: &str, password: &str) -> AppResult<User> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(invalid_credentials());
        }

        let user = match self.repo.get_by_username(username).await {
            Ok(user) => user,
            Err(AppError::NotFound) => return Err(invalid_credentials()),
            Err(e) => return Err(e),
        };

        if !user.is_active {
            tracing::warn!(user_id = user.id, "Login attempt on inactive account");
            return Err(invalid_credentials());
        }

        if !Password::from_hash(user.password_hash.clone()).verify(password) {
            tracing::warn!(user_id = user.id, "Password verification failed");
            return Err(invalid_credentials());
        }

        Ok(user)
    }

    async fn get_profile(&self, id: i32) -> AppResult<User> {
        self.repo.get_by_id(id).await
    }

    async fn delete_user(&self, id: i32) -> AppResult<()> {
        self.repo.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockUserRepository;
    use chrono::Utc;

    const STRONG: &str = "Sup3r-secret";

    fn stored_user(password: &str, is_active: bool) -> User {
        let now = Utc::now();
        User {
            id: 5,
            username: "somchai".to_string(),
            email: "somchai@example.com".to_string(),
            password_hash: Password::new(password).unwrap().into_string(),
            role: UserRole::Cashier,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    fn registration(role: Option<&str>) -> Registration {
        Registration {
            username: " somchai ".to_string(),
            email: "Somchai@Example.com".to_string(),
            password: STRONG.to_string(),
            role: role.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_register_normalises_and_hashes() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_by_username().returning(|_| Err(AppError::NotFound));
        repo.expect_get_by_email()
            .withf(|email| email == "somchai@example.com")
            .returning(|_| Err(AppError::NotFound));
        repo.expect_create()
            .withf(|new| {
                new.username == "somchai"
                    && new.email == "somchai@example.com"
                    && new.role == UserRole::Cashier
                    && new.password_hash != STRONG
            })
            .returning(|new| {
                let now = Utc::now();
                Ok(User {
                    id: 1,
                    username: new.username,
                    email: new.email,
                    password_hash: new.password_hash,
                    role: new.role,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                })
            });

        let service = AccountManager::new(Arc::new(repo));
        let user = service.register(registration(None)).await.unwrap();

        assert!(Password::from_hash(user.password_hash).verify(STRONG));
    }

    #[tokio::test]
    async fn test_register_rejects_unknown_role_and_weak_password() {
        let service = AccountManager::new(Arc::new(MockUserRepository::new()));

        let err = service.register(registration(Some("admin"))).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let weak = Registration {
            password: "password".to_string(),
            ..registration(None)
        };
        let err = service.register(weak).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_register_taken_email_conflicts() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_by_username().returning(|_| Err(AppError::NotFound));
        repo.expect_get_by_email().returning(|_| Ok(stored_user(STRONG, true)));
        repo.expect_create().never();

        let service = AccountManager::new(Arc::new(repo));
        let err = service.register(registration(Some("manager"))).await.unwrap_err();

        assert!(matches!(err, AppError::Conflict(ref what) if what == "Email"));
    }

    #[tokio::test]
    async fn test_credentials_failures_are_indistinguishable() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_by_username().returning(|name| match name {
            "inactive" => Ok(stored_user(STRONG, false)),
            "somchai" => Ok(stored_user(STRONG, true)),
            _ => Err(AppError::NotFound),
        });
        let service = AccountManager::new(Arc::new(repo));

        let unknown = service.verify_credentials("nobody", STRONG).await.unwrap_err();
        let inactive = service.verify_credentials("inactive", STRONG).await.unwrap_err();
        let wrong = service.verify_credentials("somchai", "Wr0ng-pass").await.unwrap_err();

        for err in [unknown, inactive, wrong] {
            assert_eq!(err.user_message(), "invalid credentials");
        }
    }

    #[tokio::test]
    async fn test_correct_credentials_return_user() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_by_username().returning(|_| Ok(stored_user(STRONG, true)));

        let service = AccountManager::new(Arc::new(repo));
        let user = service.verify_credentials(" somchai ", STRONG).await.unwrap();

        assert_eq!(user.id, 5);
    }
}
