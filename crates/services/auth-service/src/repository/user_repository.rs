//! User repository trait and an in-process implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use common::{AppError, AppResult};
use domain::User;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User storage as seen by the auth service.
///
/// Email lookups are case-insensitive.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find user by email address
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Insert a new user; fails with a conflict if the email is taken
    async fn create(&self, user: User) -> AppResult<User>;

    /// Replace a stored user
    async fn update(&self, user: User) -> AppResult<User>;
}

/// Map-backed repository for development and tests.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create(&self, user: User) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(AppError::conflict("User"));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, mut user: User) -> AppResult<User> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(AppError::NotFound);
        }
        user.updated_at = Utc::now();
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::UserRole;

    fn user(email: &str) -> User {
        User::new(
            Uuid::new_v4(),
            email.to_string(),
            "hash".to_string(),
            "Test".to_string(),
            UserRole::Technician,
        )
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = InMemoryUserRepository::new();
        let created = repo.create(user("a@example.com")).await.unwrap();

        assert_eq!(repo.find_by_id(created.id).await.unwrap().unwrap().email, "a@example.com");
        assert!(repo.find_by_email("A@Example.com").await.unwrap().is_some());
        assert!(repo.find_by_email("b@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let repo = InMemoryUserRepository::new();
        repo.create(user("a@example.com")).await.unwrap();

        let err = repo.create(user("A@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_unknown_user() {
        let repo = InMemoryUserRepository::new();
        let err = repo.update(user("ghost@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }
}
