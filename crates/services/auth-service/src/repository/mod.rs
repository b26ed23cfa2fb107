//! User persistence boundary.

mod user_repository;

pub use user_repository::{InMemoryUserRepository, UserRepository};

#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
