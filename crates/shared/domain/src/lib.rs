//! Domain layer - Core business entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.
//! The auth service and the token client both build on these types.

pub mod auth;
pub mod claims;
pub mod constants;
pub mod error;
pub mod password;
pub mod user;

pub use auth::{AuthResponse, LogoutResponse, RefreshResponse, TokenPair};
pub use claims::{ClaimSet, TokenKind, UserContext};
pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use password::{
    hash_password, hash_password_with_cost, is_common_password, password_strength,
    validate_password, verify_password, HashingCost, Password, PasswordRequirements,
    PasswordStrength,
};
pub use user::{CreateUser, User, UserResponse, UserRole};
