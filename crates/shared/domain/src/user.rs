//! User domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{ROLE_ADMIN, ROLE_DISPATCHER, ROLE_SUPER_ADMIN, ROLE_TECHNICIAN};

/// User roles, ordered from least to most privileged.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Technician,
    Dispatcher,
    Admin,
    SuperAdmin,
}

impl UserRole {
    /// Check if this role administers an organization (or all of them)
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::SuperAdmin)
    }

    /// Only super admins cross organization boundaries
    pub fn is_super_admin(&self) -> bool {
        matches!(self, UserRole::SuperAdmin)
    }

    /// Check if this role can access a required role
    pub fn can_access(&self, required: &UserRole) -> bool {
        self >= required
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::SuperAdmin => ROLE_SUPER_ADMIN,
            UserRole::Admin => ROLE_ADMIN,
            UserRole::Dispatcher => ROLE_DISPATCHER,
            UserRole::Technician => ROLE_TECHNICIAN,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new active user
    pub fn new(
        organization_id: Uuid,
        email: String,
        password_hash: String,
        name: String,
        role: UserRole,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization_id,
            email,
            password_hash,
            name,
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    /// Check if user has admin role
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Record a successful login
    pub fn record_login(&mut self) {
        let now = Utc::now();
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    /// Disable the account; existing refresh tokens stop working
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }
}

/// User creation data transfer object
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub organization_id: Uuid,
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Option<UserRole>,
}

/// User response (safe to return to client)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserResponse {
    /// Unique user identifier
    pub id: Uuid,
    /// Owning organization
    pub organization_id: Uuid,
    /// User email address
    pub email: String,
    /// User display name
    pub name: String,
    /// User role
    pub role: String,
    /// Whether the account may sign in
    pub is_active: bool,
    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse::from(&user)
    }
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            organization_id: user.organization_id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.to_string(),
            is_active: user.is_active,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}
