//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// User Roles
// =============================================================================

/// Platform operator with access to every organization
pub const ROLE_SUPER_ADMIN: &str = "super_admin";

/// Organization administrator
pub const ROLE_ADMIN: &str = "admin";

/// Plans and assigns routes within an organization
pub const ROLE_DISPATCHER: &str = "dispatcher";

/// Field technician, default role for new users
pub const ROLE_TECHNICIAN: &str = "technician";

// =============================================================================
// Password Policy
// =============================================================================

/// Minimum password length of the default policy
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length of the default policy
pub const MAX_PASSWORD_LENGTH: usize = 255;

/// Passwords shorter than this are always rated very weak
pub const VERY_WEAK_PASSWORD_LENGTH: usize = 6;

/// Characters that satisfy the special-character requirement
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?`~";

/// Exact-match deny-list (compared case-insensitively)
pub const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "password123",
    "123456",
    "12345678",
    "123456789",
    "1234567890",
    "qwerty",
    "qwerty123",
    "abc123",
    "111111",
    "123123",
    "admin",
    "admin123",
    "letmein",
    "welcome",
    "welcome1",
    "monkey",
    "dragon",
    "iloveyou",
    "testpass123!",
    "passw0rd",
];

/// Substrings that lower a password's strength score
pub const COMMON_PASSWORD_FRAGMENTS: &[&str] = &[
    "password", "123456", "qwerty", "abc123", "admin", "letmein", "welcome",
];

// =============================================================================
// Authentication
// =============================================================================

/// Default access token lifetime in minutes
pub const DEFAULT_ACCESS_TOKEN_TTL_MINUTES: i64 = 15;

/// Default refresh token lifetime in days
pub const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Minimum JWT secret length (security requirement)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Authorization header prefix for Bearer tokens
pub const BEARER_TOKEN_PREFIX: &str = "Bearer ";

/// JWT token type identifier
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

/// Default `iss` claim
pub const DEFAULT_TOKEN_ISSUER: &str = "route-manager";

/// Default `aud` claim
pub const DEFAULT_TOKEN_AUDIENCE: &str = "route-manager-api";

// =============================================================================
// API Paths
// =============================================================================

/// Prefix shared by every auth endpoint
pub const AUTH_API_PREFIX: &str = "/api/v1/auth";
