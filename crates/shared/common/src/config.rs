//! Shared configuration structures.

use serde::{Deserialize, Serialize};

use domain::{
    DEFAULT_ACCESS_TOKEN_TTL_MINUTES, DEFAULT_REFRESH_TOKEN_TTL_DAYS, DEFAULT_TOKEN_AUDIENCE,
    DEFAULT_TOKEN_ISSUER, MIN_JWT_SECRET_LENGTH,
};

/// Base service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Service name for logging and tracing
    pub service_name: String,
    /// Host address to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "auth-service".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServiceConfig {
    /// `host:port` bind address.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Redis cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    pub url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

/// JWT configuration for authentication.
///
/// There is deliberately no default secret; see [`JwtConfig::check`].
#[derive(Clone, Deserialize, Serialize)]
pub struct JwtConfig {
    #[serde(skip_serializing)]
    pub secret: String,
    /// Access token lifetime in minutes
    pub access_ttl_minutes: i64,
    /// Refresh token lifetime in days
    pub refresh_ttl_days: i64,
    /// `iss` claim written and required
    pub issuer: String,
    /// `aud` claim written and required
    pub audience: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("access_ttl_minutes", &self.access_ttl_minutes)
            .field("refresh_ttl_days", &self.refresh_ttl_days)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

impl JwtConfig {
    /// Configuration with the given secret and default lifetimes.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_ttl_minutes: DEFAULT_ACCESS_TOKEN_TTL_MINUTES,
            refresh_ttl_days: DEFAULT_REFRESH_TOKEN_TTL_DAYS,
            issuer: DEFAULT_TOKEN_ISSUER.to_string(),
            audience: DEFAULT_TOKEN_AUDIENCE.to_string(),
        }
    }

    /// Get JWT secret as bytes.
    pub fn secret_bytes(&self) -> &[u8] {
        self.secret.as_bytes()
    }

    /// Reject configurations that must never reach production.
    pub fn check(&self) -> Result<(), String> {
        if self.secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(format!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            ));
        }
        if self.access_ttl_minutes <= 0 {
            return Err("access token lifetime must be positive".to_string());
        }
        if self.refresh_ttl_days * 24 * 60 <= self.access_ttl_minutes {
            return Err("refresh token lifetime must exceed the access token lifetime".to_string());
        }
        Ok(())
    }
}
