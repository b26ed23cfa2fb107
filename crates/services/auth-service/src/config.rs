//! Auth service configuration.

use std::env;
use std::str::FromStr;

use common::{AppError, AppResult, CacheConfig, JwtConfig, ServiceConfig};
use domain::{
    HashingCost, DEFAULT_ACCESS_TOKEN_TTL_MINUTES, DEFAULT_REFRESH_TOKEN_TTL_DAYS,
    DEFAULT_TOKEN_AUDIENCE, DEFAULT_TOKEN_ISSUER,
};

/// Auth service configuration.
#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    pub service: ServiceConfig,
    /// Token signing and lifetimes
    pub jwt: JwtConfig,
    /// Redis for the revocation list; in-memory when unset
    pub cache: Option<CacheConfig>,
    /// Argon2 cost for newly hashed passwords
    pub hashing: HashingCost,
}

impl AuthServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Fails when `JWT_SECRET` is missing or shorter than the minimum length.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let secret = env::var("JWT_SECRET")
            .map_err(|_| AppError::internal("JWT_SECRET environment variable must be set"))?;

        let jwt = JwtConfig {
            secret,
            access_ttl_minutes: parse_or("JWT_ACCESS_TTL_MINUTES", DEFAULT_ACCESS_TOKEN_TTL_MINUTES),
            refresh_ttl_days: parse_or("JWT_REFRESH_TTL_DAYS", DEFAULT_REFRESH_TOKEN_TTL_DAYS),
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_TOKEN_ISSUER.to_string()),
            audience: env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| DEFAULT_TOKEN_AUDIENCE.to_string()),
        };
        jwt.check().map_err(AppError::internal)?;

        let defaults = ServiceConfig::default();
        let service = ServiceConfig {
            service_name: defaults.service_name,
            host: env::var("AUTH_SERVICE_HOST").unwrap_or(defaults.host),
            port: parse_or("AUTH_SERVICE_PORT", defaults.port),
        };

        let cache = env::var("REDIS_URL")
            .ok()
            .filter(|url| !url.is_empty())
            .map(|url| CacheConfig { url });

        let mut hashing = HashingCost::default();
        hashing.iterations = parse_or("PASSWORD_HASH_ITERATIONS", hashing.iterations);

        Ok(Self {
            service,
            jwt,
            cache,
            hashing,
        })
    }

    /// Configuration for tests and embedding, with in-memory revocation.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            service: ServiceConfig::default(),
            jwt: JwtConfig::with_secret(secret),
            cache: None,
            hashing: HashingCost::default(),
        }
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
