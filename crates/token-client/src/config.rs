//! Client configuration.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ClientError, ClientResult};
use crate::storage::StorageKind;

/// Default path of the refresh endpoint, relative to the API base URL
pub const DEFAULT_REFRESH_PATH: &str = "/api/v1/auth/refresh";

/// Refresh timing and retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenManagerConfig {
    /// Refresh once the access token is this close to expiry
    pub refresh_threshold: Duration,
    /// Attempts per refresh, first try included
    pub max_refresh_attempts: u32,
    /// Delay before the second attempt; doubles for each attempt after that
    pub retry_base_delay: Duration,
}

impl Default for TokenManagerConfig {
    fn default() -> Self {
        Self {
            refresh_threshold: Duration::from_secs(5 * 60),
            max_refresh_attempts: 3,
            retry_base_delay: Duration::from_millis(1000),
        }
    }
}

impl TokenManagerConfig {
    /// Backoff before attempt number `attempt` (1-based) is retried.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.retry_base_delay.saturating_mul(1 << exponent)
    }

    /// Reject settings the manager cannot run with.
    pub fn validate(&self) -> ClientResult<()> {
        if self.refresh_threshold.is_zero() {
            return Err(ClientError::Config(
                "refresh threshold must be greater than zero".to_string(),
            ));
        }
        if self.max_refresh_attempts == 0 {
            return Err(ClientError::Config(
                "at least one refresh attempt is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything needed to talk to the auth service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub refresh_path: String,
    pub storage: StorageKind,
    /// Overrides the durable storage directory
    pub storage_dir: Option<PathBuf>,
    pub manager: TokenManagerConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            storage: StorageKind::default(),
            storage_dir: None,
            manager: TokenManagerConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let manager = TokenManagerConfig {
            refresh_threshold: Duration::from_secs(parse_or(
                "TOKEN_REFRESH_THRESHOLD_SECONDS",
                defaults.manager.refresh_threshold.as_secs(),
            )?),
            max_refresh_attempts: parse_or(
                "TOKEN_REFRESH_MAX_ATTEMPTS",
                defaults.manager.max_refresh_attempts,
            )?,
            retry_base_delay: Duration::from_millis(parse_or(
                "TOKEN_REFRESH_RETRY_DELAY_MS",
                defaults.manager.retry_base_delay.as_millis() as u64,
            )?),
        };

        manager.validate()?;

        Ok(Self {
            api_base_url: env::var("API_BASE_URL").unwrap_or(defaults.api_base_url),
            refresh_path: env::var("AUTH_REFRESH_PATH").unwrap_or(defaults.refresh_path),
            storage: match env::var("TOKEN_STORAGE") {
                Ok(value) => value.parse()?,
                Err(_) => defaults.storage,
            },
            storage_dir: env::var_os("TOKEN_STORAGE_DIR").map(PathBuf::from),
            manager,
        })
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> ClientResult<T> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ClientError::Config(format!("{} has an invalid value: {}", key, value))),
        Err(_) => Ok(default),
    }
}
