//! Pluggable token persistence.
//!
//! One trait, one enum selecting the concrete backend, and a composite that
//! falls back to a secondary backend when the preferred one fails.

mod cookie;
mod file;
mod memory;
mod multi;

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::Url;

use crate::error::{ClientError, StorageResult};

pub use cookie::CookieStorage;
pub use file::{FileScope, FileStorage};
pub use memory::MemoryStorage;
pub use multi::MultiStorage;

/// Key of the stored access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Key of the stored refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Key of the access token expiry (unix seconds), kept next to the token
pub const TOKEN_EXPIRY_KEY: &str = "token_expiry";

/// Key written and removed by availability checks
pub(crate) const AVAILABILITY_KEY: &str = "__storage_check__";

/// True for keys `clear()` is allowed to remove.
pub fn is_token_key(key: &str) -> bool {
    key.to_ascii_lowercase().contains("token")
}

/// Key/value persistence for tokens.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    async fn set_token(&self, key: &str, value: &str) -> StorageResult<()>;

    async fn get_token(&self, key: &str) -> StorageResult<Option<String>>;

    async fn remove_token(&self, key: &str) -> StorageResult<()>;

    /// Remove token keys only; unrelated keys are left alone.
    async fn clear(&self) -> StorageResult<()>;

    /// Write/remove check.
    async fn is_available(&self) -> bool;

    fn name(&self) -> &'static str;
}

/// Which backend to prefer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    /// Files under a per-user directory, surviving restarts
    #[default]
    Durable,
    /// Files under a per-process temp directory
    Session,
    /// Cookies in the HTTP client's jar
    Cookie,
    Memory,
}

impl FromStr for StorageKind {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "durable" | "local" | "file" => Ok(StorageKind::Durable),
            "session" => Ok(StorageKind::Session),
            "cookie" | "cookies" => Ok(StorageKind::Cookie),
            "memory" => Ok(StorageKind::Memory),
            other => Err(ClientError::Config(format!(
                "unknown token storage '{}', expected durable, session, cookie or memory",
                other
            ))),
        }
    }
}

/// The concrete storage strategies.
pub enum StorageBackend {
    Durable(FileStorage),
    Session(FileStorage),
    Cookie(CookieStorage),
    Memory(MemoryStorage),
    Multi(Box<MultiStorage>),
}

impl std::fmt::Debug for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StorageBackend").field(&self.name()).finish()
    }
}

impl StorageBackend {
    /// Backend for `kind`. `durable_dir` overrides the default durable
    /// location; cookies are scoped to `origin` in `jar`.
    pub fn for_kind(
        kind: StorageKind,
        durable_dir: Option<PathBuf>,
        jar: Arc<Jar>,
        origin: Url,
    ) -> Self {
        match kind {
            StorageKind::Durable => StorageBackend::Durable(FileStorage::durable(
                durable_dir.unwrap_or_else(FileStorage::default_durable_dir),
            )),
            StorageKind::Session => StorageBackend::Session(FileStorage::session()),
            StorageKind::Cookie => StorageBackend::Cookie(CookieStorage::new(jar, origin)),
            StorageKind::Memory => StorageBackend::Memory(MemoryStorage::new()),
        }
    }

    /// Wrap `self` so failures fall through to in-memory storage.
    pub fn with_memory_fallback(self) -> Self {
        match self {
            StorageBackend::Memory(_) | StorageBackend::Multi(_) => self,
            primary => StorageBackend::Multi(Box::new(MultiStorage::new(
                primary,
                StorageBackend::Memory(MemoryStorage::new()),
            ))),
        }
    }

    /// Delete the session directory, if this is (or wraps) session storage.
    pub async fn end_session(&self) -> StorageResult<()> {
        match self {
            StorageBackend::Session(files) => files.end_session().await,
            StorageBackend::Multi(multi) => {
                Box::pin(multi.primary().end_session()).await?;
                Box::pin(multi.fallback().end_session()).await
            }
            _ => Ok(()),
        }
    }

    fn inner(&self) -> &dyn TokenStorage {
        match self {
            StorageBackend::Durable(s) | StorageBackend::Session(s) => s,
            StorageBackend::Cookie(s) => s,
            StorageBackend::Memory(s) => s,
            StorageBackend::Multi(s) => &**s,
        }
    }
}

#[async_trait]
impl TokenStorage for StorageBackend {
    async fn set_token(&self, key: &str, value: &str) -> StorageResult<()> {
        self.inner().set_token(key, value).await
    }

    async fn get_token(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner().get_token(key).await
    }

    async fn remove_token(&self, key: &str) -> StorageResult<()> {
        self.inner().remove_token(key).await
    }

    async fn clear(&self) -> StorageResult<()> {
        self.inner().clear().await
    }

    async fn is_available(&self) -> bool {
        self.inner().is_available().await
    }

    fn name(&self) -> &'static str {
        self.inner().name()
    }
}

/// Reject keys that cannot be used as file names or cookie names.
pub(crate) fn check_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !key.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(crate::error::StorageError::InvalidKey(key.to_string()))
    }
}
