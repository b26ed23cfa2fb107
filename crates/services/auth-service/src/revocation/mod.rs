//! Revoked token ids, consulted on every authenticated request and refresh.

mod memory;
mod redis_store;

use async_trait::async_trait;
use uuid::Uuid;

use common::AppResult;

pub use memory::MemoryRevocationStore;
pub use redis_store::RedisRevocationStore;

/// Denylist of token ids (`jti`) revoked before their natural expiry.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Revoke `jti` until `expires_at` (unix seconds); past that the token is dead anyway.
    async fn revoke(&self, jti: Uuid, expires_at: i64) -> AppResult<()>;

    async fn is_revoked(&self, jti: Uuid) -> AppResult<bool>;

    /// Backend name for health reporting.
    fn name(&self) -> &'static str;
}
