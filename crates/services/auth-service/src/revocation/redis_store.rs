use async_trait::async_trait;
use chrono::Utc;
use redis::{aio::ConnectionManager, AsyncCommands, RedisError};
use tracing::{debug, warn};
use uuid::Uuid;

use common::{AppError, AppResult};

use super::RevocationStore;

/// Key prefix for revoked token ids
const REVOKED_TOKEN_PREFIX: &str = "revoked_token:";

/// Revocation list shared between instances through Redis.
///
/// Each revoked id is stored with a TTL matching the token's remaining lifetime.
pub struct RedisRevocationStore {
    conn: ConnectionManager,
}

impl RedisRevocationStore {
    /// Connect to Redis.
    pub async fn connect(url: &str) -> Result<Self, RedisError> {
        debug!("Connecting to Redis at {}", url);
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    fn key(jti: Uuid) -> String {
        format!("{}{}", REVOKED_TOKEN_PREFIX, jti)
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn revoke(&self, jti: Uuid, expires_at: i64) -> AppResult<()> {
        let ttl = expires_at - Utc::now().timestamp();
        if ttl <= 0 {
            return Ok(());
        }

        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(Self::key(jti), expires_at, ttl as u64)
            .await
            .map_err(|e| {
                warn!("Redis set error for revoked token {}: {}", jti, e);
                AppError::from(e)
            })
    }

    async fn is_revoked(&self, jti: Uuid) -> AppResult<bool> {
        let mut conn = self.conn.clone();
        conn.exists::<_, bool>(Self::key(jti)).await.map_err(|e| {
            warn!("Redis exists error for token {}: {}", jti, e);
            AppError::from(e)
        })
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
