use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use common::AppResult;

use super::RevocationStore;

/// Process-local revocation list. Entries are dropped once their token expires.
#[derive(Debug, Default)]
pub struct MemoryRevocationStore {
    revoked: RwLock<HashMap<Uuid, i64>>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.revoked.read().await.len()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn revoke(&self, jti: Uuid, expires_at: i64) -> AppResult<()> {
        let now = Utc::now().timestamp();
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, exp| *exp > now);
        if expires_at > now {
            revoked.insert(jti, expires_at);
        }
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> AppResult<bool> {
        let now = Utc::now().timestamp();
        Ok(self
            .revoked
            .read()
            .await
            .get(&jti)
            .is_some_and(|exp| *exp > now))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
