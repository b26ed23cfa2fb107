use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{is_token_key, TokenStorage};
use crate::error::StorageResult;

/// Process-local storage. Always available, gone when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStorage for MemoryStorage {
    async fn set_token(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_token(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn remove_token(&self, key: &str) -> StorageResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        self.entries.write().await.retain(|key, _| !is_token_key(key));
        Ok(())
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
