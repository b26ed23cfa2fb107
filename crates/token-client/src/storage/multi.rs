use async_trait::async_trait;
use tracing::warn;

use super::{StorageBackend, TokenStorage};
use crate::error::{StorageError, StorageResult};

/// Preferred backend with transparent fallback.
///
/// Every operation goes to the primary first. When it errors, the failure is
/// logged and the fallback serves the operation. Removals go to both so a
/// value written during a primary outage cannot resurface.
pub struct MultiStorage {
    primary: StorageBackend,
    fallback: StorageBackend,
}

impl MultiStorage {
    pub fn new(primary: StorageBackend, fallback: StorageBackend) -> Self {
        Self { primary, fallback }
    }

    pub fn primary(&self) -> &StorageBackend {
        &self.primary
    }

    pub fn fallback(&self) -> &StorageBackend {
        &self.fallback
    }
}

#[async_trait]
impl TokenStorage for MultiStorage {
    async fn set_token(&self, key: &str, value: &str) -> StorageResult<()> {
        match self.primary.set_token(key, value).await {
            Ok(()) => {
                // Drop any copy left behind by an earlier outage.
                if let Err(e) = self.fallback.remove_token(key).await {
                    warn!(key, backend = self.fallback.name(), error = %e, "Stale fallback entry not removed");
                }
                Ok(())
            }
            Err(e) => {
                warn!(key, backend = self.primary.name(), error = %e, "Primary storage write failed, using fallback");
                self.fallback
                    .set_token(key, value)
                    .await
                    .map_err(|fallback_err| StorageError::Unavailable {
                        backend: self.name(),
                        reason: format!(
                            "{}: {}; {}: {}",
                            self.primary.name(),
                            e,
                            self.fallback.name(),
                            fallback_err
                        ),
                    })
            }
        }
    }

    async fn get_token(&self, key: &str) -> StorageResult<Option<String>> {
        match self.primary.get_token(key).await {
            Ok(Some(value)) => Ok(Some(value)),
            Ok(None) => self.fallback.get_token(key).await,
            Err(e) => {
                warn!(key, backend = self.primary.name(), error = %e, "Primary storage read failed, using fallback");
                self.fallback.get_token(key).await
            }
        }
    }

    async fn remove_token(&self, key: &str) -> StorageResult<()> {
        let primary = self.primary.remove_token(key).await;
        let fallback = self.fallback.remove_token(key).await;
        match (primary, fallback) {
            (Err(e), Ok(())) => {
                warn!(key, backend = self.primary.name(), error = %e, "Primary storage remove failed");
                Ok(())
            }
            (_, result) => result,
        }
    }

    async fn clear(&self) -> StorageResult<()> {
        if let Err(e) = self.primary.clear().await {
            warn!(backend = self.primary.name(), error = %e, "Primary storage clear failed");
        }
        self.fallback.clear().await
    }

    async fn is_available(&self) -> bool {
        self.primary.is_available().await || self.fallback.is_available().await
    }

    fn name(&self) -> &'static str {
        "multi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage};

    fn broken_primary(file: &tempfile::NamedTempFile) -> StorageBackend {
        StorageBackend::Durable(FileStorage::durable(file.path().join("tokens")))
    }

    #[tokio::test]
    async fn test_falls_back_when_primary_unavailable() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let multi = MultiStorage::new(
            broken_primary(&file),
            StorageBackend::Memory(MemoryStorage::new()),
        );

        assert!(!multi.primary().is_available().await);
        assert!(multi.is_available().await);

        multi.set_token("access_token", "a").await.unwrap();
        assert_eq!(
            multi.get_token("access_token").await.unwrap(),
            Some("a".to_string())
        );
        assert_eq!(
            multi.fallback().get_token("access_token").await.unwrap(),
            Some("a".to_string())
        );

        multi.remove_token("access_token").await.unwrap();
        assert_eq!(multi.get_token("access_token").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_fails_when_both_backends_fail() {
        let first = tempfile::NamedTempFile::new().unwrap();
        let second = tempfile::NamedTempFile::new().unwrap();
        let multi = MultiStorage::new(broken_primary(&first), broken_primary(&second));

        assert!(!multi.is_available().await);
        assert!(matches!(
            multi.set_token("access_token", "a").await,
            Err(StorageError::Unavailable { backend: "multi", .. })
        ));
    }

    #[tokio::test]
    async fn test_prefers_primary() {
        let dir = tempfile::tempdir().unwrap();
        let multi = MultiStorage::new(
            StorageBackend::Durable(FileStorage::durable(dir.path())),
            StorageBackend::Memory(MemoryStorage::new()),
        );

        multi.fallback().set_token("access_token", "stale").await.unwrap();
        multi.set_token("access_token", "fresh").await.unwrap();

        assert_eq!(
            multi.primary().get_token("access_token").await.unwrap(),
            Some("fresh".to_string())
        );
        assert_eq!(multi.fallback().get_token("access_token").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_spans_both_backends() {
        let dir = tempfile::tempdir().unwrap();
        let multi = MultiStorage::new(
            StorageBackend::Durable(FileStorage::durable(dir.path())),
            StorageBackend::Memory(MemoryStorage::new()),
        );
        multi.primary().set_token("refresh_token", "r").await.unwrap();
        multi.fallback().set_token("access_token", "a").await.unwrap();
        multi.fallback().set_token("locale", "en").await.unwrap();

        multi.clear().await.unwrap();

        assert_eq!(multi.get_token("refresh_token").await.unwrap(), None);
        assert_eq!(multi.get_token("access_token").await.unwrap(), None);
        assert_eq!(multi.get_token("locale").await.unwrap(), Some("en".to_string()));
    }
}
