use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use super::{check_key, is_token_key, TokenStorage, AVAILABILITY_KEY};
use crate::error::{StorageError, StorageResult};

/// Directory name used under the user's config directory
const APP_DIR: &str = "route-manager";

/// Lifetime of a file store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileScope {
    /// Survives restarts
    Durable,
    /// Removed by [`FileStorage::end_session`]
    Session,
}

/// One file per key under a root directory.
///
/// The directory is created on first write. On Unix, token files are
/// readable by the owner only.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
    scope: FileScope,
}

impl FileStorage {
    /// Durable store rooted at `root`.
    pub fn durable(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            scope: FileScope::Durable,
        }
    }

    /// Session store in a fresh directory under `base`.
    pub fn session_in(base: impl AsRef<Path>) -> Self {
        let dir = format!("{}-session-{}", APP_DIR, Uuid::new_v4());
        Self {
            root: base.as_ref().join(dir),
            scope: FileScope::Session,
        }
    }

    /// Session store under the OS temp directory.
    pub fn session() -> Self {
        Self::session_in(std::env::temp_dir())
    }

    /// `$XDG_CONFIG_HOME/route-manager/tokens`, falling back to
    /// `$HOME/.config` and then the temp directory.
    pub fn default_durable_dir() -> PathBuf {
        let config_home = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
            .unwrap_or_else(std::env::temp_dir);
        config_home.join(APP_DIR).join("tokens")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scope(&self) -> FileScope {
        self.scope
    }

    /// Delete the session directory and everything in it.
    pub async fn end_session(&self) -> StorageResult<()> {
        if self.scope != FileScope::Session {
            return Ok(());
        }
        match fs::remove_dir_all(&self.root).await {
            Ok(()) => {
                debug!(dir = %self.root.display(), "Session token directory removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io("session", e)),
        }
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        check_key(key)?;
        Ok(self.root.join(key))
    }

    /// Write `value` to a new owner-only file beside `path`, then rename it
    /// over `path`. Readers see either the old value or the new one.
    async fn write_private(path: &Path, value: &str) -> std::io::Result<()> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("value");
        let tmp = path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4()));

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            options.mode(0o600);
        }

        let written = async {
            let mut file = options.open(&tmp).await?;
            file.write_all(value.as_bytes()).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&tmp, path).await
        }
        .await;

        if written.is_err() {
            let _ = fs::remove_file(&tmp).await;
        }
        written
    }
}

#[async_trait]
impl TokenStorage for FileStorage {
    async fn set_token(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::io(key, e))?;
        Self::write_private(&path, value)
            .await
            .map_err(|e| StorageError::io(key, e))
    }

    async fn get_token(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(key, e)),
        }
    }

    async fn remove_token(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(key, e)),
        }
    }

    async fn clear(&self) -> StorageResult<()> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StorageError::io("*", e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io("*", e))?
        {
            let name = entry.file_name();
            let Some(key) = name.to_str() else { continue };
            // Skips in-progress writes, which start with a dot.
            if check_key(key).is_ok() && is_token_key(key) {
                self.remove_token(key).await?;
            }
        }
        Ok(())
    }

    async fn is_available(&self) -> bool {
        if self.set_token(AVAILABILITY_KEY, "1").await.is_err() {
            return false;
        }
        self.remove_token(AVAILABILITY_KEY).await.is_ok()
    }

    fn name(&self) -> &'static str {
        match self.scope {
            FileScope::Durable => "durable",
            FileScope::Session => "session",
        }
    }
}
