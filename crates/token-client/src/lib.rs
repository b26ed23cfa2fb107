//! Token Client Library
//!
//! Keeps a user's access/refresh token pair, refreshes the access token
//! before it expires, and persists the pair through a pluggable storage
//! backend.

pub mod config;
pub mod error;
pub mod http;
pub mod jwt;
pub mod manager;
pub mod refresh;
pub mod session;
pub mod storage;

use std::sync::Arc;

use reqwest::cookie::Jar;
use tracing::{info, warn};

pub use config::{ClientConfig, TokenManagerConfig};
pub use error::{ClientError, ClientResult, StorageError, StorageResult};
pub use http::{HttpAuthClient, RegisterRequest};
pub use manager::{StoredTokens, TokenInfo, TokenManager, TokenState};
pub use refresh::{RefreshClient, RefreshError, RefreshedTokens};
pub use session::AuthSession;
pub use storage::{StorageBackend, StorageKind, TokenStorage};

/// Build a session for `config`: HTTP client, storage with in-memory
/// fallback, and a token manager restored from whatever was stored before.
pub async fn connect(config: ClientConfig) -> ClientResult<AuthSession> {
    config.manager.validate()?;
    let jar = Arc::new(Jar::default());
    let client = HttpAuthClient::new(&config.api_base_url, jar.clone())?
        .with_refresh_path(config.refresh_path.clone());

    let preferred = StorageBackend::for_kind(
        config.storage,
        config.storage_dir.clone(),
        jar,
        client.base_url().clone(),
    );
    if !preferred.is_available().await {
        warn!(
            storage = preferred.name(),
            "Token storage unavailable, falling back to memory"
        );
    }
    let storage = Arc::new(preferred.with_memory_fallback());

    let manager = TokenManager::new(
        config.manager.clone(),
        storage.clone(),
        Arc::new(client.clone()),
    );
    manager.initialize().await;

    info!(
        api = %client.base_url(),
        storage = storage.name(),
        "Token client ready"
    );
    Ok(AuthSession::new(client, manager, storage))
}
