//! Auth Service Library
//!
//! Issues and validates JWT access/refresh token pairs over HTTP and keeps a
//! revocation list for logged-out tokens.

pub mod api;
pub mod config;
pub mod repository;
pub mod revocation;
pub mod service;
pub mod token;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::info;

use common::AppResult;

use crate::api::{create_router, AppState};
use crate::config::AuthServiceConfig;
use crate::repository::{InMemoryUserRepository, UserRepository};
use crate::revocation::{MemoryRevocationStore, RedisRevocationStore, RevocationStore};
use crate::service::Authenticator;
use crate::token::TokenService;

/// Run the auth service with configuration from the environment.
pub async fn run_embedded(host: &str, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AuthServiceConfig::from_env()?;
    config.service.host = host.to_string();
    config.service.port = port;
    run_server_with_config(config).await
}

/// Wire the service graph for `config` around the given user repository.
pub async fn build_state(
    config: &AuthServiceConfig,
    users: Arc<dyn UserRepository>,
) -> AppResult<AppState> {
    let revocations: Arc<dyn RevocationStore> = match &config.cache {
        Some(cache) => Arc::new(RedisRevocationStore::connect(&cache.url).await?),
        None => Arc::new(MemoryRevocationStore::new()),
    };
    info!(backend = revocations.name(), "Revocation store ready");

    let auth_service = Authenticator::new(
        users,
        revocations.clone(),
        TokenService::new(&config.jwt),
        config.hashing,
    )?;

    Ok(AppState::new(Arc::new(auth_service), revocations))
}

/// Run the HTTP server with the given configuration.
async fn run_server_with_config(
    config: AuthServiceConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = build_state(&config, Arc::new(InMemoryUserRepository::new())).await?;

    // Build router
    let app = create_router(state).layer(TraceLayer::new_for_http());

    // Build address
    let addr: SocketAddr = config.service.addr().parse()?;
    info!("Auth service listening on {}", addr);

    // Run server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
