//! Login, logout and authenticated calls on top of the token manager.

use std::sync::Arc;

use tracing::{info, warn};

use domain::UserResponse;

use crate::error::{ClientError, ClientResult};
use crate::http::{HttpAuthClient, RegisterRequest};
use crate::manager::TokenManager;
use crate::storage::StorageBackend;

/// A signed-in (or signing-in) user of the auth service.
#[derive(Debug)]
pub struct AuthSession {
    client: HttpAuthClient,
    manager: TokenManager,
    storage: Arc<StorageBackend>,
}

impl AuthSession {
    pub fn new(client: HttpAuthClient, manager: TokenManager, storage: Arc<StorageBackend>) -> Self {
        Self {
            client,
            manager,
            storage,
        }
    }

    pub fn manager(&self) -> &TokenManager {
        &self.manager
    }

    pub fn client(&self) -> &HttpAuthClient {
        &self.client
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<UserResponse> {
        let response = self.client.login(email, password).await?;
        self.manager
            .set_tokens(&response.access_token, &response.refresh_token)
            .await?;
        info!(user_id = %response.user.id, "Signed in");
        Ok(response.user)
    }

    pub async fn register(&self, request: &RegisterRequest) -> ClientResult<UserResponse> {
        let response = self.client.register(request).await?;
        self.manager
            .set_tokens(&response.access_token, &response.refresh_token)
            .await?;
        info!(user_id = %response.user.id, "Registered and signed in");
        Ok(response.user)
    }

    /// Revoke the tokens on the server if possible, then forget them locally.
    /// Local state is always cleared, even when the server is unreachable.
    pub async fn logout(&self) {
        let stored = self.manager.stored_tokens().await;
        if stored.access_token.is_some() || stored.refresh_token.is_some() {
            if let Err(e) = self
                .client
                .logout(
                    stored.access_token.as_deref(),
                    stored.refresh_token.as_deref(),
                )
                .await
            {
                warn!(error = %e, "Server logout failed, clearing local tokens anyway");
            }
        }
        self.manager.clear_tokens().await;
        info!("Signed out");
    }

    /// The current user. An access token the server reports as expired is
    /// refreshed once and the call retried.
    pub async fn me(&self) -> ClientResult<UserResponse> {
        let token = self.manager.require_access_token().await?;
        match self.client.me(&token).await {
            Err(ClientError::Api { status: 401, code, .. }) if code == "TOKEN_EXPIRED" => {
                let token = self.manager.force_refresh().await?;
                self.client.me(&token).await
            }
            result => result,
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.manager.is_authenticated().await
    }

    /// Tear down the manager and remove session-scoped storage.
    pub async fn shutdown(&self) {
        self.manager.destroy().await;
        if let Err(e) = self.storage.end_session().await {
            warn!(error = %e, "Session storage not removed");
        }
    }
}
