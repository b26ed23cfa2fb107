//! Authentication service - registration, login, token refresh and logout.
//!
//! Tokens come from [`TokenService`]; passwords go through the domain policy
//! and hashing functions.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use common::{AppError, AppResult, OptionExt};
use domain::{
    hash_password_with_cost, is_common_password, AuthResponse, CreateUser, HashingCost,
    LogoutResponse, Password, PasswordRequirements, RefreshResponse, User, UserContext,
    UserResponse, UserRole, TOKEN_TYPE_BEARER,
};

use crate::repository::UserRepository;
use crate::revocation::RevocationStore;
use crate::token::TokenService;

/// Authentication service trait for dependency injection.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create an account and sign it in
    async fn register(&self, input: CreateUser) -> AppResult<AuthResponse>;

    /// Exchange credentials for a token pair
    async fn login(&self, email: String, password: String) -> AppResult<AuthResponse>;

    /// Exchange a refresh token for a new access token
    async fn refresh(&self, refresh_token: String) -> AppResult<RefreshResponse>;

    /// Revoke whichever of the given tokens are still valid. Never fails.
    async fn logout(
        &self,
        access_token: Option<String>,
        refresh_token: Option<String>,
    ) -> LogoutResponse;

    /// Validate a bearer access token, including revocation
    async fn authenticate(&self, access_token: &str) -> AppResult<UserContext>;

    /// Current user record
    async fn me(&self, user_id: Uuid) -> AppResult<UserResponse>;
}

/// [`AuthService`] over a user repository and a revocation store.
pub struct Authenticator {
    users: Arc<dyn UserRepository>,
    revocations: Arc<dyn RevocationStore>,
    tokens: TokenService,
    password_policy: PasswordRequirements,
    hashing: HashingCost,
    /// Verified against when the email is unknown so both paths cost the same
    dummy_hash: String,
}

impl Authenticator {
    pub fn new(
        users: Arc<dyn UserRepository>,
        revocations: Arc<dyn RevocationStore>,
        tokens: TokenService,
        hashing: HashingCost,
    ) -> AppResult<Self> {
        let dummy_hash = hash_password_with_cost("timing-guard-Passw0rd!", &hashing)?;
        Ok(Self {
            users,
            revocations,
            tokens,
            password_policy: PasswordRequirements::standard(),
            hashing,
            dummy_hash,
        })
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    fn auth_response(&self, user: &User) -> AppResult<AuthResponse> {
        let pair = self.tokens.issue_pair(user)?;
        Ok(AuthResponse {
            user: UserResponse::from(user),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: pair.expires_in,
        })
    }

    async fn ensure_not_revoked(&self, jti: Uuid) -> AppResult<()> {
        if self.revocations.is_revoked(jti).await? {
            return Err(AppError::invalid_token("token has been revoked"));
        }
        Ok(())
    }

    async fn revoke_quietly(&self, token: &str) {
        let claims = match self.tokens.validate(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(error = %e, "Skipping revocation of unusable token");
                return;
            }
        };
        if let Err(e) = self.revocations.revoke(claims.jti, claims.exp).await {
            warn!(jti = %claims.jti, error = %e, "Failed to revoke token");
        }
    }
}

#[async_trait]
impl AuthService for Authenticator {
    async fn register(&self, input: CreateUser) -> AppResult<AuthResponse> {
        let role = input.role.unwrap_or_default();
        if role == UserRole::SuperAdmin {
            return Err(AppError::Forbidden);
        }

        let email = input.email.trim().to_lowercase();
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("User"));
        }

        let password = Password::with_policy(&input.password, &self.password_policy, &self.hashing)?;
        if is_common_password(&input.password) {
            return Err(AppError::validation("password is too common"));
        }

        let user = User::new(
            input.organization_id,
            email,
            password.into_string(),
            input.name.trim().to_string(),
            role,
        );
        let user = self.users.create(user).await?;
        info!(user_id = %user.id, organization_id = %user.organization_id, "User registered");

        self.auth_response(&user)
    }

    async fn login(&self, email: String, password: String) -> AppResult<AuthResponse> {
        let found = self.users.find_by_email(email.trim()).await?;

        // Verify even for unknown emails so response timing does not reveal which exist.
        let digest = found
            .as_ref()
            .map_or(self.dummy_hash.as_str(), |u| u.password_hash.as_str());
        let password_valid = Password::from_hash(digest).verify(&password);

        let mut user = match found {
            Some(user) if password_valid => user,
            _ => return Err(AppError::InvalidCredentials),
        };
        if !user.is_active {
            return Err(AppError::Forbidden);
        }

        user.record_login();
        let user = self.users.update(user).await?;
        info!(user_id = %user.id, "User logged in");

        self.auth_response(&user)
    }

    async fn refresh(&self, refresh_token: String) -> AppResult<RefreshResponse> {
        let claims = self.tokens.validate_refresh(&refresh_token)?;
        self.ensure_not_revoked(claims.jti).await?;

        // Re-read the user so role changes and deactivation take effect.
        let user = self
            .users
            .find_by_id(claims.user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| AppError::invalid_token("user is no longer active"))?;

        let access_token = self
            .tokens
            .issue_access_token(user.id, user.organization_id, &user.email, user.role)?;
        debug!(user_id = %user.id, "Access token refreshed");

        Ok(RefreshResponse {
            access_token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: self.tokens.access_ttl_seconds(),
            refresh_token: None,
        })
    }

    async fn logout(
        &self,
        access_token: Option<String>,
        refresh_token: Option<String>,
    ) -> LogoutResponse {
        for token in access_token.iter().chain(refresh_token.iter()) {
            self.revoke_quietly(token).await;
        }
        LogoutResponse { success: true }
    }

    async fn authenticate(&self, access_token: &str) -> AppResult<UserContext> {
        let claims = self.tokens.validate_access(access_token)?;
        self.ensure_not_revoked(claims.jti).await?;
        Ok(claims.to_user_context())
    }

    async fn me(&self, user_id: Uuid) -> AppResult<UserResponse> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_not_found()?;
        Ok(UserResponse::from(user))
    }
}
