//! Issuance and validation of access and refresh tokens.

use chrono::{Duration, Utc};
use uuid::Uuid;

use common::JwtConfig;
use domain::{ClaimSet, TokenKind, TokenPair, User, UserContext, UserRole, BEARER_TOKEN_PREFIX};

use super::{TokenCodec, TokenError};

/// Issues and validates tokens for one issuer/audience pair.
#[derive(Debug, Clone)]
pub struct TokenService {
    codec: TokenCodec,
    access_ttl: Duration,
    refresh_ttl: Duration,
    issuer: String,
    audience: String,
}

impl TokenService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            codec: TokenCodec::new(config.secret_bytes(), &config.issuer, &config.audience),
            access_ttl: Duration::minutes(config.access_ttl_minutes),
            refresh_ttl: Duration::days(config.refresh_ttl_days),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
        }
    }

    /// Access token lifetime in seconds, as reported in `expires_in`.
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    pub fn issue_access_token(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        email: &str,
        role: UserRole,
    ) -> Result<String, TokenError> {
        let subject = UserContext {
            user_id,
            organization_id,
            email: email.to_string(),
            role,
        };
        self.issue(&subject, TokenKind::Access)
    }

    pub fn issue_refresh_token(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        email: &str,
        role: UserRole,
    ) -> Result<String, TokenError> {
        let subject = UserContext {
            user_id,
            organization_id,
            email: email.to_string(),
            role,
        };
        self.issue(&subject, TokenKind::Refresh)
    }

    /// Issue a fresh access/refresh pair for `user`.
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, TokenError> {
        let subject = UserContext::from(user);
        Ok(TokenPair {
            access_token: self.issue(&subject, TokenKind::Access)?,
            refresh_token: self.issue(&subject, TokenKind::Refresh)?,
            expires_in: self.access_ttl_seconds(),
        })
    }

    /// Sign a token of `kind` for `subject`, valid from now.
    pub fn issue(&self, subject: &UserContext, kind: TokenKind) -> Result<String, TokenError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = ClaimSet::issue(subject, kind, Utc::now(), ttl, &self.issuer, &self.audience);
        self.codec.encode(&claims)
    }

    /// Verify a token of either kind.
    pub fn validate(&self, token: &str) -> Result<ClaimSet, TokenError> {
        self.codec.decode(token)
    }

    /// Verify a token and require it to be an access token.
    pub fn validate_access(&self, token: &str) -> Result<ClaimSet, TokenError> {
        self.validate_kind(token, TokenKind::Access)
    }

    /// Verify a token and require it to be a refresh token.
    pub fn validate_refresh(&self, token: &str) -> Result<ClaimSet, TokenError> {
        self.validate_kind(token, TokenKind::Refresh)
    }

    fn validate_kind(&self, token: &str, expected: TokenKind) -> Result<ClaimSet, TokenError> {
        let claims = self.validate(token)?;
        if claims.token_type != expected {
            return Err(TokenError::WrongKind {
                expected,
                actual: claims.token_type,
            });
        }
        Ok(claims)
    }
}

/// Pull the token out of an `Authorization` header value.
pub fn extract_from_header(header: Option<&str>) -> Result<&str, TokenError> {
    let value = header.ok_or(TokenError::MissingHeader)?;
    let token = value
        .strip_prefix(BEARER_TOKEN_PREFIX)
        .ok_or(TokenError::MissingBearerPrefix)?
        .trim();

    if token.is_empty() {
        return Err(TokenError::EmptyToken);
    }
    Ok(token)
}
