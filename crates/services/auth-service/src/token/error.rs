//! Token validation failures.

use common::AppError;
use domain::TokenKind;
use thiserror::Error;

/// Why a token or authorization header was rejected.
///
/// `Expired` is the only recoverable case: an expired access token can be
/// refreshed, everything else forces a new login.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    /// Malformed, forged, wrong algorithm, wrong issuer or audience
    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("authorization header is required")]
    MissingHeader,

    #[error("authorization header must start with 'Bearer '")]
    MissingBearerPrefix,

    #[error("token is empty")]
    EmptyToken,

    #[error("expected {expected} token, got {actual} token")]
    WrongKind { expected: TokenKind, actual: TokenKind },

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

impl TokenError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        TokenError::Invalid(reason.into())
    }

    /// True when the caller should attempt a refresh rather than a new login.
    pub fn is_expired(&self) -> bool {
        matches!(self, TokenError::Expired)
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::TokenExpired,
            TokenError::MissingHeader => AppError::Unauthorized,
            TokenError::Encoding(msg) => AppError::internal(msg),
            other => AppError::invalid_token(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_expired_is_recoverable() {
        assert!(TokenError::Expired.is_expired());
        assert!(!TokenError::invalid("bad signature").is_expired());
        assert!(!TokenError::WrongKind {
            expected: TokenKind::Access,
            actual: TokenKind::Refresh
        }
        .is_expired());
    }

    #[test]
    fn test_app_error_mapping() {
        assert_eq!(AppError::from(TokenError::Expired).code(), "TOKEN_EXPIRED");
        assert_eq!(AppError::from(TokenError::EmptyToken).code(), "INVALID_TOKEN");
        assert_eq!(AppError::from(TokenError::MissingHeader).code(), "UNAUTHORIZED");
        assert_eq!(
            AppError::from(TokenError::Encoding("boom".into())).code(),
            "INTERNAL_ERROR"
        );
    }
}
