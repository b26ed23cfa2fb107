//! The refresh endpoint, as seen by the token manager.

use async_trait::async_trait;
use thiserror::Error;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Tokens handed back by a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedTokens {
    pub access_token: String,
    /// Set only when the server rotates refresh tokens
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

impl RefreshedTokens {
    pub fn access_only(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_in: None,
        }
    }
}

/// Why a refresh attempt failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// The server refused the refresh token. Retrying will not help.
    #[error("refresh rejected ({status} {code}): {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },

    /// Network failure or server-side error; worth another attempt.
    #[error("{0}")]
    Transient(String),
}

impl RefreshError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, RefreshError::Transient(_))
    }
}

/// Exchanges a refresh token for a new access token.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RefreshClient: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, RefreshError>;
}
