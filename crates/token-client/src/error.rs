//! Client-side error types.

use thiserror::Error;

/// Errors surfaced by the token manager and the auth HTTP client.
///
/// Cloneable so one refresh outcome can be handed to every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Bad input, correctable by the caller; message is shown verbatim
    #[error("{0}")]
    Validation(String),

    /// The refresh token itself has expired; a new login is required
    #[error("token has expired")]
    TokenExpired,

    /// Network failure or server rejection while refreshing
    #[error("token refresh failed: {0}")]
    TokenRefresh(String),

    /// No usable token at all
    #[error("authentication required")]
    AuthenticationRequired,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Transport-level failure (connection, decoding)
    #[error("request failed: {0}")]
    Http(String),

    /// Non-success response with the server's error body
    #[error("{message} ({code}, status {status})")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("token manager has been destroyed")]
    ManagerDestroyed,

    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// True when the only way forward is a fresh login.
    pub fn requires_login(&self) -> bool {
        match self {
            ClientError::TokenExpired
            | ClientError::TokenRefresh(_)
            | ClientError::AuthenticationRequired
            | ClientError::InvalidToken(_) => true,
            ClientError::Api { status, .. } => *status == 401,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Http(err.to_string())
    }
}

/// Token storage failures. Always soft: logged, then the next backend is tried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("{backend} storage is unavailable: {reason}")]
    Unavailable {
        backend: &'static str,
        reason: String,
    },

    #[error("I/O error on key '{key}': {message}")]
    Io { key: String, message: String },

    #[error("invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("value for '{0}' contains characters the backend cannot store")]
    InvalidValue(String),
}

impl StorageError {
    pub fn io(key: &str, err: std::io::Error) -> Self {
        StorageError::Io {
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type alias
pub type ClientResult<T> = Result<T, ClientError>;

/// Storage result type alias
pub type StorageResult<T> = Result<T, StorageError>;
