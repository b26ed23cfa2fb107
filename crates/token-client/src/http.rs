//! Typed reqwest wrapper for the auth endpoints.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use domain::{
    validate_password, AuthResponse, LogoutResponse, PasswordRequirements, RefreshResponse,
    UserResponse, UserRole, AUTH_API_PREFIX,
};

use crate::config::DEFAULT_REFRESH_PATH;
use crate::error::{ClientError, ClientResult};
use crate::refresh::{RefreshClient, RefreshError, RefreshedTokens};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Registration payload.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub organization_id: Uuid,
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct LogoutBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// HTTP client for the auth service.
#[derive(Debug, Clone)]
pub struct HttpAuthClient {
    http: reqwest::Client,
    base_url: Url,
    refresh_path: String,
}

impl HttpAuthClient {
    /// Client for `base_url` that sends the cookies in `jar`.
    pub fn new(base_url: &str, jar: Arc<Jar>) -> ClientResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Config(format!("invalid API base URL '{}': {}", base_url, e)))?;
        let http = reqwest::Client::builder()
            .cookie_provider(jar)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url,
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
        })
    }

    /// Override the refresh endpoint path.
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Config(format!("invalid path '{}': {}", path, e)))
    }

    fn auth_url(&self, endpoint: &str) -> ClientResult<Url> {
        self.url(&format!("{}/{}", AUTH_API_PREFIX, endpoint))
    }

    /// Register a user. The password policy is checked before any request
    /// is sent, so policy messages reach the caller verbatim.
    pub async fn register(&self, request: &RegisterRequest) -> ClientResult<AuthResponse> {
        validate_password(&request.password, &PasswordRequirements::default())
            .map_err(|e| ClientError::Validation(e.to_string()))?;

        let resp = self
            .http
            .post(self.auth_url("register")?)
            .json(request)
            .send()
            .await?;
        parse(resp).await
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<AuthResponse> {
        if email.trim().is_empty() {
            return Err(ClientError::Validation("email is required".to_string()));
        }
        if password.is_empty() {
            return Err(ClientError::Validation("password is required".to_string()));
        }

        let resp = self
            .http
            .post(self.auth_url("login")?)
            .json(&LoginBody { email, password })
            .send()
            .await?;
        parse(resp).await
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> ClientResult<RefreshResponse> {
        let resp = self
            .http
            .post(self.url(&self.refresh_path)?)
            .json(&RefreshBody { refresh_token })
            .send()
            .await?;
        parse(resp).await
    }

    /// Revoke the given tokens on the server.
    pub async fn logout(
        &self,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
    ) -> ClientResult<LogoutResponse> {
        let mut request = self
            .http
            .post(self.auth_url("logout")?)
            .json(&LogoutBody { refresh_token });
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }
        parse(request.send().await?).await
    }

    pub async fn me(&self, access_token: &str) -> ClientResult<UserResponse> {
        let resp = self
            .http
            .get(self.auth_url("me")?)
            .bearer_auth(access_token)
            .send()
            .await?;
        parse(resp).await
    }
}

#[async_trait]
impl RefreshClient for HttpAuthClient {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, RefreshError> {
        match self.refresh_access_token(refresh_token).await {
            Ok(resp) => Ok(RefreshedTokens {
                access_token: resp.access_token,
                refresh_token: resp.refresh_token,
                expires_in: Some(resp.expires_in),
            }),
            Err(ClientError::Api {
                status,
                code,
                message,
            }) if matches!(status, 400 | 401 | 403) => {
                Err(RefreshError::Rejected {
                    status,
                    code,
                    message,
                })
            }
            Err(e) => Err(RefreshError::Transient(e.to_string())),
        }
    }
}

async fn parse<T: DeserializeOwned>(resp: Response) -> ClientResult<T> {
    if resp.status().is_success() {
        return resp
            .json::<T>()
            .await
            .map_err(|e| ClientError::Http(format!("unexpected response body: {}", e)));
    }
    Err(api_error(resp).await)
}

async fn api_error(resp: Response) -> ClientError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), "Auth request failed");

    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => ClientError::Api {
            status: status.as_u16(),
            code: envelope.error.code,
            message: envelope.error.message,
        },
        Err(_) => ClientError::Api {
            status: status.as_u16(),
            code: "HTTP_ERROR".to_string(),
            message: if body.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            },
        },
    }
}
