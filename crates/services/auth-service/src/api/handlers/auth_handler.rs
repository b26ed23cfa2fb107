//! Authentication handlers.

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use common::AppResult;
use domain::{
    AuthResponse, CreateUser, LogoutResponse, RefreshResponse, UserContext, UserResponse,
    UserRole,
};

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::auth_middleware;
use crate::api::AppState;
use crate::token::extract_from_header;

/// User registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// Organization the user belongs to
    pub organization_id: Uuid,
    /// User email address
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "dispatch@example.com")]
    pub email: String,
    /// Must satisfy the password policy
    #[schema(example = "StrongPass123!", min_length = 8)]
    pub password: String,
    /// User display name
    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "Dana Dispatcher")]
    pub name: String,
    /// Defaults to technician
    pub role: Option<UserRole>,
}

/// User login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// User email address
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "dispatch@example.com")]
    pub email: String,
    /// User password
    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "StrongPass123!")]
    pub password: String,
}

/// Token refresh request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Logout request; every field is optional
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LogoutRequest {
    /// Refresh token to revoke alongside the bearer token
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Create authentication routes
pub fn auth_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(me))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .merge(protected)
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Validation or password policy error"),
        (status = 403, description = "Role cannot be self-assigned"),
        (status = 409, description = "User already exists")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let response = state
        .auth_service
        .register(CreateUser {
            organization_id: payload.organization_id,
            email: payload.email,
            password: payload.password,
            name: payload.name,
            role: payload.role,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Login and get a token pair
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let response = state
        .auth_service
        .login(payload.email, payload.password)
        .await?;

    Ok(Json(response))
}

/// Exchange a refresh token for a new access token
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "Authentication",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 401, description = "Refresh token expired, invalid or revoked")
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RefreshRequest>,
) -> AppResult<Json<RefreshResponse>> {
    let response = state.auth_service.refresh(payload.refresh_token).await?;
    Ok(Json(response))
}

/// Revoke the bearer token and the given refresh token
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Authentication",
    request_body(content = LogoutRequest, description = "Optional body"),
    responses(
        (status = 200, description = "Always succeeds", body = LogoutResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Option<Json<LogoutRequest>>,
) -> Json<LogoutResponse> {
    let access_token = extract_from_header(
        headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok()),
    )
    .ok()
    .map(str::to_string);
    let refresh_token = payload.and_then(|Json(body)| body.refresh_token);

    Json(state.auth_service.logout(access_token, refresh_token).await)
}

/// Get the authenticated user
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Authentication",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing, expired or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> AppResult<Json<UserResponse>> {
    let response = state.auth_service.me(user.user_id).await?;
    Ok(Json(response))
}
