//! Integration tests for the auth HTTP endpoints.
//!
//! The router runs against the in-memory user repository and revocation
//! store, so no Redis or database is needed.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tokio_test::assert_ok;
use tower::ServiceExt;
use uuid::Uuid;

use auth_service_lib::api::create_router;
use auth_service_lib::build_state;
use auth_service_lib::config::AuthServiceConfig;
use auth_service_lib::repository::InMemoryUserRepository;
use auth_service_lib::token::TokenCodec;
use domain::{ClaimSet, HashingCost, TokenKind, UserContext, UserRole};

const SECRET: &str = "integration-test-secret-at-least-32-bytes";
const PASSWORD: &str = "StrongPass123!";

// =============================================================================
// Test Helpers
// =============================================================================

async fn app() -> Router {
    let mut config = AuthServiceConfig::with_secret(SECRET);
    config.hashing = HashingCost {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    };
    let state = build_state(&config, Arc::new(InMemoryUserRepository::new()))
        .await
        .unwrap();
    create_router(state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_me(bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri("/api/v1/auth/me");
    if let Some(value) = bearer {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn register(app: &Router, email: &str) -> Value {
    let (status, body) = send(
        app,
        post_json(
            "/api/v1/auth/register",
            json!({
                "organization_id": Uuid::new_v4(),
                "email": email,
                "password": PASSWORD,
                "name": "Dana Dispatcher",
                "role": "dispatcher",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

// =============================================================================
// Registration & Login
// =============================================================================

#[tokio::test]
async fn test_register_returns_token_pair() {
    let app = app().await;
    let body = register(&app, "dana@example.com").await;

    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 900);
    assert_eq!(body["user"]["email"], "dana@example.com");
    assert_eq!(body["user"]["role"], "dispatcher");
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["access_token"].as_str().is_some());
    assert!(body["refresh_token"].as_str().is_some());
}

#[tokio::test]
async fn test_register_policy_violation_is_bad_request() {
    let app = app().await;
    let (status, body) = send(
        &app,
        post_json(
            "/api/v1/auth/register",
            json!({
                "organization_id": Uuid::new_v4(),
                "email": "weak@example.com",
                "password": "alllowercase1!",
                "name": "Weak",
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(
        body["error"]["message"],
        "password must contain at least one uppercase letter"
    );
}

#[tokio::test]
async fn test_register_duplicate_is_conflict() {
    let app = app().await;
    register(&app, "dup@example.com").await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/v1/auth/register",
            json!({
                "organization_id": Uuid::new_v4(),
                "email": "dup@example.com",
                "password": PASSWORD,
                "name": "Again",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_login_success_and_failure() {
    let app = app().await;
    register(&app, "login@example.com").await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/v1/auth/login",
            json!({"email": "login@example.com", "password": PASSWORD}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["user"]["last_login_at"].is_string());

    let (status, body) = send(
        &app,
        post_json(
            "/api/v1/auth/login",
            json!({"email": "login@example.com", "password": "WrongPass123!"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_login_rejects_malformed_email() {
    let app = app().await;
    let (status, body) = send(
        &app,
        post_json(
            "/api/v1/auth/login",
            json!({"email": "not-an-email", "password": PASSWORD}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Invalid email format");
}

// =============================================================================
// Bearer Authentication
// =============================================================================

#[tokio::test]
async fn test_me_with_access_token() {
    let app = app().await;
    let registered = register(&app, "me@example.com").await;
    let bearer = format!("Bearer {}", registered["access_token"].as_str().unwrap());

    let (status, body) = send(&app, get_me(Some(&bearer))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], registered["user"]["id"]);
    assert_eq!(body["email"], "me@example.com");
}

#[tokio::test]
async fn test_me_header_errors() {
    let app = app().await;

    let (status, body) = send(&app, get_me(None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, body) = send(&app, get_me(Some("Token abc"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");

    let (status, _) = send(&app, get_me(Some("Bearer "))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_rejects_refresh_token() {
    let app = app().await;
    let registered = register(&app, "kind@example.com").await;
    let bearer = format!("Bearer {}", registered["refresh_token"].as_str().unwrap());

    let (status, body) = send(&app, get_me(Some(&bearer))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_me_expired_token_reports_token_expired() {
    let app = app().await;
    let subject = UserContext {
        user_id: Uuid::new_v4(),
        organization_id: Uuid::new_v4(),
        email: "old@example.com".to_string(),
        role: UserRole::Technician,
    };
    let claims = ClaimSet::issue(
        &subject,
        TokenKind::Access,
        Utc::now() - Duration::hours(1),
        Duration::minutes(15),
        "route-manager",
        "route-manager-api",
    );
    let token = TokenCodec::new(SECRET.as_bytes(), "route-manager", "route-manager-api")
        .encode(&claims)
        .unwrap();

    let (status, body) = send(&app, get_me(Some(&format!("Bearer {}", token)))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "TOKEN_EXPIRED");
}

// =============================================================================
// Refresh & Logout
// =============================================================================

#[tokio::test]
async fn test_refresh_flow() {
    let app = app().await;
    let registered = register(&app, "refresh@example.com").await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/v1/auth/refresh",
            json!({"refresh_token": registered["refresh_token"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 900);
    assert!(body.get("refresh_token").is_none());

    let bearer = format!("Bearer {}", body["access_token"].as_str().unwrap());
    let (status, _) = send(&app, get_me(Some(&bearer))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_with_access_token_is_unauthorized() {
    let app = app().await;
    let registered = register(&app, "wrongkind@example.com").await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/v1/auth/refresh",
            json!({"refresh_token": registered["access_token"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_logout_revokes_tokens() {
    let app = app().await;
    let registered = register(&app, "bye@example.com").await;
    let bearer = format!("Bearer {}", registered["access_token"].as_str().unwrap());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/logout")
        .header(header::AUTHORIZATION, &bearer)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"refresh_token": registered["refresh_token"]}).to_string(),
        ))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = send(&app, get_me(Some(&bearer))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        post_json(
            "/api/v1/auth/refresh",
            json!({"refresh_token": registered["refresh_token"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_without_anything_succeeds() {
    let app = app().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/logout")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

// =============================================================================
// Health & Docs
// =============================================================================

#[tokio::test]
async fn test_health_reports_memory_store() {
    let app = app().await;
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["revocation_store"]["backend"], "memory");
}

#[tokio::test]
async fn test_openapi_document_lists_auth_paths() {
    let app = app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    let response = assert_ok!(response);
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let doc: Value = serde_json::from_slice(&bytes).unwrap();
    for path in ["login", "register", "refresh", "logout", "me"] {
        assert!(
            doc["paths"].get(format!("/api/v1/auth/{}", path)).is_some(),
            "missing {}",
            path
        );
    }
}
