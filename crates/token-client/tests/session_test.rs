//! End-to-end tests against a live auth service on a loopback port.

use std::net::SocketAddr;
use std::sync::Arc;

use uuid::Uuid;

use auth_service_lib::api::create_router;
use auth_service_lib::build_state;
use auth_service_lib::config::AuthServiceConfig;
use auth_service_lib::repository::InMemoryUserRepository;
use domain::HashingCost;
use token_client::{
    connect, AuthSession, ClientConfig, ClientError, RegisterRequest, StorageKind, TokenState,
};

const SECRET: &str = "token-client-test-secret-at-least-32-bytes";
const PASSWORD: &str = "StrongPass123!";

async fn spawn_server() -> SocketAddr {
    let mut config = AuthServiceConfig::with_secret(SECRET);
    config.hashing = HashingCost {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    };
    let state = build_state(&config, Arc::new(InMemoryUserRepository::new()))
        .await
        .unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });
    addr
}

fn client_config(addr: SocketAddr, storage: StorageKind) -> ClientConfig {
    ClientConfig {
        storage,
        ..ClientConfig::new(format!("http://{}", addr))
    }
}

fn registration(email: &str) -> RegisterRequest {
    RegisterRequest {
        organization_id: Uuid::new_v4(),
        email: email.to_string(),
        password: PASSWORD.to_string(),
        name: "Dana Dispatcher".to_string(),
        role: None,
    }
}

async fn signed_in(addr: SocketAddr, storage: StorageKind, email: &str) -> AuthSession {
    let session = connect(client_config(addr, storage)).await.unwrap();
    session.register(&registration(email)).await.unwrap();
    session
}

#[tokio::test]
async fn test_register_login_and_me() {
    let addr = spawn_server().await;
    let session = signed_in(addr, StorageKind::Memory, "dana@example.com").await;

    assert!(session.is_authenticated().await);
    assert_eq!(session.manager().state().await, TokenState::Valid);

    let me = session.me().await.unwrap();
    assert_eq!(me.email, "dana@example.com");
    assert_eq!(me.role, "technician");

    session.logout().await;
    let user = session.login("dana@example.com", PASSWORD).await.unwrap();
    assert_eq!(user.id, me.id);
}

#[tokio::test]
async fn test_register_rejects_weak_password_before_sending() {
    let addr = spawn_server().await;
    let session = connect(client_config(addr, StorageKind::Memory)).await.unwrap();

    let mut request = registration("weak@example.com");
    request.password = "short".to_string();

    assert_eq!(
        session.register(&request).await,
        Err(ClientError::Validation(
            "password must be at least 8 characters long".to_string()
        ))
    );
    assert!(!session.is_authenticated().await);
}

#[tokio::test]
async fn test_bad_credentials_surface_api_error() {
    let addr = spawn_server().await;
    let session = signed_in(addr, StorageKind::Memory, "sam@example.com").await;
    session.logout().await;

    let err = session
        .login("sam@example.com", "WrongPass123!")
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Api { status: 401, .. }));
    assert!(err.requires_login());
}

#[tokio::test]
async fn test_force_refresh_issues_usable_token() {
    let addr = spawn_server().await;
    let session = signed_in(addr, StorageKind::Memory, "riley@example.com").await;
    let before = session.manager().stored_tokens().await;

    let fresh = session.manager().force_refresh().await.unwrap();

    assert_eq!(session.manager().get_access_token().await, Some(fresh.clone()));
    assert_eq!(
        session.manager().stored_tokens().await.refresh_token,
        before.refresh_token
    );
    assert_eq!(session.client().me(&fresh).await.unwrap().email, "riley@example.com");
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let addr = spawn_server().await;
    let session = signed_in(addr, StorageKind::Memory, "alex@example.com").await;
    let stored = session.manager().stored_tokens().await;
    let refresh_token = stored.refresh_token.unwrap();

    session.logout().await;

    assert!(!session.is_authenticated().await);
    assert_eq!(session.manager().state().await, TokenState::NoTokens);
    assert!(matches!(
        session.client().refresh_access_token(&refresh_token).await,
        Err(ClientError::Api { status: 401, .. })
    ));
    assert_eq!(
        session.me().await,
        Err(ClientError::AuthenticationRequired)
    );
}

#[tokio::test]
async fn test_durable_storage_survives_restart() {
    let addr = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let config = ClientConfig {
        storage_dir: Some(dir.path().to_path_buf()),
        ..client_config(addr, StorageKind::Durable)
    };

    let first = connect(config.clone()).await.unwrap();
    first.register(&registration("jo@example.com")).await.unwrap();
    first.shutdown().await;

    let second = connect(config).await.unwrap();
    assert!(second.is_authenticated().await);
    assert_eq!(second.me().await.unwrap().email, "jo@example.com");
}

#[tokio::test]
async fn test_cookie_storage_round_trip() {
    let addr = spawn_server().await;
    let session = signed_in(addr, StorageKind::Cookie, "kim@example.com").await;

    assert!(session.is_authenticated().await);
    assert_eq!(session.me().await.unwrap().email, "kim@example.com");

    session.logout().await;
    assert!(!session.is_authenticated().await);
}

#[tokio::test]
async fn test_shutdown_stops_the_manager() {
    let addr = spawn_server().await;
    let session = signed_in(addr, StorageKind::Session, "lee@example.com").await;

    session.shutdown().await;

    assert_eq!(
        session.manager().force_refresh().await,
        Err(ClientError::ManagerDestroyed)
    );
    assert!(!session.is_authenticated().await);
}
