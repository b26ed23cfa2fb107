//! OpenAPI documentation.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::api::handlers::auth_handler::{
    LoginRequest, LogoutRequest, RefreshRequest, RegisterRequest,
};
use domain::{AuthResponse, LogoutResponse, RefreshResponse, UserResponse, UserRole};

/// API documentation struct.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::auth_handler::register,
        crate::api::handlers::auth_handler::login,
        crate::api::handlers::auth_handler::refresh,
        crate::api::handlers::auth_handler::logout,
        crate::api::handlers::auth_handler::me,
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            RefreshRequest,
            LogoutRequest,
            AuthResponse,
            RefreshResponse,
            LogoutResponse,
            UserResponse,
            UserRole,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Token issuance, refresh and revocation"),
    )
)]
pub struct ApiDoc;

/// Security scheme modifier.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
