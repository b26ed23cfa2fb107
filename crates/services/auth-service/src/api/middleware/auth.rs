//! Bearer authentication middleware.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use common::AppError;

use crate::api::AppState;
use crate::token::extract_from_header;

/// Validates the bearer access token and injects the [`domain::UserContext`]
/// into the request extensions.
///
/// Refresh tokens and revoked tokens are rejected.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());
    let token = extract_from_header(header)?;

    let user = state.auth_service.authenticate(token).await?;
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
