//! Bearer authentication middleware
//!
//! Protected routes expect `Authorization: Bearer <access token>`. A missing
//! token is a 400, an invalid one a 401. Validated [`Claims`] are placed in
//! the request extensions for handlers.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use explorer_common::api::auth::{now_millis, validate_token, Claims, TokenType};
use explorer_common::api::AuthErrorResponse;
use tracing::{debug, warn};

use crate::AppState;

/// Token from an `Authorization: Bearer ...` header, if any
fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware
///
/// Applied to protected routes only; `/health` and the login/refresh routes
/// are public. A shared secret of 0 disables checking.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if state.shared_secret == 0 {
        return Ok(next.run(request).await);
    }

    let token = bearer_token(&request).ok_or(AuthError::MissingToken)?;

    let claims = validate_token(token, state.shared_secret, TokenType::Access, now_millis())
        .map_err(|e| {
            warn!(path = %request.uri().path(), error = %e, "Rejected bearer token");
            AuthError::InvalidToken
        })?;

    debug!(user_id = claims.user_id, "Authenticated request");
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Authentication error types for HTTP responses
#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingToken => (StatusCode::BAD_REQUEST, "Access denied"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
        };

        (status, Json(AuthErrorResponse::new(message))).into_response()
    }
}

/// Whether the caller may perform admin-only actions
///
/// With authentication disabled there are no claims and everything is allowed.
pub fn is_admin(state: &AppState, claims: Option<&Claims>) -> bool {
    state.shared_secret == 0 || claims.map(|c| c.is_admin).unwrap_or(false)
}
