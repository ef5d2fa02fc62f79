//! Login and token refresh
//!
//! POST /api/auth/login and POST /api/auth/refresh. Both are public routes.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use explorer_common::api::auth::{
    issue_token, now_millis, validate_token, verify_password, Claims, TokenType,
};
use explorer_common::api::{
    AuthErrorResponse, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse,
};
use tracing::{info, warn};

use crate::db::users;
use crate::AppState;

fn denied(status: StatusCode) -> axum::response::Response {
    (status, Json(AuthErrorResponse::new("Access denied"))).into_response()
}

fn expiry(ttl_secs: u64) -> i64 {
    now_millis().saturating_add((ttl_secs as i64).saturating_mul(1000))
}

/// POST /api/auth/login
///
/// Unknown email, wrong password and lookup failures all answer 401.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> axum::response::Response {
    let credentials = match users::find_by_email(&state.db, &request.email).await {
        Ok(Some(credentials)) => credentials,
        Ok(None) => {
            warn!(email = %request.email, "Login for unknown email");
            return denied(StatusCode::UNAUTHORIZED);
        }
        Err(e) => {
            warn!(error = %e, "Login lookup failed");
            return denied(StatusCode::UNAUTHORIZED);
        }
    };

    if !verify_password(&request.password, &credentials.password_hash) {
        warn!(email = %request.email, "Login with wrong password");
        return denied(StatusCode::UNAUTHORIZED);
    }

    let user = credentials.user;
    let access = Claims {
        user_id: user.id,
        email: user.email.clone(),
        is_admin: user.is_admin,
        token_type: TokenType::Access,
        exp: expiry(state.access_token_ttl_secs),
    };
    let refresh = access.reissue(TokenType::Refresh, expiry(state.refresh_token_ttl_secs));

    let tokens = issue_token(&access, state.shared_secret).and_then(|access_token| {
        issue_token(&refresh, state.shared_secret).map(|refresh_token| (access_token, refresh_token))
    });
    let (access_token, refresh_token) = match tokens {
        Ok(tokens) => tokens,
        Err(e) => {
            warn!(error = %e, "Token signing failed");
            return denied(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    info!(user_id = user.id, "User logged in");

    Json(LoginResponse {
        msg: "User logged".to_string(),
        access_token,
        refresh_token,
    })
    .into_response()
}

/// POST /api/auth/refresh
///
/// Exchanges a valid refresh token for a new access token.
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> axum::response::Response {
    let claims = match validate_token(
        &request.refresh_token,
        state.shared_secret,
        TokenType::Refresh,
        now_millis(),
    ) {
        Ok(claims) => claims,
        Err(e) => {
            warn!(error = %e, "Refresh rejected");
            return denied(StatusCode::BAD_REQUEST);
        }
    };

    let access = claims.reissue(TokenType::Access, expiry(state.access_token_ttl_secs));

    match issue_token(&access, state.shared_secret) {
        Ok(access_token) => Json(RefreshResponse { access_token }).into_response(),
        Err(e) => {
            warn!(error = %e, "Token signing failed");
            denied(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
