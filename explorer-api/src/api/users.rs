//! User account endpoints

use axum::{extract::State, http::StatusCode, Extension, Json};
use explorer_common::api::auth::Claims;
use explorer_common::api::CreateUserRequest;
use explorer_common::db::User;
use tracing::info;

use super::auth::is_admin;
use crate::db::users;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/user
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(users::list_users(&state.db).await?))
}

/// POST /api/user
///
/// Admin only.
pub async fn create_user(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    if !is_admin(&state, claims.as_deref()) {
        return Err(ApiError::Forbidden(
            "Only administrators can create users".to_string(),
        ));
    }

    let user = users::create_user(
        &state.db,
        &request.email,
        &request.username,
        &request.password,
        request.is_admin,
    )
    .await?;

    info!(user_id = user.id, is_admin = user.is_admin, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}
