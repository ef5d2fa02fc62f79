//! Reference vocabulary endpoints
//!
//! One set of handlers for all attributes, selected by the `:kind` path
//! segment (`race`, `gender`, `category`, `tubeType`, `biosource`,
//! `temperature`, `status`, `study`).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use explorer_common::db::{Label, ReferenceKind, ReferenceRow};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::db::reference;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Create body: one label, or an array of labels created together
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CreateReference {
    One(Label),
    Many(Vec<Label>),
}

fn parse_kind(kind: &str) -> ApiResult<ReferenceKind> {
    kind.parse().map_err(ApiError::NotFound)
}

fn not_found(kind: ReferenceKind, id: i64) -> ApiError {
    ApiError::NotFound(format!("{} {}", kind, id))
}

/// GET /api/reference/:kind
pub async fn list_references(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> ApiResult<Json<Vec<ReferenceRow>>> {
    let kind = parse_kind(&kind)?;
    Ok(Json(reference::find_all(&state.db, kind).await?))
}

/// GET /api/reference/:kind/:id
pub async fn get_reference(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i64)>,
) -> ApiResult<Json<ReferenceRow>> {
    let kind = parse_kind(&kind)?;
    reference::find_by_id(&state.db, kind, id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(kind, id))
}

/// POST /api/reference/:kind
pub async fn create_reference(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(body): Json<CreateReference>,
) -> ApiResult<Response> {
    let kind = parse_kind(&kind)?;

    match body {
        CreateReference::One(label) => {
            let row = reference::create(&state.db, kind, &label).await?;
            info!(attribute = %kind, id = row.id, "Reference value created");
            Ok((StatusCode::CREATED, Json(row)).into_response())
        }
        CreateReference::Many(labels) => {
            let created = reference::create_many(&state.db, kind, &labels).await?;
            info!(attribute = %kind, created, "Reference values created");
            Ok((StatusCode::CREATED, Json(json!({ "created": created }))).into_response())
        }
    }
}

/// PUT /api/reference/:kind/:id
pub async fn update_reference(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i64)>,
    Json(label): Json<Label>,
) -> ApiResult<Json<ReferenceRow>> {
    let kind = parse_kind(&kind)?;
    reference::update(&state.db, kind, id, &label)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(kind, id))
}

/// DELETE /api/reference/:kind/:id
pub async fn delete_reference(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i64)>,
) -> ApiResult<StatusCode> {
    let kind = parse_kind(&kind)?;
    if reference::delete(&state.db, kind, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(kind, id))
    }
}
