//! Read-only participant and biosample endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::db::biosamples::{self, BiosampleView};
use crate::db::participants::{self, ParticipantView};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/participant
pub async fn list_participants(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ParticipantView>>> {
    Ok(Json(participants::list_participants(&state.db).await?))
}

/// GET /api/participant/:id
pub async fn get_participant(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ParticipantView>> {
    participants::get_participant(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("participant {}", id)))
}

/// GET /api/participant/:id/biosamples
pub async fn participant_biosamples(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<BiosampleView>>> {
    if participants::get_participant(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound(format!("participant {}", id)));
    }

    Ok(Json(
        participants::list_participant_biosamples(&state.db, id).await?,
    ))
}

/// GET /api/biosample
pub async fn list_biosamples(State(state): State<AppState>) -> ApiResult<Json<Vec<BiosampleView>>> {
    Ok(Json(biosamples::list_biosamples(&state.db).await?))
}

/// GET /api/biosample/:id
pub async fn get_biosample(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<BiosampleView>> {
    biosamples::get_biosample(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("biosample {}", id)))
}
