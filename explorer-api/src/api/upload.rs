//! CSV upload endpoint
//!
//! POST /api/csv/:csv_type with a multipart body carrying the file in the
//! `uploadedFile` field.

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::db::SqliteStore;
use crate::error::{ApiError, ApiResult};
use crate::import::{self, ImportSummary, ImportType};
use crate::AppState;

const FILE_FIELD: &str = "uploadedFile";

fn multipart_error(context: &str, e: MultipartError) -> ApiError {
    let message = format!("{}: {}", context, e.body_text());
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(message)
    } else {
        ApiError::BadRequest(message)
    }
}

/// POST /api/csv/:csv_type
pub async fn upload_csv(
    State(state): State<AppState>,
    Path(csv_type): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Json<ImportSummary>> {
    let import_type: ImportType = csv_type.parse()?;

    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Invalid multipart body", e))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error("Failed to read upload", e))?;

        info!(file = ?file_name, bytes = bytes.len(), "Received CSV upload");
        file = Some(bytes);
        break;
    }

    let bytes = file.ok_or_else(|| {
        ApiError::BadRequest(format!("Missing file field '{}'", FILE_FIELD))
    })?;

    let store = SqliteStore::new(state.db.clone());
    let summary = import::import_csv(&store, &state.auto_create, import_type, &bytes[..]).await?;

    Ok(Json(summary))
}
