//! Build information endpoint

use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::error::ApiResult;
use crate::AppState;

/// Version, build metadata and the schema version of the open database
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_timestamp: &'static str,
    pub build_profile: &'static str,
    pub schema_version: Option<i64>,
    pub auto_create: Vec<String>,
}

/// GET /api/buildinfo
pub async fn get_build_info(State(state): State<AppState>) -> ApiResult<Json<BuildInfo>> {
    let schema_version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(&state.db)
        .await
        .map_err(explorer_common::Error::from)?;

    Ok(Json(BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: env!("GIT_HASH"),
        build_timestamp: env!("BUILD_TIMESTAMP"),
        build_profile: env!("BUILD_PROFILE"),
        schema_version,
        auto_create: state
            .auto_create
            .kinds()
            .map(|kind| kind.as_str().to_string())
            .collect(),
    }))
}
