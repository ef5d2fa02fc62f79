//! explorer-api library
//!
//! HTTP service for participant/biosample metadata: CSV import with
//! reference reconciliation, reference vocabulary maintenance, read-only
//! browsing, and bearer-token login.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use explorer_common::config::TomlConfig;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod import;

use import::AutoCreatePolicy;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Token signing secret; 0 disables authentication
    pub shared_secret: i64,
    /// Reference attributes the importer may create on its own
    pub auto_create: AutoCreatePolicy,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// State with built-in defaults
    pub fn new(db: SqlitePool, shared_secret: i64) -> Self {
        Self::from_config(db, shared_secret, &TomlConfig::default())
    }

    /// State with token lifetimes, upload limit and auto-create list from config
    pub fn from_config(db: SqlitePool, shared_secret: i64, config: &TomlConfig) -> Self {
        Self {
            db,
            shared_secret,
            auto_create: AutoCreatePolicy::new(config.import.auto_create.iter().copied()),
            access_token_ttl_secs: config.auth.access_token_ttl_secs,
            refresh_token_ttl_secs: config.auth.refresh_token_ttl_secs,
            max_upload_bytes: config.import.max_upload_bytes,
        }
    }

    pub fn with_auto_create(mut self, policy: AutoCreatePolicy) -> Self {
        self.auto_create = policy;
        self
    }
}

/// Build application router
///
/// `/health`, `/api/auth/login` and `/api/auth/refresh` are public; every
/// other route goes through the bearer middleware.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    let protected = Router::new()
        .route("/api/buildinfo", get(api::get_build_info))
        .route("/api/csv/:csv_type", post(api::upload_csv))
        .route(
            "/api/reference/:kind",
            get(api::list_references).post(api::create_reference),
        )
        .route(
            "/api/reference/:kind/:id",
            get(api::get_reference)
                .put(api::update_reference)
                .delete(api::delete_reference),
        )
        .route("/api/participant", get(api::list_participants))
        .route("/api/participant/:id", get(api::get_participant))
        .route(
            "/api/participant/:id/biosamples",
            get(api::participant_biosamples),
        )
        .route("/api/biosample", get(api::list_biosamples))
        .route("/api/biosample/:id", get(api::get_biosample))
        .route("/api/user", get(api::list_users).post(api::create_user))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    let public = Router::new()
        .route("/api/auth/login", post(api::login))
        .route("/api/auth/refresh", post(api::refresh))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
