//! Integration tests for explorer-api endpoints
//!
//! Tests cover:
//! - Health endpoint (no auth required)
//! - CSV upload: success, manual-creation conflict, auto-creation, rollback
//! - Reference vocabulary CRUD
//! - Participant and biosample browsing

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use explorer_api::import::{AutoCreatePolicy, Column};
use explorer_api::{build_router, AppState};
use explorer_common::db::init_memory_database;
use explorer_common::ReferenceKind;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot` method

const BOUNDARY: &str = "explorer-test-boundary";

/// Test helper: in-memory database with one value per reference attribute
async fn setup_test_db() -> SqlitePool {
    let pool = init_memory_database().await.expect("Should create database");

    for (table, column, value) in [
        ("race", "name", "'Asian'"),
        ("gender", "name", "'F'"),
        ("category", "name", "'Proband'"),
        ("tube_type", "name", "'EDTA'"),
        ("biosource", "name", "'Blood'"),
        ("temperature", "number", "-80"),
        ("status", "name", "'Stored'"),
        ("study", "name", "'COHORT-A'"),
    ] {
        sqlx::query(&format!("INSERT INTO {} ({}) VALUES ({})", table, column, value))
            .execute(&pool)
            .await
            .expect("Should seed reference table");
    }

    pool
}

/// Test helper: app with auth disabled (shared_secret = 0)
fn setup_app(db: SqlitePool) -> axum::Router {
    build_router(AppState::new(db, 0))
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: multipart upload of `csv` in the `uploadedFile` field
fn upload_request(csv_type: &str, csv: &str) -> Request<Body> {
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"uploadedFile\"; filename=\"import.csv\"\r\nContent-Type: text/csv\r\n\r\n{csv}\r\n--{b}--\r\n",
        b = BOUNDARY,
        csv = csv
    );

    Request::builder()
        .method("POST")
        .uri(format!("/api/csv/{}", csv_type))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

fn header_line() -> String {
    Column::ALL
        .iter()
        .map(|c| c.header())
        .collect::<Vec<_>>()
        .join(",")
}

/// One data line; reference cells match [`setup_test_db`] unless overridden
fn data_line(internal_id: &str, biosample_id: &str, tube_type: &str, status: &str) -> String {
    // Order follows Column::ALL
    [
        internal_id,
        "EXT-1",
        biosample_id,
        "COHORT-A",
        "Dr. Lee",
        "Asian",
        "F",
        "1980-01-02",
        "2023-05-06",
        "",
        "Proband",
        tube_type,
        "Blood",
        "14:30",
        "15:00",
        "",
        "tech1",
        "Freezer 3",
        "-80.0",
        "",
        status,
        "2023-05-07",
    ]
    .join(",")
}

async fn count(db: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(db)
        .await
        .unwrap()
}

// =============================================================================
// Health Endpoint
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let app = setup_app(setup_test_db().await);

    let response = app.oneshot(test_request("GET", "/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "explorer-api");
    assert_eq!(body["database"], "ok");
    assert!(body["version"].is_string());
}

// =============================================================================
// CSV Upload
// =============================================================================

#[tokio::test]
async fn test_upload_creates_biosamples_and_links() {
    let db = setup_test_db().await;
    let app = setup_app(db.clone());

    let csv = format!(
        "{}\n{}\n{}\n",
        header_line(),
        data_line("P-1", "BS-1", "EDTA", "Stored"),
        data_line("P-1", "BS-2", "EDTA", "Stored"),
    );

    let response = app
        .oneshot(upload_request("participant_biosample", &csv))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["rows"], 2);
    assert_eq!(body["biosamplesCreated"], 2);
    assert_eq!(body["linksCreated"], 2);
    assert_eq!(body["participantsCreated"], 1);
    assert!(body["importId"].is_string());

    assert_eq!(count(&db, "biosample").await, 2);
    assert_eq!(count(&db, "participant_biosample").await, 2);

    let draw_time: String = sqlx::query_scalar("SELECT draw_time FROM biosample WHERE biosample_id = 'BS-1'")
        .fetch_one(&db)
        .await
        .unwrap();
    assert!(draw_time.starts_with("14:30"));
}

#[tokio::test]
async fn test_upload_missing_reference_requires_manual_creation() {
    let db = setup_test_db().await;
    let app = setup_app(db.clone());

    let csv = format!(
        "{}\n{}\n{}\n",
        header_line(),
        data_line("P-1", "BS-1", "Heparin", "Stored"),
        data_line("P-1", "BS-2", "Heparin", "Lost"),
    );

    let response = app
        .oneshot(upload_request("participant_biosample", &csv))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "MANUAL_CREATION_REQUIRED");
    assert_eq!(body["error"]["missing"]["tubeType"], json!([{"name": "Heparin"}]));
    assert_eq!(body["error"]["missing"]["status"], json!([{"name": "Lost"}]));
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Create manually "));

    assert_eq!(count(&db, "biosample").await, 0);
    assert_eq!(count(&db, "tube_type").await, 1);
}

#[tokio::test]
async fn test_upload_auto_creates_allow_listed_attribute() {
    let db = setup_test_db().await;
    let state = AppState::new(db.clone(), 0)
        .with_auto_create(AutoCreatePolicy::new([ReferenceKind::TubeType]));
    let app = build_router(state);

    let csv = format!(
        "{}\n{}\n",
        header_line(),
        data_line("P-1", "BS-1", "Heparin", "Stored"),
    );

    let response = app
        .oneshot(upload_request("participant_biosample", &csv))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["referencesCreated"]["tubeType"], 1);
    assert_eq!(body["biosamplesCreated"], 1);

    let heparin: i64 = sqlx::query_scalar("SELECT id FROM tube_type WHERE name = 'Heparin'")
        .fetch_one(&db)
        .await
        .unwrap();
    let stored: i64 = sqlx::query_scalar("SELECT tube_type_id FROM biosample")
        .fetch_one(&db)
        .await
        .unwrap();
    assert_eq!(stored, heparin);
}

#[tokio::test]
async fn test_upload_duplicate_biosample_rolls_back() {
    let db = setup_test_db().await;

    let first = format!("{}\n{}\n", header_line(), data_line("P-1", "BS-1", "EDTA", "Stored"));
    let response = setup_app(db.clone())
        .oneshot(upload_request("participant_biosample", &first))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let second = format!(
        "{}\n{}\n{}\n",
        header_line(),
        data_line("P-2", "BS-2", "EDTA", "Stored"),
        data_line("P-2", "BS-1", "EDTA", "Stored"),
    );
    let response = setup_app(db.clone())
        .oneshot(upload_request("participant_biosample", &second))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "PERSISTENCE_ERROR");

    assert_eq!(count(&db, "participant").await, 1);
    assert_eq!(count(&db, "biosample").await, 1);
    assert_eq!(count(&db, "participant_biosample").await, 1);
}

#[tokio::test]
async fn test_upload_missing_required_cell() {
    let app = setup_app(setup_test_db().await);

    let csv = format!(
        "{}\n{}\n",
        header_line(),
        data_line("P-1", "", "EDTA", "Stored"),
    );

    let response = app
        .oneshot(upload_request("participant_biosample", &csv))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "MISSING_DATA");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("BiosampleID"));
}

#[tokio::test]
async fn test_upload_missing_column() {
    let app = setup_app(setup_test_db().await);

    let csv = "ParticipantInternalID,BiosampleID\nP-1,BS-1\n";
    let response = app
        .oneshot(upload_request("participant_biosample", csv))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "MISSING_COLUMN");
}

#[tokio::test]
async fn test_upload_unsupported_type() {
    let app = setup_app(setup_test_db().await);

    let csv = format!("{}\n", header_line());
    let response = app.oneshot(upload_request("phenotype", &csv)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "UNSUPPORTED_TYPE");
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let app = setup_app(setup_test_db().await);

    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nx\r\n--{b}--\r\n",
        b = BOUNDARY
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/csv/participant_biosample")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Reference Vocabulary
// =============================================================================

#[tokio::test]
async fn test_reference_crud() {
    let db = setup_test_db().await;

    let response = setup_app(db.clone())
        .oneshot(json_request("POST", "/api/reference/tubeType", json!({"name": "Citrate"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = extract_json(response.into_body()).await;
    assert_eq!(created["name"], "Citrate");
    let id = created["id"].as_i64().unwrap();

    let response = setup_app(db.clone())
        .oneshot(json_request(
            "PUT",
            &format!("/api/reference/tubeType/{}", id),
            json!({"name": "Sodium citrate"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = setup_app(db.clone())
        .oneshot(test_request("GET", &format!("/api/reference/tubeType/{}", id)))
        .await
        .unwrap();
    let fetched = extract_json(response.into_body()).await;
    assert_eq!(fetched["name"], "Sodium citrate");

    let response = setup_app(db.clone())
        .oneshot(test_request("DELETE", &format!("/api/reference/tubeType/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = setup_app(db.clone())
        .oneshot(test_request("GET", &format!("/api/reference/tubeType/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reference_bulk_create_and_list() {
    let db = setup_test_db().await;

    let response = setup_app(db.clone())
        .oneshot(json_request(
            "POST",
            "/api/reference/temperature",
            json!([{"number": -20}, {"number": 4}]),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(extract_json(response.into_body()).await["created"], 2);

    let response = setup_app(db)
        .oneshot(test_request("GET", "/api/reference/temperature"))
        .await
        .unwrap();
    let list = extract_json(response.into_body()).await;
    let numbers: Vec<i64> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["number"].as_i64().unwrap())
        .collect();
    assert_eq!(numbers, vec![-80, -20, 4]);
}

#[tokio::test]
async fn test_reference_duplicate_is_conflict() {
    let app = setup_app(setup_test_db().await);

    let response = app
        .oneshot(json_request("POST", "/api/reference/race", json!({"name": "Asian"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_reference_wrong_label_kind_is_bad_request() {
    let app = setup_app(setup_test_db().await);

    let response = app
        .oneshot(json_request("POST", "/api/reference/temperature", json!({"name": "cold"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_reference_kind_is_not_found() {
    let app = setup_app(setup_test_db().await);

    let response = app
        .oneshot(test_request("GET", "/api/reference/location"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Browsing
// =============================================================================

#[tokio::test]
async fn test_browse_after_import() {
    let db = setup_test_db().await;

    let csv = format!(
        "{}\n{}\n",
        header_line(),
        data_line("P-1", "BS-1", "EDTA", "Stored"),
    );
    let response = setup_app(db.clone())
        .oneshot(upload_request("participant_biosample", &csv))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = setup_app(db.clone())
        .oneshot(test_request("GET", "/api/participant"))
        .await
        .unwrap();
    let participants = extract_json(response.into_body()).await;
    assert_eq!(participants[0]["internalId"], "P-1");
    assert_eq!(participants[0]["gender"], "F");
    assert_eq!(participants[0]["biosampleCount"], 1);
    assert!(participants[0]["age"].is_number());
    let participant_id = participants[0]["id"].as_i64().unwrap();

    let response = setup_app(db.clone())
        .oneshot(test_request(
            "GET",
            &format!("/api/participant/{}/biosamples", participant_id),
        ))
        .await
        .unwrap();
    let biosamples = extract_json(response.into_body()).await;
    assert_eq!(biosamples[0]["biosampleId"], "BS-1");
    assert_eq!(biosamples[0]["storageTemperature"], -80);
    assert_eq!(biosamples[0]["tubeType"], "EDTA");
    assert_eq!(biosamples[0]["dateOfSampling"], "2023-05-06");

    let response = setup_app(db.clone())
        .oneshot(test_request("GET", "/api/biosample"))
        .await
        .unwrap();
    let all = extract_json(response.into_body()).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
    assert!(all[0].get("dateOfSampling").is_none());

    let response = setup_app(db)
        .oneshot(test_request("GET", "/api/biosample/999"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
