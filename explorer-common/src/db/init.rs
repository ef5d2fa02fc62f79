//! Database initialization
//!
//! Opens (or creates) the SQLite database and brings the schema up to date.
//! Every statement is idempotent, so initialization runs on each startup.

use crate::{ReferenceKind, Result};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Current schema version
const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema.
///
/// One connection only: every connection to `sqlite::memory:` would
/// otherwise see its own empty database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table and record the schema version
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(pool)
        .await?;

    create_schema_version_table(pool).await?;
    create_settings_table(pool).await?;
    create_users_table(pool).await?;

    for kind in ReferenceKind::ALL {
        create_reference_table(pool, kind).await?;
    }

    create_participant_table(pool).await?;
    create_biosample_table(pool).await?;
    create_participant_biosample_table(pool).await?;

    record_schema_version(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn record_schema_version(pool: &SqlitePool) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(CURRENT_SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application key-value pairs (token signing secret).
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            is_admin INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Reference tables share one shape: id plus a unique label column
async fn create_reference_table(pool: &SqlitePool, kind: ReferenceKind) -> Result<()> {
    let label_type = if kind.is_numeric() { "INTEGER" } else { "TEXT" };
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            {} {} NOT NULL UNIQUE
        )",
        kind.table_name(),
        kind.label_column(),
        label_type,
    );

    sqlx::query(&sql).execute(pool).await?;

    Ok(())
}

async fn create_participant_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS participant (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            internal_id TEXT NOT NULL UNIQUE,
            external_id TEXT NOT NULL,
            race_id INTEGER REFERENCES race(id),
            gender_id INTEGER NOT NULL REFERENCES gender(id),
            category_id INTEGER NOT NULL REFERENCES category(id),
            date_of_birth TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_biosample_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS biosample (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            biosample_id TEXT NOT NULL UNIQUE,
            biosource_id INTEGER NOT NULL REFERENCES biosource(id),
            collaborator TEXT,
            location TEXT,
            temperature_id INTEGER REFERENCES temperature(id),
            tube_type_id INTEGER REFERENCES tube_type(id),
            study_id INTEGER REFERENCES study(id),
            draw_time TEXT,
            processing_start_time TEXT,
            freezing_time TEXT,
            processed_by TEXT,
            notes TEXT,
            status_id INTEGER NOT NULL REFERENCES status(id),
            status_date TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_participant_biosample_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS participant_biosample (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            participant_id INTEGER NOT NULL REFERENCES participant(id) ON DELETE CASCADE,
            biosample_id INTEGER NOT NULL REFERENCES biosample(id) ON DELETE CASCADE,
            date_of_sampling TEXT NOT NULL,
            UNIQUE (participant_id, biosample_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
