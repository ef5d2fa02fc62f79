//! Database access layer for explorer-api
//!
//! Thin query functions over the shared SQLite schema, one module per entity
//! group. [`SqliteStore`] is the handle the import pipeline is given.

use sqlx::SqlitePool;

pub mod biosamples;
pub mod participants;
pub mod reference;
pub mod users;

/// Pool-backed store handed to the import pipeline
///
/// Implements both `ReferenceStore` and `SampleSink`.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
