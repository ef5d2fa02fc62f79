//! CSV import of participants and biosamples
//!
//! Stages, in order:
//! 1. [`row::read_rows`] reads the upload into text rows
//! 2. [`reconcile::check`] validates required cells and resolves every
//!    reference label once
//! 3. [`project::parse_rows`] parses dates and times, before any write
//! 4. [`dispatch::dispatch`] creates allow-listed missing values or stops the
//!    import; the check then runs once more
//! 5. [`project::project`] builds one record per row from the resolved ids
//! 6. [`persist::SampleSink::persist`] writes all rows in one transaction

use std::collections::BTreeMap;
use std::io::Read;
use std::str::FromStr;

use explorer_common::ReferenceKind;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

pub mod dispatch;
pub mod lookup;
pub mod persist;
pub mod project;
pub mod reconcile;
pub mod row;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatch::{AutoCreatePolicy, MissingReferences};
pub use lookup::ReferenceStore;
pub use persist::{PersistOutcome, SampleSink};
pub use reconcile::ReconciliationResult;
pub use row::{Column, RawRow};

/// Kind of file selected by the upload path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportType {
    ParticipantBiosample,
}

impl FromStr for ImportType {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "participant_biosample" => Ok(Self::ParticipantBiosample),
            other => Err(ImportError::UnsupportedType(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Missing column: {0}")]
    MissingColumn(Column),

    #[error("Missing data in row {row}, column {column}")]
    MissingRequiredCell { row: usize, column: Column },

    #[error("Invalid value '{value}' in row {row}, column {column}: {reason}")]
    InvalidCell {
        row: usize,
        column: Column,
        value: String,
        reason: String,
    },

    /// Reference values an operator must create before re-uploading
    #[error("{0}")]
    UnresolvedReference(MissingReferences),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Internal inconsistency: {0}")]
    InternalInconsistency(String),

    #[error("Unreadable CSV: {0}")]
    Csv(String),

    #[error("Unsupported import type: {0}")]
    UnsupportedType(String),
}

/// Result of a successful import
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub import_id: Uuid,
    pub rows: usize,
    pub participants_created: u64,
    pub participants_reused: u64,
    pub biosamples_created: u64,
    pub links_created: u64,
    pub references_created: BTreeMap<ReferenceKind, u64>,
}

/// Read an upload and import it
pub async fn import_csv<S, R>(
    store: &S,
    policy: &AutoCreatePolicy,
    import_type: ImportType,
    reader: R,
) -> Result<ImportSummary, ImportError>
where
    S: ReferenceStore + SampleSink,
    R: Read,
{
    let rows = row::read_rows(reader)?;
    run_import(store, policy, import_type, &rows).await
}

/// Check, create, project and persist already-read rows
pub async fn run_import<S>(
    store: &S,
    policy: &AutoCreatePolicy,
    import_type: ImportType,
    rows: &[RawRow],
) -> Result<ImportSummary, ImportError>
where
    S: ReferenceStore + SampleSink,
{
    let import_id = Uuid::new_v4();
    info!(import_id = %import_id, ?import_type, rows = rows.len(), "Import started");

    let result = run_stages(store, policy, rows).await;

    match result {
        Ok((outcome, references_created)) => {
            info!(
                import_id = %import_id,
                biosamples = outcome.biosamples_created,
                participants_created = outcome.participants_created,
                "Import finished"
            );

            Ok(ImportSummary {
                import_id,
                rows: rows.len(),
                participants_created: outcome.participants_created,
                participants_reused: outcome.participants_reused,
                biosamples_created: outcome.biosamples_created,
                links_created: outcome.links_created,
                references_created,
            })
        }
        Err(e) => {
            warn!(import_id = %import_id, error = %e, "Import aborted");
            Err(e)
        }
    }
}

async fn run_stages<S>(
    store: &S,
    policy: &AutoCreatePolicy,
    rows: &[RawRow],
) -> Result<(PersistOutcome, BTreeMap<ReferenceKind, u64>), ImportError>
where
    S: ReferenceStore + SampleSink,
{
    let mut reconciliation = reconcile::check(store, rows).await?;
    let parsed = project::parse_rows(rows)?;

    let mut references_created = BTreeMap::new();
    if !reconciliation.all_found {
        references_created = dispatch::dispatch(store, policy, &reconciliation).await?;

        reconciliation = reconcile::check(store, rows).await?;
        if !reconciliation.all_found {
            return Err(ImportError::InternalInconsistency(format!(
                "still missing after auto-creation: {}",
                MissingReferences(reconciliation.values)
            )));
        }
    }

    let projected = project::project(&parsed, &reconciliation.resolved)?;
    let outcome = store.persist(&projected).await?;

    Ok((outcome, references_created))
}
