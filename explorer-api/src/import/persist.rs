//! Bulk persistence of projected rows
//!
//! All rows go in one transaction: participants are found or created by
//! internal id, then each biosample is inserted and linked. Any failure rolls
//! the whole batch back.
//!
//! A reused participant keeps its stored attributes; rows that disagree with
//! them are logged, not applied.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Row, Sqlite, Transaction};
use tracing::{debug, warn};

use super::project::{ParticipantRecord, ProjectedRow};
use super::ImportError;
use crate::db::SqliteStore;

/// Row counts written by one persist call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistOutcome {
    /// Distinct participants inserted
    pub participants_created: u64,
    /// Distinct participants that already existed
    pub participants_reused: u64,
    pub biosamples_created: u64,
    pub links_created: u64,
}

#[async_trait]
pub trait SampleSink: Send + Sync {
    /// Write every row or none of them
    async fn persist(&self, rows: &[ProjectedRow]) -> Result<PersistOutcome, ImportError>;
}

fn row_error(row: usize, what: &str, e: sqlx::Error) -> ImportError {
    ImportError::Persistence(format!("row {}: {}: {}", row, what, e))
}

/// Names of the attributes where `row` disagrees with `stored`
pub(crate) fn differing_fields(
    stored: &ParticipantRecord,
    row: &ParticipantRecord,
) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if stored.external_id != row.external_id {
        fields.push("external_id");
    }
    if stored.race_id != row.race_id {
        fields.push("race");
    }
    if stored.gender_id != row.gender_id {
        fields.push("gender");
    }
    if stored.category_id != row.category_id {
        fields.push("category");
    }
    if stored.date_of_birth != row.date_of_birth {
        fields.push("date_of_birth");
    }
    fields
}

fn warn_if_differs(
    row: usize,
    participant_id: i64,
    stored: &ParticipantRecord,
    incoming: &ParticipantRecord,
) {
    let fields = differing_fields(stored, incoming);
    if !fields.is_empty() {
        warn!(
            row,
            participant_id,
            internal_id = %incoming.internal_id,
            fields = ?fields,
            "Row disagrees with existing participant; stored values kept"
        );
    }
}

async fn find_or_create_participant(
    tx: &mut Transaction<'_, Sqlite>,
    row: usize,
    participant: &ParticipantRecord,
) -> Result<(i64, bool), ImportError> {
    let existing = sqlx::query(
        r#"
        SELECT id, external_id, race_id, gender_id, category_id, date_of_birth
        FROM participant
        WHERE internal_id = ?
        "#,
    )
    .bind(&participant.internal_id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| row_error(row, "looking up participant", e))?;

    if let Some(existing) = existing {
        let read = |e| row_error(row, "reading participant", e);
        let id: i64 = existing.try_get("id").map_err(read)?;
        let stored = ParticipantRecord {
            internal_id: participant.internal_id.clone(),
            external_id: existing.try_get("external_id").map_err(read)?,
            race_id: existing.try_get("race_id").map_err(read)?,
            gender_id: existing.try_get("gender_id").map_err(read)?,
            category_id: existing.try_get("category_id").map_err(read)?,
            date_of_birth: existing
                .try_get::<Option<NaiveDate>, _>("date_of_birth")
                .map_err(read)?,
        };
        warn_if_differs(row, id, &stored, participant);
        return Ok((id, false));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO participant (internal_id, external_id, race_id, gender_id, category_id, date_of_birth)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&participant.internal_id)
    .bind(&participant.external_id)
    .bind(participant.race_id)
    .bind(participant.gender_id)
    .bind(participant.category_id)
    .bind(participant.date_of_birth)
    .execute(&mut **tx)
    .await
    .map_err(|e| row_error(row, "inserting participant", e))?;

    Ok((result.last_insert_rowid(), true))
}

#[async_trait]
impl SampleSink for SqliteStore {
    async fn persist(&self, rows: &[ProjectedRow]) -> Result<PersistOutcome, ImportError> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| ImportError::Persistence(e.to_string()))?;

        let mut outcome = PersistOutcome::default();
        let mut participants: HashMap<&str, (i64, &ParticipantRecord)> = HashMap::new();

        for projected in rows {
            let internal_id = projected.participant.internal_id.as_str();

            let participant_id = match participants.get(internal_id) {
                Some(&(id, first)) => {
                    warn_if_differs(projected.row, id, first, &projected.participant);
                    id
                }
                None => {
                    let (id, created) =
                        find_or_create_participant(&mut tx, projected.row, &projected.participant)
                            .await?;
                    if created {
                        outcome.participants_created += 1;
                    } else {
                        outcome.participants_reused += 1;
                    }
                    participants.insert(internal_id, (id, &projected.participant));
                    id
                }
            };

            let b = &projected.biosample;
            let biosample_id = sqlx::query(
                r#"
                INSERT INTO biosample (
                    biosample_id, biosource_id, collaborator, location, temperature_id,
                    tube_type_id, study_id, draw_time, processing_start_time, freezing_time,
                    processed_by, notes, status_id, status_date
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&b.biosample_id)
            .bind(b.biosource_id)
            .bind(&b.collaborator)
            .bind(&b.location)
            .bind(b.temperature_id)
            .bind(b.tube_type_id)
            .bind(b.study_id)
            .bind(b.draw_time)
            .bind(b.processing_start_time)
            .bind(b.freezing_time)
            .bind(&b.processed_by)
            .bind(&b.notes)
            .bind(b.status_id)
            .bind(b.status_date)
            .execute(&mut *tx)
            .await
            .map_err(|e| row_error(projected.row, &format!("inserting biosample {}", b.biosample_id), e))?
            .last_insert_rowid();
            outcome.biosamples_created += 1;

            sqlx::query(
                "INSERT INTO participant_biosample (participant_id, biosample_id, date_of_sampling)
                 VALUES (?, ?, ?)",
            )
            .bind(participant_id)
            .bind(biosample_id)
            .bind(projected.date_of_sampling)
            .execute(&mut *tx)
            .await
            .map_err(|e| row_error(projected.row, "linking participant and biosample", e))?;
            outcome.links_created += 1;

            debug!(row = projected.row, participant_id, biosample_id, "Row persisted");
        }

        tx.commit()
            .await
            .map_err(|e| ImportError::Persistence(e.to_string()))?;

        Ok(outcome)
    }
}
