//! Biosample queries

use chrono::{NaiveDate, NaiveTime};
use explorer_common::Result;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Biosample with its reference labels joined in
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BiosampleView {
    pub id: i64,
    pub biosample_id: String,
    pub biosource: String,
    pub collaborator: Option<String>,
    pub location: Option<String>,
    pub storage_temperature: Option<i64>,
    pub tube_type: Option<String>,
    pub study: Option<String>,
    pub draw_time: Option<NaiveTime>,
    pub processing_start_time: Option<NaiveTime>,
    pub freezing_time: Option<NaiveTime>,
    pub processed_by: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub status_date: NaiveDate,
    /// Only set when listed for a participant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_sampling: Option<NaiveDate>,
}

const SELECT_BIOSAMPLE: &str = r#"
    SELECT b.id, b.biosample_id, bs.name AS biosource, b.collaborator, b.location,
           t.number AS storage_temperature, tt.name AS tube_type, s.name AS study,
           b.draw_time, b.processing_start_time, b.freezing_time, b.processed_by,
           b.notes, st.name AS status, b.status_date
    FROM biosample b
    JOIN biosource bs ON bs.id = b.biosource_id
    LEFT JOIN temperature t ON t.id = b.temperature_id
    LEFT JOIN tube_type tt ON tt.id = b.tube_type_id
    LEFT JOIN study s ON s.id = b.study_id
    JOIN status st ON st.id = b.status_id
"#;

fn row_to_biosample(row: &SqliteRow, with_sampling_date: bool) -> Result<BiosampleView> {
    let date_of_sampling = if with_sampling_date {
        row.try_get("date_of_sampling")?
    } else {
        None
    };

    Ok(BiosampleView {
        id: row.try_get("id")?,
        biosample_id: row.try_get("biosample_id")?,
        biosource: row.try_get("biosource")?,
        collaborator: row.try_get("collaborator")?,
        location: row.try_get("location")?,
        storage_temperature: row.try_get("storage_temperature")?,
        tube_type: row.try_get("tube_type")?,
        study: row.try_get("study")?,
        draw_time: row.try_get("draw_time")?,
        processing_start_time: row.try_get("processing_start_time")?,
        freezing_time: row.try_get("freezing_time")?,
        processed_by: row.try_get("processed_by")?,
        notes: row.try_get("notes")?,
        status: row.try_get("status")?,
        status_date: row.try_get("status_date")?,
        date_of_sampling,
    })
}

pub async fn list_biosamples(pool: &SqlitePool) -> Result<Vec<BiosampleView>> {
    let sql = format!("{} ORDER BY b.id", SELECT_BIOSAMPLE);

    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(|row| row_to_biosample(row, false)).collect()
}

pub async fn get_biosample(pool: &SqlitePool, id: i64) -> Result<Option<BiosampleView>> {
    let sql = format!("{} WHERE b.id = ?", SELECT_BIOSAMPLE);

    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.map(|row| row_to_biosample(&row, false)).transpose()
}

pub(crate) async fn list_for_participant(
    pool: &SqlitePool,
    participant_id: i64,
) -> Result<Vec<BiosampleView>> {
    let sql = SELECT_BIOSAMPLE.replacen(
        "SELECT b.id,",
        "SELECT pb.date_of_sampling, b.id,",
        1,
    ) + "JOIN participant_biosample pb ON pb.biosample_id = b.id
         WHERE pb.participant_id = ?
         ORDER BY pb.date_of_sampling, b.id";

    let rows = sqlx::query(&sql)
        .bind(participant_id)
        .fetch_all(pool)
        .await?;
    rows.iter().map(|row| row_to_biosample(row, true)).collect()
}
