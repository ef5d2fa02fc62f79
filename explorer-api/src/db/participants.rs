//! Participant queries
//!
//! Read side of the participant table, with the `age` virtual field computed
//! from the date of birth.

use chrono::{Datelike, NaiveDate};
use explorer_common::Result;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::biosamples::{self, BiosampleView};

/// Participant with its reference labels resolved
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub id: i64,
    pub internal_id: String,
    pub external_id: String,
    pub race: Option<String>,
    pub gender: String,
    pub category: String,
    pub date_of_birth: Option<NaiveDate>,
    /// Whole years since the birth year; `None` without a date of birth
    pub age: Option<i32>,
    pub biosample_count: i64,
}

/// Age as the difference between the current year and the birth year
pub fn age_in_years(date_of_birth: Option<NaiveDate>, today: NaiveDate) -> Option<i32> {
    date_of_birth.map(|dob| today.year() - dob.year())
}

const SELECT_PARTICIPANT: &str = r#"
    SELECT p.id, p.internal_id, p.external_id, r.name AS race, g.name AS gender,
           c.name AS category, p.date_of_birth,
           (SELECT COUNT(*) FROM participant_biosample pb WHERE pb.participant_id = p.id)
               AS biosample_count
    FROM participant p
    LEFT JOIN race r ON r.id = p.race_id
    JOIN gender g ON g.id = p.gender_id
    JOIN category c ON c.id = p.category_id
"#;

fn row_to_participant(row: &SqliteRow, today: NaiveDate) -> Result<ParticipantView> {
    let date_of_birth: Option<NaiveDate> = row.try_get("date_of_birth")?;

    Ok(ParticipantView {
        id: row.try_get("id")?,
        internal_id: row.try_get("internal_id")?,
        external_id: row.try_get("external_id")?,
        race: row.try_get("race")?,
        gender: row.try_get("gender")?,
        category: row.try_get("category")?,
        date_of_birth,
        age: age_in_years(date_of_birth, today),
        biosample_count: row.try_get("biosample_count")?,
    })
}

/// All participants, ordered by id
pub async fn list_participants(pool: &SqlitePool) -> Result<Vec<ParticipantView>> {
    let today = chrono::Local::now().date_naive();
    let sql = format!("{} ORDER BY p.id", SELECT_PARTICIPANT);

    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(|row| row_to_participant(row, today)).collect()
}

pub async fn get_participant(pool: &SqlitePool, id: i64) -> Result<Option<ParticipantView>> {
    let today = chrono::Local::now().date_naive();
    let sql = format!("{} WHERE p.id = ?", SELECT_PARTICIPANT);

    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.map(|row| row_to_participant(&row, today)).transpose()
}

/// Biosamples linked to one participant, ordered by sampling date
pub async fn list_participant_biosamples(
    pool: &SqlitePool,
    participant_id: i64,
) -> Result<Vec<BiosampleView>> {
    biosamples::list_for_participant(pool, participant_id).await
}
