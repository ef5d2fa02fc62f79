//! Typed parsing and projection of rows into persistence records

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use explorer_common::db::ReferenceKind;

use super::reconcile::{reference_label, ResolvedReferences};
use super::row::{Column, RawRow};
use super::ImportError;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];
const TIME_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];

/// Participant as described by one row
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantRecord {
    pub internal_id: String,
    pub external_id: String,
    pub race_id: Option<i64>,
    pub gender_id: i64,
    pub category_id: i64,
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BiosampleRecord {
    pub biosample_id: String,
    pub biosource_id: i64,
    pub collaborator: Option<String>,
    pub location: Option<String>,
    pub temperature_id: Option<i64>,
    pub tube_type_id: Option<i64>,
    pub study_id: Option<i64>,
    pub draw_time: Option<NaiveTime>,
    pub processing_start_time: Option<NaiveTime>,
    pub freezing_time: Option<NaiveTime>,
    pub processed_by: Option<String>,
    pub notes: Option<String>,
    pub status_id: i64,
    pub status_date: NaiveDate,
}

/// Everything persisted for one input row
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedRow {
    /// 1-based data row number
    pub row: usize,
    pub participant: ParticipantRecord,
    pub biosample: BiosampleRecord,
    pub date_of_sampling: NaiveDate,
}

/// Date and time cells of a row, parsed
#[derive(Debug, Clone, PartialEq)]
pub struct TypedFields {
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_sampling: NaiveDate,
    pub draw_time: Option<NaiveTime>,
    pub processing_start_time: Option<NaiveTime>,
    pub freezing_time: Option<NaiveTime>,
    pub status_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct ParsedRow<'a> {
    pub raw: &'a RawRow,
    pub row_number: usize,
    pub fields: TypedFields,
}

/// Parse a time of day; only hour and minute (and seconds, if given) are kept
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(value, fmt).ok())
}

/// Parse a calendar date
///
/// Local ISO datetimes and RFC 3339 timestamps keep their date part.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

fn invalid(row: &RawRow, row_number: usize, column: Column, reason: &str) -> ImportError {
    ImportError::InvalidCell {
        row: row_number,
        column,
        value: row.get(column).to_string(),
        reason: reason.to_string(),
    }
}

fn optional_date(row: &RawRow, n: usize, column: Column) -> Result<Option<NaiveDate>, ImportError> {
    match row.non_blank(column) {
        None => Ok(None),
        Some(value) => parse_date(value)
            .map(Some)
            .ok_or_else(|| invalid(row, n, column, "not a date")),
    }
}

fn required_date(row: &RawRow, n: usize, column: Column) -> Result<NaiveDate, ImportError> {
    optional_date(row, n, column)?.ok_or(ImportError::MissingRequiredCell { row: n, column })
}

fn optional_time(row: &RawRow, n: usize, column: Column) -> Result<Option<NaiveTime>, ImportError> {
    match row.non_blank(column) {
        None => Ok(None),
        Some(value) => parse_time_of_day(value)
            .map(Some)
            .ok_or_else(|| invalid(row, n, column, "expected HH:MM")),
    }
}

/// Parse the date and time cells of every row; nothing is written
pub fn parse_rows(rows: &[RawRow]) -> Result<Vec<ParsedRow<'_>>, ImportError> {
    rows.iter()
        .enumerate()
        .map(|(index, raw)| {
            let n = index + 1;
            let fields = TypedFields {
                date_of_birth: optional_date(raw, n, Column::DateOfBirth)?,
                date_of_sampling: required_date(raw, n, Column::DateOfSampling)?,
                draw_time: optional_time(raw, n, Column::DrawTime)?,
                processing_start_time: optional_time(raw, n, Column::ProcessingStartTime)?,
                freezing_time: optional_time(raw, n, Column::FreezingTime)?,
                status_date: required_date(raw, n, Column::StatusDate)?,
            };

            Ok(ParsedRow {
                raw,
                row_number: n,
                fields,
            })
        })
        .collect()
}

fn text(row: &RawRow, column: Column) -> Option<String> {
    row.non_blank(column).map(str::to_string)
}

fn reference_id(
    row: &ParsedRow<'_>,
    kind: ReferenceKind,
    resolved: &ResolvedReferences,
) -> Result<Option<i64>, ImportError> {
    let Some(label) = reference_label(row.raw, row.row_number, kind)? else {
        return Ok(None);
    };

    resolved.get(kind, &label).map(Some).ok_or_else(|| {
        ImportError::InternalInconsistency(format!(
            "row {}: {} '{}' was not resolved",
            row.row_number, kind, label
        ))
    })
}

fn required_reference_id(
    row: &ParsedRow<'_>,
    kind: ReferenceKind,
    resolved: &ResolvedReferences,
) -> Result<i64, ImportError> {
    reference_id(row, kind, resolved)?.ok_or_else(|| {
        ImportError::InternalInconsistency(format!(
            "row {}: no {} value for a required column",
            row.row_number, kind
        ))
    })
}

/// Build one [`ProjectedRow`] per parsed row using ids from the check
pub fn project(
    rows: &[ParsedRow<'_>],
    resolved: &ResolvedReferences,
) -> Result<Vec<ProjectedRow>, ImportError> {
    rows.iter()
        .map(|row| {
            let raw = row.raw;

            let participant = ParticipantRecord {
                internal_id: raw.participant_internal_id.clone(),
                external_id: raw.participant_external_id.clone(),
                race_id: reference_id(row, ReferenceKind::Race, resolved)?,
                gender_id: required_reference_id(row, ReferenceKind::Gender, resolved)?,
                category_id: required_reference_id(row, ReferenceKind::Category, resolved)?,
                date_of_birth: row.fields.date_of_birth,
            };

            let biosample = BiosampleRecord {
                biosample_id: raw.biosample_id.clone(),
                biosource_id: required_reference_id(row, ReferenceKind::Biosource, resolved)?,
                collaborator: text(raw, Column::Collaborator),
                location: text(raw, Column::Location),
                temperature_id: reference_id(row, ReferenceKind::Temperature, resolved)?,
                tube_type_id: reference_id(row, ReferenceKind::TubeType, resolved)?,
                study_id: reference_id(row, ReferenceKind::Study, resolved)?,
                draw_time: row.fields.draw_time,
                processing_start_time: row.fields.processing_start_time,
                freezing_time: row.fields.freezing_time,
                processed_by: text(raw, Column::ProcessedBy),
                notes: text(raw, Column::Notes),
                status_id: required_reference_id(row, ReferenceKind::Status, resolved)?,
                status_date: row.fields.status_date,
            };

            Ok(ProjectedRow {
                row: row.row_number,
                participant,
                biosample,
                date_of_sampling: row.fields.date_of_sampling,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::reconcile::check;
    use crate::import::testing::{name, sample_row, MemoryStore};
    use chrono::Timelike;
    use explorer_common::db::Label;

    #[test]
    fn test_draw_time_hour_and_minute() {
        let time = parse_time_of_day("14:30").unwrap();
        assert_eq!(time.hour(), 14);
        assert_eq!(time.minute(), 30);
        assert_eq!(time.second(), 0);
    }

    #[test]
    fn test_time_rejects_garbage() {
        assert!(parse_time_of_day("25:00").is_none());
        assert!(parse_time_of_day("half past two").is_none());
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 5, 6).unwrap();
        assert_eq!(parse_date("2023-05-06"), Some(expected));
        assert_eq!(parse_date("2023/05/06"), Some(expected));
        assert_eq!(parse_date("05/06/2023"), Some(expected));
        assert_eq!(parse_date("2023-05-06T10:00:00Z"), Some(expected));
        assert_eq!(parse_date("06.05.2023"), None);
    }

    #[test]
    fn test_local_datetime_keeps_date() {
        let expected = NaiveDate::from_ymd_opt(2023, 5, 6).unwrap();
        assert_eq!(parse_date("2023-05-06T10:00:00"), Some(expected));
        assert_eq!(parse_date("2023-05-06T10:00:00.250"), Some(expected));
        assert_eq!(parse_date("2023-05-06T10:00"), Some(expected));
        assert_eq!(parse_date("2023-05-06 10:00"), Some(expected));
        assert_eq!(parse_date("2023-05-06 23:59:59"), Some(expected));
        assert_eq!(parse_date("2023-05-06 25:00"), None);
    }

    #[test]
    fn test_bad_time_cell_is_invalid() {
        let mut row = sample_row("BS-1");
        row.freezing_time = "noon".to_string();

        let err = parse_rows(std::slice::from_ref(&row)).unwrap_err();
        assert!(matches!(
            err,
            ImportError::InvalidCell {
                row: 1,
                column: Column::FreezingTime,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_projection_uses_resolved_ids() {
        let store = MemoryStore::seeded();
        let mut second = sample_row("BS-2");
        second.tube_type = String::new();
        let rows = vec![sample_row("BS-1"), second];

        let result = check(&store, &rows).await.unwrap();
        let parsed = parse_rows(&rows).unwrap();
        let projected = project(&parsed, &result.resolved).unwrap();

        assert_eq!(projected.len(), 2);

        let first = &projected[0];
        assert_eq!(first.row, 1);
        assert_eq!(
            Some(first.participant.gender_id),
            store.id_of(ReferenceKind::Gender, &name("F"))
        );
        assert_eq!(
            first.biosample.temperature_id,
            store.id_of(ReferenceKind::Temperature, &Label::Number(-80))
        );
        assert_eq!(first.biosample.draw_time.map(|t| (t.hour(), t.minute())), Some((14, 30)));
        assert_eq!(first.biosample.notes, None);

        assert_eq!(projected[1].biosample.biosample_id, "BS-2");
        assert_eq!(projected[1].biosample.tube_type_id, None);
    }

    #[test]
    fn test_unresolved_label_is_internal_inconsistency() {
        let rows = vec![sample_row("BS-1")];
        let parsed = parse_rows(&rows).unwrap();

        let err = project(&parsed, &ResolvedReferences::default()).unwrap_err();
        assert!(matches!(err, ImportError::InternalInconsistency(_)));
    }
}
