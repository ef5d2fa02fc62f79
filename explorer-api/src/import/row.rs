//! CSV rows as read from an upload
//!
//! Every cell is kept as text. Typed parsing happens later, after the
//! reference check, so the error a user sees first is the one about the
//! structure of the file.

use std::io::Read;

use explorer_common::ReferenceKind;
use serde::Deserialize;

use super::ImportError;

const UTF8_BOM: char = '\u{feff}';

/// Columns of a participant/biosample import file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    ParticipantInternalId,
    ParticipantExternalId,
    BiosampleId,
    Study,
    Collaborator,
    Race,
    Gender,
    DateOfBirth,
    DateOfSampling,
    Diagnosis,
    Relationship,
    TubeType,
    Biosource,
    DrawTime,
    ProcessingStartTime,
    FreezingTime,
    ProcessedBy,
    Location,
    StorageTemperature,
    Notes,
    Status,
    StatusDate,
}

impl Column {
    /// Header order of a template file
    pub const ALL: [Column; 22] = [
        Column::ParticipantInternalId,
        Column::ParticipantExternalId,
        Column::BiosampleId,
        Column::Study,
        Column::Collaborator,
        Column::Race,
        Column::Gender,
        Column::DateOfBirth,
        Column::DateOfSampling,
        Column::Diagnosis,
        Column::Relationship,
        Column::TubeType,
        Column::Biosource,
        Column::DrawTime,
        Column::ProcessingStartTime,
        Column::FreezingTime,
        Column::ProcessedBy,
        Column::Location,
        Column::StorageTemperature,
        Column::Notes,
        Column::Status,
        Column::StatusDate,
    ];

    pub const fn header(&self) -> &'static str {
        match self {
            Self::ParticipantInternalId => "ParticipantInternalID",
            Self::ParticipantExternalId => "ParticipantExternalID",
            Self::BiosampleId => "BiosampleID",
            Self::Study => "Study",
            Self::Collaborator => "Collaborator",
            Self::Race => "Race",
            Self::Gender => "Gender",
            Self::DateOfBirth => "DateOfBirth",
            Self::DateOfSampling => "DateOfSampling",
            Self::Diagnosis => "Diagnosis",
            Self::Relationship => "Relationship",
            Self::TubeType => "TubeType",
            Self::Biosource => "Biosource",
            Self::DrawTime => "DrawTime",
            Self::ProcessingStartTime => "ProcessingStartTime",
            Self::FreezingTime => "FreezingTime",
            Self::ProcessedBy => "ProcessedBy",
            Self::Location => "Location",
            Self::StorageTemperature => "StorageTemperature",
            Self::Notes => "Notes",
            Self::Status => "Status",
            Self::StatusDate => "StatusDate",
        }
    }

    /// Cells in these columns may be left empty
    pub const fn is_optional(&self) -> bool {
        matches!(
            self,
            Self::Study
                | Self::Collaborator
                | Self::Race
                | Self::DateOfBirth
                | Self::Diagnosis
                | Self::TubeType
                | Self::DrawTime
                | Self::ProcessingStartTime
                | Self::FreezingTime
                | Self::ProcessedBy
                | Self::Location
                | Self::StorageTemperature
                | Self::Notes
        )
    }

    /// Column holding the label for a reference attribute
    pub const fn for_reference(kind: ReferenceKind) -> Column {
        match kind {
            ReferenceKind::Race => Self::Race,
            ReferenceKind::Gender => Self::Gender,
            ReferenceKind::Category => Self::Relationship,
            ReferenceKind::TubeType => Self::TubeType,
            ReferenceKind::Biosource => Self::Biosource,
            ReferenceKind::Temperature => Self::StorageTemperature,
            ReferenceKind::Status => Self::Status,
            ReferenceKind::Study => Self::Study,
        }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.header())
    }
}

/// One data row, every cell as text
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRow {
    #[serde(rename = "ParticipantInternalID")]
    pub participant_internal_id: String,
    #[serde(rename = "ParticipantExternalID")]
    pub participant_external_id: String,
    #[serde(rename = "BiosampleID")]
    pub biosample_id: String,
    #[serde(rename = "Study")]
    pub study: String,
    #[serde(rename = "Collaborator")]
    pub collaborator: String,
    #[serde(rename = "Race")]
    pub race: String,
    #[serde(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "DateOfBirth")]
    pub date_of_birth: String,
    #[serde(rename = "DateOfSampling")]
    pub date_of_sampling: String,
    #[serde(rename = "Diagnosis")]
    pub diagnosis: String,
    #[serde(rename = "Relationship")]
    pub relationship: String,
    #[serde(rename = "TubeType")]
    pub tube_type: String,
    #[serde(rename = "Biosource")]
    pub biosource: String,
    #[serde(rename = "DrawTime")]
    pub draw_time: String,
    #[serde(rename = "ProcessingStartTime")]
    pub processing_start_time: String,
    #[serde(rename = "FreezingTime")]
    pub freezing_time: String,
    #[serde(rename = "ProcessedBy")]
    pub processed_by: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "StorageTemperature")]
    pub storage_temperature: String,
    #[serde(rename = "Notes")]
    pub notes: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "StatusDate")]
    pub status_date: String,
}

impl RawRow {
    pub fn get(&self, column: Column) -> &str {
        match column {
            Column::ParticipantInternalId => &self.participant_internal_id,
            Column::ParticipantExternalId => &self.participant_external_id,
            Column::BiosampleId => &self.biosample_id,
            Column::Study => &self.study,
            Column::Collaborator => &self.collaborator,
            Column::Race => &self.race,
            Column::Gender => &self.gender,
            Column::DateOfBirth => &self.date_of_birth,
            Column::DateOfSampling => &self.date_of_sampling,
            Column::Diagnosis => &self.diagnosis,
            Column::Relationship => &self.relationship,
            Column::TubeType => &self.tube_type,
            Column::Biosource => &self.biosource,
            Column::DrawTime => &self.draw_time,
            Column::ProcessingStartTime => &self.processing_start_time,
            Column::FreezingTime => &self.freezing_time,
            Column::ProcessedBy => &self.processed_by,
            Column::Location => &self.location,
            Column::StorageTemperature => &self.storage_temperature,
            Column::Notes => &self.notes,
            Column::Status => &self.status,
            Column::StatusDate => &self.status_date,
        }
    }

    /// Cell text, or `None` when blank
    pub fn non_blank(&self, column: Column) -> Option<&str> {
        let value = self.get(column);
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// Read every data row of a comma-separated upload.
///
/// Header names are trimmed and a leading byte-order mark is dropped. Every
/// known column must be present; extra columns are ignored.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<RawRow>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::None)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| ImportError::Csv(e.to_string()))?;

    let cleaned: csv::StringRecord = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches(UTF8_BOM) } else { h };
            h.trim().to_string()
        })
        .collect();

    for column in Column::ALL {
        if !cleaned.iter().any(|h| h == column.header()) {
            return Err(ImportError::MissingColumn(column));
        }
    }

    csv_reader.set_headers(cleaned);

    let mut rows = Vec::new();
    for (index, record) in csv_reader.deserialize::<RawRow>().enumerate() {
        let row = record.map_err(|e| ImportError::Csv(format!("row {}: {}", index + 1, e)))?;
        rows.push(row);
    }

    Ok(rows)
}
