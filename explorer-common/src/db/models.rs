//! Database models
//!
//! Row shapes for the reference vocabularies and user accounts, plus
//! [`ReferenceKind`], the closed set of controlled-vocabulary attributes a
//! biosample row refers to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Controlled-vocabulary attribute referenced by an imported row.
///
/// Serialized names match the keys used in reconciliation payloads and in
/// the `/api/reference/:kind` routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceKind {
    Race,
    Gender,
    Category,
    TubeType,
    Biosource,
    Temperature,
    Status,
    Study,
}

impl ReferenceKind {
    /// Every attribute, in the order rows are checked
    pub const ALL: [ReferenceKind; 8] = [
        ReferenceKind::Race,
        ReferenceKind::Gender,
        ReferenceKind::Category,
        ReferenceKind::TubeType,
        ReferenceKind::Biosource,
        ReferenceKind::Temperature,
        ReferenceKind::Status,
        ReferenceKind::Study,
    ];

    /// Attribute name as it appears in JSON and URLs
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Race => "race",
            Self::Gender => "gender",
            Self::Category => "category",
            Self::TubeType => "tubeType",
            Self::Biosource => "biosource",
            Self::Temperature => "temperature",
            Self::Status => "status",
            Self::Study => "study",
        }
    }

    /// Backing table name
    pub const fn table_name(&self) -> &'static str {
        match self {
            Self::Race => "race",
            Self::Gender => "gender",
            Self::Category => "category",
            Self::TubeType => "tube_type",
            Self::Biosource => "biosource",
            Self::Temperature => "temperature",
            Self::Status => "status",
            Self::Study => "study",
        }
    }

    /// Unique label column: `number` for temperature, `name` otherwise
    pub const fn label_column(&self) -> &'static str {
        if self.is_numeric() {
            "number"
        } else {
            "name"
        }
    }

    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Temperature)
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown reference attribute: {}", s))
    }
}

/// Unique label of a reference row: a name, or a number for temperatures.
///
/// Serializes as `{"name": "..."}` or `{"number": n}`, the same shape a
/// create request carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Name(String),
    Number(i64),
}

impl Label {
    /// Build a label for `kind` from raw cell text.
    ///
    /// Names are taken verbatim. Numbers are trimmed and parsed; integral
    /// decimals such as `-80.0` are accepted and equal `-80`.
    pub fn parse(kind: ReferenceKind, raw: &str) -> Result<Self, String> {
        if !kind.is_numeric() {
            return Ok(Label::Name(raw.to_string()));
        }

        let trimmed = raw.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return Ok(Label::Number(n));
        }

        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Ok(Label::Number(f as i64))
            }
            Ok(_) => Err(format!("'{}' is not a whole number", raw)),
            Err(_) => Err(format!("'{}' is not a number", raw)),
        }
    }

    /// Whether this label's variant fits `kind`
    pub fn fits(&self, kind: ReferenceKind) -> bool {
        matches!(
            (self, kind.is_numeric()),
            (Label::Name(_), false) | (Label::Number(_), true)
        )
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Name(name) => f.write_str(name),
            Label::Number(n) => write!(f, "{}", n),
        }
    }
}

/// One row of a reference table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceRow {
    pub id: i64,
    #[serde(flatten)]
    pub label: Label,
}

/// User account, without credentials
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub is_admin: bool,
}
