//! Reconciliation of imported labels against the reference tables
//!
//! One pass over all rows: required cells are validated first, then every
//! reference cell is looked up once per distinct label. Hits go into
//! [`ResolvedReferences`], misses into the per-attribute `values` lists.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use explorer_common::db::{Label, ReferenceKind};
use serde::Serialize;
use tracing::debug;

use super::lookup::ReferenceStore;
use super::row::{Column, RawRow};
use super::ImportError;

/// Label -> id map produced by the check and consumed by the projector
#[derive(Debug, Clone, Default)]
pub struct ResolvedReferences {
    ids: HashMap<(ReferenceKind, Label), i64>,
}

impl ResolvedReferences {
    pub fn get(&self, kind: ReferenceKind, label: &Label) -> Option<i64> {
        self.ids.get(&(kind, label.clone())).copied()
    }

    pub fn insert(&mut self, kind: ReferenceKind, label: Label, id: i64) {
        self.ids.insert((kind, label), id);
    }

    pub fn contains(&self, kind: ReferenceKind, label: &Label) -> bool {
        self.ids.contains_key(&(kind, label.clone()))
    }
}

/// Outcome of checking every row
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    /// True only if every reference cell of every row resolved
    pub all_found: bool,
    /// Distinct missing labels per attribute, in first-seen order
    pub values: BTreeMap<ReferenceKind, Vec<Label>>,
    #[serde(skip)]
    pub resolved: ResolvedReferences,
}

/// Abort on the first empty required cell, scanning row by row
pub fn validate_required(rows: &[RawRow]) -> Result<(), ImportError> {
    for (index, row) in rows.iter().enumerate() {
        for column in Column::ALL {
            if !column.is_optional() && row.non_blank(column).is_none() {
                return Err(ImportError::MissingRequiredCell {
                    row: index + 1,
                    column,
                });
            }
        }
    }

    Ok(())
}

/// Label for `kind` in `row`, or `None` when the cell is blank
pub(crate) fn reference_label(
    row: &RawRow,
    row_number: usize,
    kind: ReferenceKind,
) -> Result<Option<Label>, ImportError> {
    let column = Column::for_reference(kind);

    let Some(raw) = row.non_blank(column) else {
        return Ok(None);
    };

    Label::parse(kind, raw)
        .map(Some)
        .map_err(|reason| ImportError::InvalidCell {
            row: row_number,
            column,
            value: raw.to_string(),
            reason,
        })
}

/// Check every row against the reference tables.
///
/// Blank optional reference cells are neither looked up nor proposed.
pub async fn check<S>(store: &S, rows: &[RawRow]) -> Result<ReconciliationResult, ImportError>
where
    S: ReferenceStore + ?Sized,
{
    validate_required(rows)?;

    let mut result = ReconciliationResult {
        all_found: true,
        ..Default::default()
    };
    let mut queued: BTreeSet<(ReferenceKind, Label)> = BTreeSet::new();

    for (index, row) in rows.iter().enumerate() {
        for kind in ReferenceKind::ALL {
            let Some(label) = reference_label(row, index + 1, kind)? else {
                continue;
            };

            if result.resolved.contains(kind, &label) || queued.contains(&(kind, label.clone())) {
                continue;
            }

            match store.find_by_label(kind, &label).await? {
                Some(found) => result.resolved.insert(kind, label, found.id),
                None => {
                    debug!(attribute = %kind, label = %label, "Reference value missing");
                    result.all_found = false;
                    queued.insert((kind, label.clone()));
                    result.values.entry(kind).or_default().push(label);
                }
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::testing::{name, sample_row, MemoryStore};

    #[tokio::test]
    async fn test_all_present_means_all_found() {
        let store = MemoryStore::seeded();
        let rows = vec![sample_row("BS-1"), sample_row("BS-2")];

        let result = check(&store, &rows).await.unwrap();

        assert!(result.all_found);
        assert!(result.values.is_empty());
        assert_eq!(
            result.resolved.get(ReferenceKind::TubeType, &name("EDTA")),
            store.id_of(ReferenceKind::TubeType, &name("EDTA"))
        );
    }

    #[tokio::test]
    async fn test_repeated_missing_value_proposed_once() {
        let store = MemoryStore::seeded();
        let mut rows = vec![sample_row("BS-1"), sample_row("BS-2"), sample_row("BS-3")];
        for row in &mut rows {
            row.tube_type = "Heparin".to_string();
        }

        let result = check(&store, &rows).await.unwrap();

        assert!(!result.all_found);
        assert_eq!(result.values.len(), 1);
        assert_eq!(result.values[&ReferenceKind::TubeType], vec![name("Heparin")]);
    }

    #[tokio::test]
    async fn test_temperature_compared_numerically() {
        let store = MemoryStore::seeded();
        let mut a = sample_row("BS-1");
        a.storage_temperature = "-196".to_string();
        let mut b = sample_row("BS-2");
        b.storage_temperature = "-196.0".to_string();

        let result = check(&store, &[a, b]).await.unwrap();

        assert_eq!(
            result.values[&ReferenceKind::Temperature],
            vec![Label::Number(-196)]
        );
    }

    #[tokio::test]
    async fn test_missing_required_cell_names_column() {
        let store = MemoryStore::seeded();
        let mut bad = sample_row("BS-2");
        bad.gender = "  ".to_string();

        let err = check(&store, &[sample_row("BS-1"), bad]).await.unwrap_err();

        match err {
            ImportError::MissingRequiredCell { row, column } => {
                assert_eq!(row, 2);
                assert_eq!(column, Column::Gender);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.lookup_count(), 0, "nothing looked up before validation");
    }

    #[tokio::test]
    async fn test_blank_optional_reference_skipped() {
        let store = MemoryStore::seeded();
        let mut row = sample_row("BS-1");
        row.race = String::new();
        row.study = String::new();

        let result = check(&store, &[row]).await.unwrap();

        assert!(result.all_found);
        assert!(!result.resolved.contains(ReferenceKind::Race, &name("")));
    }

    #[tokio::test]
    async fn test_non_numeric_temperature_is_invalid_cell() {
        let store = MemoryStore::seeded();
        let mut row = sample_row("BS-1");
        row.storage_temperature = "cold".to_string();

        let err = check(&store, &[row]).await.unwrap_err();
        assert!(matches!(
            err,
            ImportError::InvalidCell {
                column: Column::StorageTemperature,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_each_distinct_label_looked_up_once() {
        let store = MemoryStore::seeded();
        let rows: Vec<RawRow> = (0..5).map(|i| sample_row(&format!("BS-{}", i))).collect();

        check(&store, &rows).await.unwrap();

        // 8 attributes, all rows share the same labels
        assert_eq!(store.lookup_count(), 8);
    }
}
