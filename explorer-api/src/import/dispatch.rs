//! Auto-creation of missing reference values
//!
//! Missing labels of allow-listed attributes are created in bulk; any missing
//! label of another attribute stops the import before anything is written.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use explorer_common::db::{Label, ReferenceKind};
use serde::Serialize;
use tracing::info;

use super::lookup::ReferenceStore;
use super::reconcile::ReconciliationResult;
use super::ImportError;

/// Attributes whose missing values may be created without an operator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoCreatePolicy {
    allowed: BTreeSet<ReferenceKind>,
}

impl AutoCreatePolicy {
    pub fn new(allowed: impl IntoIterator<Item = ReferenceKind>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    /// Nothing is created automatically
    pub fn none() -> Self {
        Self::default()
    }

    pub fn allows(&self, kind: ReferenceKind) -> bool {
        self.allowed.contains(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = ReferenceKind> + '_ {
        self.allowed.iter().copied()
    }
}

/// Labels an operator has to create before the upload can succeed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MissingReferences(pub BTreeMap<ReferenceKind, Vec<Label>>);

impl fmt::Display for MissingReferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        write!(f, "Create manually {}", json)
    }
}

/// Create allow-listed missing values; returns the count created per attribute.
///
/// Fails with [`ImportError::UnresolvedReference`] before creating anything
/// when a missing attribute is not allow-listed.
pub async fn dispatch<S>(
    store: &S,
    policy: &AutoCreatePolicy,
    result: &ReconciliationResult,
) -> Result<BTreeMap<ReferenceKind, u64>, ImportError>
where
    S: ReferenceStore + ?Sized,
{
    let manual: BTreeMap<ReferenceKind, Vec<Label>> = result
        .values
        .iter()
        .filter(|(kind, labels)| !labels.is_empty() && !policy.allows(**kind))
        .map(|(kind, labels)| (*kind, labels.clone()))
        .collect();

    if !manual.is_empty() {
        return Err(ImportError::UnresolvedReference(MissingReferences(manual)));
    }

    let mut created = BTreeMap::new();
    for (kind, labels) in &result.values {
        if labels.is_empty() {
            continue;
        }

        let count = store.create_many(*kind, labels).await?;
        info!(attribute = %kind, count, "Auto-created reference values");
        created.insert(*kind, count);
    }

    Ok(created)
}
