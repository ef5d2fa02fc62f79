//! Reference lookup seam
//!
//! The import core only needs two operations from the store: exact lookup of
//! one label and all-or-nothing creation of a batch. A miss is `Ok(None)`,
//! never an error.

use async_trait::async_trait;
use explorer_common::db::{Label, ReferenceKind, ReferenceRow};

use super::ImportError;
use crate::db::{reference, SqliteStore};

#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Row whose unique name (or number, for temperatures) equals `label`
    async fn find_by_label(
        &self,
        kind: ReferenceKind,
        label: &Label,
    ) -> Result<Option<ReferenceRow>, ImportError>;

    /// Insert every label; returns how many were created
    async fn create_many(&self, kind: ReferenceKind, labels: &[Label]) -> Result<u64, ImportError>;
}

#[async_trait]
impl ReferenceStore for SqliteStore {
    async fn find_by_label(
        &self,
        kind: ReferenceKind,
        label: &Label,
    ) -> Result<Option<ReferenceRow>, ImportError> {
        reference::find_by_label(self.pool(), kind, label)
            .await
            .map_err(|e| ImportError::Persistence(format!("looking up {} '{}': {}", kind, label, e)))
    }

    async fn create_many(&self, kind: ReferenceKind, labels: &[Label]) -> Result<u64, ImportError> {
        reference::create_many(self.pool(), kind, labels)
            .await
            .map_err(|e| ImportError::Persistence(format!("creating {} values: {}", kind, e)))
    }
}
