//! In-memory store and row fixtures for import unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use explorer_common::db::{Label, ReferenceKind, ReferenceRow};

use super::lookup::ReferenceStore;
use super::persist::{PersistOutcome, SampleSink};
use super::project::ProjectedRow;
use super::row::RawRow;
use super::ImportError;

pub(crate) fn name(s: &str) -> Label {
    Label::Name(s.to_string())
}

/// Row whose reference cells all match [`MemoryStore::seeded`]
pub(crate) fn sample_row(biosample_id: &str) -> RawRow {
    RawRow {
        participant_internal_id: "P-1".to_string(),
        participant_external_id: "EXT-1".to_string(),
        biosample_id: biosample_id.to_string(),
        study: "COHORT-A".to_string(),
        race: "Asian".to_string(),
        gender: "F".to_string(),
        date_of_birth: "1980-01-02".to_string(),
        date_of_sampling: "2023-05-06".to_string(),
        relationship: "Proband".to_string(),
        tube_type: "EDTA".to_string(),
        biosource: "Blood".to_string(),
        draw_time: "14:30".to_string(),
        location: "Freezer 3".to_string(),
        storage_temperature: "-80".to_string(),
        status: "Stored".to_string(),
        status_date: "2023-05-07".to_string(),
        ..Default::default()
    }
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    rows: Mutex<HashMap<(ReferenceKind, Label), i64>>,
    next_id: AtomicUsize,
    lookups: AtomicUsize,
    /// Report creations as successful without storing them
    discard_creates: bool,
    pub created: Mutex<Vec<(ReferenceKind, Vec<Label>)>>,
    pub persisted: Mutex<Vec<ProjectedRow>>,
}

impl MemoryStore {
    pub fn seeded() -> Self {
        let store = Self::default();
        for (kind, label) in [
            (ReferenceKind::Race, name("Asian")),
            (ReferenceKind::Gender, name("F")),
            (ReferenceKind::Category, name("Proband")),
            (ReferenceKind::TubeType, name("EDTA")),
            (ReferenceKind::Biosource, name("Blood")),
            (ReferenceKind::Temperature, Label::Number(-80)),
            (ReferenceKind::Status, name("Stored")),
            (ReferenceKind::Study, name("COHORT-A")),
        ] {
            store.insert(kind, label);
        }
        store
    }

    /// Store whose `create_many` succeeds but inserts nothing
    pub fn discarding_creates(mut self) -> Self {
        self.discard_creates = true;
        self
    }

    fn insert(&self, kind: ReferenceKind, label: Label) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1;
        self.rows.lock().unwrap().insert((kind, label), id);
        id
    }

    pub fn id_of(&self, kind: ReferenceKind, label: &Label) -> Option<i64> {
        self.rows.lock().unwrap().get(&(kind, label.clone())).copied()
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReferenceStore for MemoryStore {
    async fn find_by_label(
        &self,
        kind: ReferenceKind,
        label: &Label,
    ) -> Result<Option<ReferenceRow>, ImportError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.id_of(kind, label).map(|id| ReferenceRow {
            id,
            label: label.clone(),
        }))
    }

    async fn create_many(&self, kind: ReferenceKind, labels: &[Label]) -> Result<u64, ImportError> {
        self.created.lock().unwrap().push((kind, labels.to_vec()));
        if self.discard_creates {
            return Ok(labels.len() as u64);
        }
        for label in labels {
            self.insert(kind, label.clone());
        }
        Ok(labels.len() as u64)
    }
}

#[async_trait]
impl SampleSink for MemoryStore {
    async fn persist(&self, rows: &[ProjectedRow]) -> Result<PersistOutcome, ImportError> {
        self.persisted.lock().unwrap().extend_from_slice(rows);
        Ok(PersistOutcome {
            participants_created: 1,
            participants_reused: 0,
            biosamples_created: rows.len() as u64,
            links_created: rows.len() as u64,
        })
    }
}
