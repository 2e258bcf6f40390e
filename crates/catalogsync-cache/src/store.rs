//! In-memory merged view: baseline plus update records
//!
//! One merge routine serves both the startup replay of the ledger and live
//! deltas. Readers get an `Arc` snapshot of the entity list; applying a
//! delta copies the list on write, so a snapshot never changes under a
//! reader.

use crate::baseline::Baseline;
use catalogsync_common::{Entity, EntityId, EntityPatch};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a batch of update records did to the view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Records merged over an existing entity
    pub updated: usize,
    /// Complete records admitted as new entities
    pub inserted: usize,
    /// Incomplete records for unknown ids, dropped
    pub discarded: usize,
}

impl ApplyReport {
    /// Records that changed the view
    #[must_use]
    pub const fn applied(&self) -> usize {
        self.updated + self.inserted
    }
}

#[derive(Debug, Default)]
struct MergedView {
    entities: Arc<Vec<Entity>>,
    /// Position of every id in `entities`
    index: HashMap<EntityId, usize>,
}

impl MergedView {
    fn from_baseline(baseline: &Baseline) -> Self {
        let entities = baseline.entities().to_vec();
        let index = entities
            .iter()
            .enumerate()
            .map(|(pos, e)| (e.id.clone(), pos))
            .collect();
        Self {
            entities: Arc::new(entities),
            index,
        }
    }

    /// Merge one record: override an existing entity field by field, insert
    /// a complete record for a new id, drop anything else.
    fn merge(&mut self, record: &EntityPatch, report: &mut ApplyReport) {
        if let Some(&pos) = self.index.get(&record.id) {
            Arc::make_mut(&mut self.entities)[pos].apply(record);
            report.updated += 1;
            return;
        }

        match record.clone().into_entity() {
            Ok(entity) => {
                let entities = Arc::make_mut(&mut self.entities);
                self.index.insert(entity.id.clone(), entities.len());
                entities.push(entity);
                report.inserted += 1;
            }
            Err(e) => {
                warn!("Discarding update record: {}", e);
                report.discarded += 1;
            }
        }
    }
}

/// Single source of truth for catalog reads
#[derive(Debug, Default)]
pub struct CacheStore {
    view: RwLock<MergedView>,
}

impl CacheStore {
    /// Store holding exactly the baseline
    #[must_use]
    pub fn from_baseline(baseline: &Baseline) -> Self {
        Self {
            view: RwLock::new(MergedView::from_baseline(baseline)),
        }
    }

    /// Store built from the baseline with `ledger` replayed oldest first
    #[must_use]
    pub fn build(baseline: &Baseline, ledger: &[EntityPatch]) -> Self {
        let store = Self::from_baseline(baseline);
        let report = store.apply_delta(ledger);
        debug!(
            "Built catalog view: {} baseline entities, {} ledger records ({} updated, {} inserted, {} discarded)",
            baseline.len(),
            ledger.len(),
            report.updated,
            report.inserted,
            report.discarded
        );
        store
    }

    /// Current merged sequence, stable until the next `apply_delta`
    #[must_use]
    pub fn get_all(&self) -> Arc<Vec<Entity>> {
        Arc::clone(&self.view.read().entities)
    }

    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<Entity> {
        let view = self.view.read();
        view.index.get(id).map(|&pos| view.entities[pos].clone())
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.view.read().index.contains_key(id)
    }

    /// Apply update records in order using the shallow-override rule
    pub fn apply_delta(&self, records: &[EntityPatch]) -> ApplyReport {
        let mut report = ApplyReport::default();
        if records.is_empty() {
            return report;
        }
        let mut view = self.view.write();
        for record in records {
            view.merge(record, &mut report);
        }
        report
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.view.read().entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.view.read().entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{complete_patch, sample_baseline};

    #[test]
    fn test_baseline_purity() {
        let baseline = sample_baseline();
        let store = CacheStore::build(&baseline, &[]);

        assert_eq!(store.get_all().as_slice(), baseline.entities());
    }

    #[test]
    fn test_override_retains_unspecified_fields() {
        let store = CacheStore::from_baseline(&sample_baseline());
        let report =
            store.apply_delta(&[EntityPatch::new("A").with_metadata_entry("status", "Un-Aided")]);

        assert_eq!(report.updated, 1);
        let a = store.get_by_id("A").unwrap();
        assert_eq!(a.name, "X College");
        assert_eq!(a.locality, "Pune");
        assert_eq!(a.status(), Some("Un-Aided"));
    }

    #[test]
    fn test_idempotent_merge() {
        let record = EntityPatch::new("B")
            .with_name("Y Institute of Technology")
            .with_code(113);
        let once = CacheStore::from_baseline(&sample_baseline());
        once.apply_delta(std::slice::from_ref(&record));
        let twice = CacheStore::from_baseline(&sample_baseline());
        twice.apply_delta(&[record.clone(), record]);

        assert_eq!(once.get_all(), twice.get_all());
    }

    #[test]
    fn test_later_record_wins_per_field() {
        let store = CacheStore::from_baseline(&sample_baseline());
        store.apply_delta(&[
            EntityPatch::new("C").with_name("First").with_code(9000),
            EntityPatch::new("C").with_name("Second"),
        ]);

        let c = store.get_by_id("C").unwrap();
        assert_eq!(c.name, "Second");
        assert_eq!(c.code, Some(9000));
    }

    #[test]
    fn test_incomplete_insert_rejected() {
        let store = CacheStore::from_baseline(&sample_baseline());
        let before = store.len();
        let report = store.apply_delta(&[
            EntityPatch::new("N1").with_name("No Locality"),
            EntityPatch::new("N2")
                .with_name("No Metadata")
                .with_locality("Pune"),
        ]);

        assert_eq!(report.discarded, 2);
        assert_eq!(store.len(), before);
        assert!(store.get_all().iter().all(|e| !e.id.as_str().starts_with('N')));
    }

    #[test]
    fn test_complete_insert_appended() {
        let store = CacheStore::from_baseline(&sample_baseline());
        let report = store.apply_delta(&[complete_patch("D", "New College", "Thane")]);

        assert_eq!(report.inserted, 1);
        let all = store.get_all();
        assert_eq!(all.last().map(|e| e.id.as_str()), Some("D"));
        assert!(store.contains("D"));
    }

    #[test]
    fn test_snapshot_stable_across_delta() {
        let store = CacheStore::from_baseline(&sample_baseline());
        let snapshot = store.get_all();

        store.apply_delta(&[EntityPatch::new("A").with_name("Renamed")]);

        assert_eq!(snapshot[0].name, "X College");
        assert_eq!(store.get_all()[0].name, "Renamed");
    }

    #[test]
    fn test_empty_store() {
        let store = CacheStore::default();
        assert!(store.is_empty());
        assert!(store.get_by_id("A").is_none());
        assert!(store.get_all().is_empty());
    }
}
