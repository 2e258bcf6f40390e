//! Update ledger: persisted delta records replayed over the baseline
//!
//! The whole ledger is one JSON array under a single key and is rewritten
//! as a unit on every append. One record is kept per id, in the position of
//! its first appearance: a newer record for an id is folded over the stored
//! one field by field, so replaying the ledger reproduces the live view.

use catalogsync_common::{EntityId, EntityPatch, Error, Result};
use catalogsync_kv::KvStore;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub struct UpdateLedger {
    kv: Arc<dyn KvStore>,
    key: String,
    /// Records as last read or written; `None` until the first successful read
    records: Mutex<Option<Vec<EntityPatch>>>,
}

impl UpdateLedger {
    pub fn new(kv: Arc<dyn KvStore>, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
            records: Mutex::new(None),
        }
    }

    /// Persisted records, oldest first
    ///
    /// Read from the store once per process and cached. A missing or corrupt
    /// value yields an empty ledger; a store failure also yields an empty
    /// ledger but is not cached, so the next call reads again.
    pub async fn load(&self) -> Vec<EntityPatch> {
        let mut cached = self.records.lock().await;
        match self.ensure_loaded(&mut cached).await {
            Ok(records) => records.clone(),
            Err(e) => {
                warn!("Update ledger unavailable, continuing without it: {}", e);
                Vec::new()
            }
        }
    }

    /// Merge `incoming` into the persisted ledger and write it back
    ///
    /// Returns the number of records now stored.
    ///
    /// # Errors
    /// Fails without writing anything if the current ledger cannot be read,
    /// and fails if the new ledger cannot be written; the cached copy is only
    /// replaced after a successful write.
    pub async fn append(&self, incoming: &[EntityPatch]) -> Result<usize> {
        let mut cached = self.records.lock().await;
        let current = self.ensure_loaded(&mut cached).await?;

        let merged = fold_by_id(current.clone(), incoming);
        let raw =
            serde_json::to_string(&merged).map_err(|e| Error::Serialization(e.to_string()))?;
        self.kv.set(&self.key, &raw).await?;

        debug!(
            "Persisted update ledger: {} incoming, {} stored",
            incoming.len(),
            merged.len()
        );
        *current = merged;
        Ok(current.len())
    }

    async fn ensure_loaded<'a>(
        &self,
        cached: &'a mut Option<Vec<EntityPatch>>,
    ) -> Result<&'a mut Vec<EntityPatch>> {
        if cached.is_none() {
            let raw = self.kv.get(&self.key).await?;
            *cached = Some(raw.map_or_else(Vec::new, |raw| self.decode(&raw)));
        }
        Ok(cached.get_or_insert_with(Vec::new))
    }

    fn decode(&self, raw: &str) -> Vec<EntityPatch> {
        let values: Vec<Value> = match serde_json::from_str(raw) {
            Ok(values) => values,
            Err(e) => {
                warn!("{}", Error::corrupt(&self.key, e));
                return Vec::new();
            }
        };
        values
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping malformed ledger record: {}", e);
                    None
                }
            })
            .collect()
    }
}

/// Fold `incoming` into `records`, one record per id, newest field wins
fn fold_by_id(mut records: Vec<EntityPatch>, incoming: &[EntityPatch]) -> Vec<EntityPatch> {
    let mut positions: HashMap<EntityId, usize> = records
        .iter()
        .enumerate()
        .map(|(pos, r)| (r.id.clone(), pos))
        .collect();

    for record in incoming {
        if let Some(&pos) = positions.get(&record.id) {
            records[pos].merge_from(record);
        } else {
            positions.insert(record.id.clone(), records.len());
            records.push(record.clone());
        }
    }
    records
}
