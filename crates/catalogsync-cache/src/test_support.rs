//! Shared fixtures for the cache tests

use async_trait::async_trait;
use catalogsync_client::RemoteCatalog;
use catalogsync_common::{Entity, EntityPatch, Error, Result, VersionToken};
use catalogsync_kv::{KvError, KvResult, KvStore, MemoryKvStore};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::Baseline;

/// Three institutions in three cities
pub fn sample_baseline() -> Baseline {
    Baseline::new(vec![
        Entity::new("A", 7, "X College", "Pune")
            .with_metadata("status", "Government")
            .with_keywords(["arts"]),
        Entity::new("B", 112, "Y Institute", "Mumbai")
            .with_metadata("status", "Un-Aided")
            .with_keywords(["engineering", "technology"]),
        Entity::new("C", 3051, "Z Academy", "Nagpur").with_metadata("status", "Government"),
    ])
    .with_version(VersionToken::new("40"))
}

/// A record complete enough to be inserted as a new entity
pub fn complete_patch(id: &str, name: &str, locality: &str) -> EntityPatch {
    let mut search_fields = BTreeMap::new();
    search_fields.insert("nameLocality".to_string(), format!("{name} {locality}"));
    EntityPatch::new(id)
        .with_name(name)
        .with_locality(locality)
        .with_metadata_entry("status", "Government")
        .with_search_fields(search_fields)
}

/// In-memory store whose reads and writes can be made to fail
#[derive(Clone, Default)]
pub struct FlakyKv {
    inner: MemoryKvStore,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    reads: Arc<AtomicUsize>,
}

impl FlakyKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// The backing store, bypassing failure injection
    pub const fn inner(&self) -> &MemoryKvStore {
        &self.inner
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of `get` calls seen, failed or not
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KvStore for FlakyKv {
    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(KvError::Unavailable("injected read failure".into()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> KvResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(KvError::Unavailable("injected write failure".into()));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> KvResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(KvError::Unavailable("injected write failure".into()));
        }
        self.inner.remove(key).await
    }
}

type DeltaRange = (Option<VersionToken>, VersionToken);

/// Remote catalog with a scripted version and delta
pub struct ScriptedRemote {
    version: Mutex<VersionToken>,
    delta: Mutex<Vec<EntityPatch>>,
    last_range: Mutex<Option<DeltaRange>>,
    delay: Mutex<Option<Duration>>,
    fail: AtomicBool,
    version_calls: AtomicUsize,
    delta_calls: AtomicUsize,
}

impl ScriptedRemote {
    pub fn new(version: &str) -> Self {
        Self {
            version: Mutex::new(VersionToken::new(version)),
            delta: Mutex::new(Vec::new()),
            last_range: Mutex::new(None),
            delay: Mutex::new(None),
            fail: AtomicBool::new(false),
            version_calls: AtomicUsize::new(0),
            delta_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_version(&self, version: &str) {
        *self.version.lock() = VersionToken::new(version);
    }

    pub fn set_delta(&self, records: Vec<EntityPatch>) {
        *self.delta.lock() = records;
    }

    /// Delay every call, to exercise timeouts and concurrent callers
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn version_calls(&self) -> usize {
        self.version_calls.load(Ordering::SeqCst)
    }

    pub fn delta_calls(&self) -> usize {
        self.delta_calls.load(Ordering::SeqCst)
    }

    pub fn last_range(&self) -> Option<DeltaRange> {
        self.last_range.lock().clone()
    }

    async fn pause(&self) -> Result<()> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::ConnectionFailed("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteCatalog for ScriptedRemote {
    async fn fetch_version(&self) -> Result<VersionToken> {
        self.version_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await?;
        Ok(self.version.lock().clone())
    }

    async fn fetch_delta(
        &self,
        from: Option<&VersionToken>,
        to: &VersionToken,
    ) -> Result<Vec<EntityPatch>> {
        self.delta_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_range.lock() = Some((from.cloned(), to.clone()));
        self.pause().await?;
        Ok(self.delta.lock().clone())
    }
}
