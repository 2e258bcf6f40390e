//! Catalog context: single-flight bootstrap and the public entry point
//!
//! A [`Catalog`] is built once at process start and handed to every
//! consumer. The first [`Catalog::ensure_ready`] call starts the bootstrap
//! (ledger load, merge over the baseline, one throttled sync cycle);
//! concurrent callers await that same bootstrap, later callers get the
//! ready store immediately.

use crate::baseline::Baseline;
use crate::ledger::UpdateLedger;
use crate::stats::{SyncStats, SyncStatsSnapshot};
use crate::store::CacheStore;
use crate::sync::{SyncOutcome, SyncScheduler};
use crate::version::{Freshness, VersionTracker};
use crate::KvKeys;
use catalogsync_client::RemoteCatalog;
use catalogsync_common::Config;
use catalogsync_kv::KvStore;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{error, info};

type Bootstrap = Shared<BoxFuture<'static, Option<Arc<CacheStore>>>>;

enum InitState {
    NotStarted,
    /// Resolves to `None` if the bootstrap task panicked
    InFlight(Bootstrap),
    Ready(Arc<CacheStore>),
}

struct CatalogInner {
    baseline: Baseline,
    ledger: Arc<UpdateLedger>,
    tracker: Arc<VersionTracker>,
    scheduler: SyncScheduler,
    stats: Arc<SyncStats>,
    last_outcome: Mutex<Option<Arc<SyncOutcome>>>,
}

impl CatalogInner {
    async fn bootstrap(self: Arc<Self>) -> Arc<CacheStore> {
        let records = self.ledger.load().await;
        let store = Arc::new(CacheStore::build(&self.baseline, &records));
        let outcome = self.sync(&store, Utc::now()).await;
        info!(
            "Catalog ready: {} entities ({} baseline, {} ledger records), sync {}",
            store.len(),
            self.baseline.len(),
            records.len(),
            outcome
        );
        store
    }

    async fn sync(&self, store: &CacheStore, now: DateTime<Utc>) -> Arc<SyncOutcome> {
        let outcome = Arc::new(self.scheduler.maybe_sync(store, now).await);
        *self.last_outcome.lock() = Some(Arc::clone(&outcome));
        outcome
    }
}

/// Offline-first catalog: baseline, persisted updates and remote sync
pub struct Catalog {
    inner: Arc<CatalogInner>,
    state: Mutex<InitState>,
}

impl Catalog {
    pub fn new(
        baseline: Baseline,
        kv: Arc<dyn KvStore>,
        remote: Arc<dyn RemoteCatalog>,
        config: &Config,
    ) -> Self {
        let keys = KvKeys::new(&config.catalog.namespace);
        let ledger = Arc::new(UpdateLedger::new(Arc::clone(&kv), keys.ledger));
        let tracker = Arc::new(VersionTracker::new(kv, keys.version, keys.last_check));
        let stats = Arc::new(SyncStats::default());
        let scheduler = SyncScheduler::new(
            remote,
            Arc::clone(&ledger),
            Arc::clone(&tracker),
            baseline.version().cloned(),
            config.sync.clone(),
            Arc::clone(&stats),
        );

        Self {
            inner: Arc::new(CatalogInner {
                baseline,
                ledger,
                tracker,
                scheduler,
                stats,
                last_outcome: Mutex::new(None),
            }),
            state: Mutex::new(InitState::NotStarted),
        }
    }

    /// The ready store, bootstrapping it on first use
    ///
    /// Never fails: network and persistence problems only make the view
    /// staler. If the bootstrap task itself dies, callers get a
    /// baseline-only store and the next call starts a new bootstrap.
    pub async fn ensure_ready(&self) -> Arc<CacheStore> {
        let flight = {
            let mut state = self.state.lock();
            match &*state {
                InitState::Ready(store) => return Arc::clone(store),
                InitState::InFlight(flight) => flight.clone(),
                InitState::NotStarted => {
                    let inner = Arc::clone(&self.inner);
                    // spawned so a dropped caller cannot cancel it for the others
                    let task = tokio::spawn(inner.bootstrap());
                    let flight = async move { task.await.ok() }.boxed().shared();
                    *state = InitState::InFlight(flight.clone());
                    flight
                }
            }
        };

        let result = flight.clone().await;

        let mut state = self.state.lock();
        let current = match &*state {
            InitState::InFlight(f) => f.ptr_eq(&flight),
            _ => false,
        };
        match result {
            Some(store) => {
                if current {
                    *state = InitState::Ready(Arc::clone(&store));
                }
                store
            }
            None => {
                if current {
                    *state = InitState::NotStarted;
                }
                error!("Catalog bootstrap aborted, serving the baseline only");
                Arc::new(CacheStore::from_baseline(&self.inner.baseline))
            }
        }
    }

    /// Run another throttled sync cycle on the ready store
    pub async fn refresh(&self) -> Arc<SyncOutcome> {
        self.refresh_at(Utc::now()).await
    }

    pub async fn refresh_at(&self, now: DateTime<Utc>) -> Arc<SyncOutcome> {
        let store = self.ensure_ready().await;
        self.inner.sync(&store, now).await
    }

    /// Outcome of the most recent sync cycle
    pub fn last_outcome(&self) -> Option<Arc<SyncOutcome>> {
        self.inner.last_outcome.lock().clone()
    }

    pub async fn freshness(&self) -> Freshness {
        self.inner
            .tracker
            .freshness(self.inner.baseline.version())
            .await
    }

    pub fn stats(&self) -> SyncStatsSnapshot {
        self.inner.stats.snapshot()
    }

    pub fn baseline(&self) -> &Baseline {
        &self.inner.baseline
    }
}
