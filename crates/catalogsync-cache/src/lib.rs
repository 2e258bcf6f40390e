//! CatalogSync Cache - offline-first catalog engine
//!
//! This crate keeps an always-available local copy of the server-owned
//! catalog. A bundled baseline snapshot is the floor state; persisted update
//! records are replayed over it at startup; a throttled version check pulls
//! deltas from the server when it has moved on.
//!
//! # Architecture
//!
//! ```text
//!   callers ──► Catalog::ensure_ready()   (single-flight bootstrap)
//!                    │
//!        ┌───────────┼──────────────────────────┐
//!        ▼           ▼                          ▼
//!   UpdateLedger  CacheStore ◄── Baseline   SyncScheduler ──► RemoteCatalog
//!        │           ▲                          │
//!        └──► KvStore ◄── VersionTracker ◄──────┘
//!                    │
//!              Query (search / filter)
//! ```
//!
//! Network and persistence failures degrade freshness, never availability:
//! `ensure_ready()` always yields a store, and failures are reported as
//! [`SyncOutcome`] values.

pub mod baseline;
pub mod catalog;
pub mod ledger;
pub mod query;
pub mod stats;
pub mod store;
pub mod sync;
pub mod version;

#[cfg(test)]
mod test_support;

pub use baseline::Baseline;
pub use catalog::Catalog;
pub use ledger::UpdateLedger;
pub use query::Query;
pub use stats::{SyncStats, SyncStatsSnapshot};
pub use store::{ApplyReport, CacheStore};
pub use sync::{SyncOutcome, SyncScheduler};
pub use version::{Freshness, VersionTracker};

/// Persisted keys for one catalog namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvKeys {
    /// Last applied server version token
    pub version: String,
    /// Last successful version check (Unix milliseconds)
    pub last_check: String,
    /// Serialized update ledger (one JSON array)
    pub ledger: String,
}

impl KvKeys {
    #[must_use]
    pub fn new(namespace: &str) -> Self {
        Self {
            version: format!("{namespace}:version"),
            last_check: format!("{namespace}:last_check"),
            ledger: format!("{namespace}:ledger"),
        }
    }
}

impl Default for KvKeys {
    fn default() -> Self {
        Self::new("catalog")
    }
}
