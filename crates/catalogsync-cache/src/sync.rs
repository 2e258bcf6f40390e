//! Sync scheduler: throttled version check and delta fetch
//!
//! One cycle is: read the last check time, skip if it is within the
//! throttle window, fetch the remote version, compare it with the local
//! one, and on a newer remote version fetch the delta, persist it to the
//! ledger, apply it to the live store and record the new version.
//!
//! No error leaves [`SyncScheduler::maybe_sync`]; failures come back as
//! [`SyncOutcome::Skipped`] and the store keeps serving its current view.

use crate::ledger::UpdateLedger;
use crate::stats::SyncStats;
use crate::store::{ApplyReport, CacheStore};
use crate::version::VersionTracker;
use catalogsync_client::RemoteCatalog;
use catalogsync_common::config::SyncConfig;
use catalogsync_common::{Error, Result, VersionToken};
use chrono::{DateTime, TimeDelta, Utc};
use std::cmp::Ordering;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Result of one `maybe_sync` call
#[derive(Debug)]
pub enum SyncOutcome {
    /// Syncing is turned off in configuration
    Disabled,
    /// The last check is too recent; no network call was made
    Throttled { next_check_at: Option<DateTime<Utc>> },
    /// The server version matches the local one
    UpToDate { version: VersionToken },
    /// A delta was fetched and applied
    Applied {
        from: Option<VersionToken>,
        to: VersionToken,
        received: usize,
        report: ApplyReport,
        /// Ledger and version token were both persisted
        durable: bool,
    },
    /// The cycle was abandoned; the view is unchanged
    Skipped(Error),
}

impl SyncOutcome {
    /// The error that caused a skipped cycle
    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        match self {
            Self::Skipped(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "sync disabled"),
            Self::Throttled {
                next_check_at: Some(at),
            } => write!(f, "throttled until {}", at.to_rfc3339()),
            Self::Throttled { next_check_at: None } => write!(f, "throttled"),
            Self::UpToDate { version } => write!(f, "up to date at version {version}"),
            Self::Applied {
                from,
                to,
                received,
                report,
                durable,
            } => {
                let from = from.as_ref().map_or("-", VersionToken::as_str);
                write!(
                    f,
                    "applied {from} -> {to}: {received} records ({} updated, {} inserted, {} discarded){}",
                    report.updated,
                    report.inserted,
                    report.discarded,
                    if *durable { "" } else { ", not persisted" }
                )
            }
            Self::Skipped(e) => write!(f, "skipped: {e}"),
        }
    }
}

pub struct SyncScheduler {
    remote: Arc<dyn RemoteCatalog>,
    ledger: Arc<UpdateLedger>,
    tracker: Arc<VersionTracker>,
    baseline_version: Option<VersionToken>,
    config: SyncConfig,
    stats: Arc<SyncStats>,
    /// Serialises cycles; the scheduler is the only writer of ledger and version
    running: Mutex<()>,
}

impl SyncScheduler {
    pub fn new(
        remote: Arc<dyn RemoteCatalog>,
        ledger: Arc<UpdateLedger>,
        tracker: Arc<VersionTracker>,
        baseline_version: Option<VersionToken>,
        config: SyncConfig,
        stats: Arc<SyncStats>,
    ) -> Self {
        Self {
            remote,
            ledger,
            tracker,
            baseline_version,
            config,
            stats,
            running: Mutex::new(()),
        }
    }

    /// Run one sync cycle against `store` if one is due at `now`
    pub async fn maybe_sync(&self, store: &CacheStore, now: DateTime<Utc>) -> SyncOutcome {
        if !self.config.enabled {
            return SyncOutcome::Disabled;
        }
        let _running = self.running.lock().await;

        if let Some(next_check_at) = self.throttled_until(now).await {
            self.stats.record_throttled();
            debug!("Version check throttled until {}", next_check_at.to_rfc3339());
            return SyncOutcome::Throttled {
                next_check_at: Some(next_check_at),
            };
        }

        match self.run_cycle(store, now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.stats.record_failure();
                warn!("Catalog sync skipped this cycle: {}", e);
                SyncOutcome::Skipped(e)
            }
        }
    }

    /// End of the throttle window, if `now` is inside it
    async fn throttled_until(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let last = match self.tracker.last_check().await {
            Ok(last) => last?,
            Err(e) => {
                warn!("Unreadable last check time, checking now: {}", e);
                return None;
            }
        };
        let throttle = TimeDelta::from_std(self.config.throttle()).unwrap_or(TimeDelta::MAX);
        let elapsed = now.signed_duration_since(last);
        // a last check in the future means the clock moved back
        if elapsed < TimeDelta::zero() || elapsed >= throttle {
            return None;
        }
        last.checked_add_signed(throttle)
    }

    async fn run_cycle(&self, store: &CacheStore, now: DateTime<Utc>) -> Result<SyncOutcome> {
        self.stats.record_version_check();
        let remote = self.bounded(self.remote.fetch_version()).await?;
        let local = self.local_version().await;

        if let Some(local) = &local {
            let ordering = local.compare(&remote).and_then(|ordering| match ordering {
                Ordering::Greater => Err(Error::VersionRegressed {
                    local: local.clone(),
                    remote: remote.clone(),
                }),
                ordering => Ok(ordering),
            });
            match ordering {
                Ok(Ordering::Less) => {}
                Ok(_) => {
                    self.touch_check(now).await;
                    debug!("Catalog is up to date at version {}", remote);
                    return Ok(SyncOutcome::UpToDate { version: remote });
                }
                // a protocol error still completes the version check
                Err(e) => {
                    self.touch_check(now).await;
                    return Err(e);
                }
            }
        }

        let records = self
            .bounded(self.remote.fetch_delta(local.as_ref(), &remote))
            .await?;
        let received = records.len();

        let mut durable = match self.ledger.append(&records).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Failed to persist {} delta records: {}", received, e);
                false
            }
        };
        let report = store.apply_delta(&records);
        self.stats.record_delta(received, &report);

        // without the ledger on disk the next start must fetch this range again
        if durable && let Err(e) = self.tracker.record_version(&remote, now).await {
            warn!("Failed to record catalog version {}: {}", remote, e);
            durable = false;
        }

        info!(
            "Applied catalog delta {} -> {}: {} records, {} updated, {} inserted, {} discarded",
            local.as_ref().map_or("-", VersionToken::as_str),
            remote,
            received,
            report.updated,
            report.inserted,
            report.discarded
        );
        Ok(SyncOutcome::Applied {
            from: local,
            to: remote,
            received,
            report,
            durable,
        })
    }

    async fn touch_check(&self, now: DateTime<Utc>) {
        if let Err(e) = self.tracker.record_check(now).await {
            warn!("Failed to record version check: {}", e);
        }
    }

    /// Persisted version, else the baseline's
    async fn local_version(&self) -> Option<VersionToken> {
        match self.tracker.local_version().await {
            Ok(Some(version)) => Some(version),
            Ok(None) => self.baseline_version.clone(),
            Err(e) => {
                warn!("Unreadable local version, using baseline version: {}", e);
                self.baseline_version.clone()
            }
        }
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.config.request_timeout(), call)
            .await
            .map_err(|_| Error::Timeout)?
    }
}
