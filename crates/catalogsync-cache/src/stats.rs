//! Sync statistics for monitoring
//!
//! Lock-free counters updated by the scheduler and read by diagnostics.

use crate::store::ApplyReport;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for version checks, delta fetches and merge results
#[derive(Debug, Default)]
pub struct SyncStats {
    /// Number of remote version checks issued
    pub version_checks: AtomicU64,
    /// Number of throttled sync attempts
    pub throttled: AtomicU64,
    /// Number of delta fetches issued
    pub delta_fetches: AtomicU64,
    /// Number of records received from delta fetches
    pub records_received: AtomicU64,
    /// Number of records that updated or inserted an entity
    pub records_applied: AtomicU64,
    /// Number of incomplete records dropped
    pub records_discarded: AtomicU64,
    /// Number of skipped sync cycles
    pub failures: AtomicU64,
}

/// Point-in-time copy of [`SyncStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatsSnapshot {
    pub version_checks: u64,
    pub throttled: u64,
    pub delta_fetches: u64,
    pub records_received: u64,
    pub records_applied: u64,
    pub records_discarded: u64,
    pub failures: u64,
}

impl SyncStats {
    pub(crate) fn record_version_check(&self) {
        self.version_checks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_throttled(&self) {
        self.throttled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delta(&self, received: usize, report: &ApplyReport) {
        self.delta_fetches.fetch_add(1, Ordering::Relaxed);
        self.records_received
            .fetch_add(received as u64, Ordering::Relaxed);
        self.records_applied
            .fetch_add(report.applied() as u64, Ordering::Relaxed);
        self.records_discarded
            .fetch_add(report.discarded as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy all counters
    pub fn snapshot(&self) -> SyncStatsSnapshot {
        SyncStatsSnapshot {
            version_checks: self.version_checks.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
            delta_fetches: self.delta_fetches.load(Ordering::Relaxed),
            records_received: self.records_received.load(Ordering::Relaxed),
            records_applied: self.records_applied.load(Ordering::Relaxed),
            records_discarded: self.records_discarded.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_delta() {
        let stats = SyncStats::default();
        stats.record_version_check();
        stats.record_delta(
            4,
            &ApplyReport {
                updated: 2,
                inserted: 1,
                discarded: 1,
            },
        );

        let snap = stats.snapshot();
        assert_eq!(snap.version_checks, 1);
        assert_eq!(snap.delta_fetches, 1);
        assert_eq!(snap.records_received, 4);
        assert_eq!(snap.records_applied, 3);
        assert_eq!(snap.records_discarded, 1);
    }

    #[test]
    fn test_failures_and_throttles() {
        let stats = SyncStats::default();
        assert_eq!(stats.snapshot(), SyncStatsSnapshot::default());
        stats.record_failure();
        stats.record_throttled();
        stats.record_throttled();

        let snap = stats.snapshot();
        assert_eq!(snap.failures, 1);
        assert_eq!(snap.throttled, 2);
        assert_eq!(snap.delta_fetches, 0);
    }
}
