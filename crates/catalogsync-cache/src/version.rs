//! Version tracker: last applied server version and last check time
//!
//! Both values live under their own key. Timestamps are stored as Unix
//! milliseconds.

use catalogsync_common::{Error, Result, VersionToken};
use catalogsync_kv::KvStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// How current the local catalog is, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Freshness {
    /// No server version has ever been applied or confirmed
    NeverSynced,
    /// The local view matches `version` as of `checked_at`
    Synced {
        version: VersionToken,
        checked_at: Option<DateTime<Utc>>,
    },
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeverSynced => write!(f, "never synced"),
            Self::Synced {
                version,
                checked_at: Some(at),
            } => write!(f, "version {version}, checked {}", at.to_rfc3339()),
            Self::Synced {
                version,
                checked_at: None,
            } => write!(f, "version {version}"),
        }
    }
}

pub struct VersionTracker {
    kv: Arc<dyn KvStore>,
    version_key: String,
    last_check_key: String,
}

impl VersionTracker {
    pub fn new(
        kv: Arc<dyn KvStore>,
        version_key: impl Into<String>,
        last_check_key: impl Into<String>,
    ) -> Self {
        Self {
            kv,
            version_key: version_key.into(),
            last_check_key: last_check_key.into(),
        }
    }

    /// Last version token applied from the server
    ///
    /// # Errors
    /// Returns a persistence error if the store cannot be read.
    pub async fn local_version(&self) -> Result<Option<VersionToken>> {
        Ok(self
            .kv
            .get(&self.version_key)
            .await?
            .filter(|v| !v.is_empty())
            .map(VersionToken::new))
    }

    /// Time of the last successful version check
    ///
    /// # Errors
    /// Returns a persistence error if the store cannot be read or the stored
    /// value is not a millisecond timestamp.
    pub async fn last_check(&self) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = self.kv.get(&self.last_check_key).await? else {
            return Ok(None);
        };
        raw.trim()
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .map(Some)
            .ok_or_else(|| Error::corrupt(&self.last_check_key, format!("bad timestamp {raw:?}")))
    }

    /// Record a version check that found nothing new
    ///
    /// # Errors
    /// Returns a persistence error if the store cannot be written.
    pub async fn record_check(&self, now: DateTime<Utc>) -> Result<()> {
        self.kv
            .set(&self.last_check_key, &now.timestamp_millis().to_string())
            .await?;
        Ok(())
    }

    /// Record a newly applied version; the token is written before the
    /// check time so a partial failure only costs an extra check.
    ///
    /// # Errors
    /// Returns a persistence error if either value cannot be written.
    pub async fn record_version(&self, version: &VersionToken, now: DateTime<Utc>) -> Result<()> {
        self.kv.set(&self.version_key, version.as_str()).await?;
        self.record_check(now).await
    }

    /// Current freshness; store failures read as "never synced"
    pub async fn freshness(&self, baseline_version: Option<&VersionToken>) -> Freshness {
        let version = self.local_version().await.ok().flatten();
        let checked_at = self.last_check().await.ok().flatten();
        match (version, checked_at) {
            (Some(version), checked_at) => Freshness::Synced {
                version,
                checked_at,
            },
            // a check confirmed the baseline version is current
            (None, Some(at)) => baseline_version.map_or(Freshness::NeverSynced, |v| {
                Freshness::Synced {
                    version: v.clone(),
                    checked_at: Some(at),
                }
            }),
            (None, None) => Freshness::NeverSynced,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalogsync_kv::MemoryKvStore;

    fn tracker(kv: &MemoryKvStore) -> VersionTracker {
        VersionTracker::new(Arc::new(kv.clone()), "catalog:version", "catalog:last_check")
    }

    #[tokio::test]
    async fn test_fresh_store() {
        let tracker = tracker(&MemoryKvStore::new());
        assert_eq!(tracker.local_version().await.unwrap(), None);
        assert_eq!(tracker.last_check().await.unwrap(), None);
        assert_eq!(tracker.freshness(None).await, Freshness::NeverSynced);
    }

    #[tokio::test]
    async fn test_record_version() {
        let kv = MemoryKvStore::new();
        let tracker = tracker(&kv);
        let now = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();

        tracker
            .record_version(&VersionToken::new("41"), now)
            .await
            .unwrap();

        assert_eq!(
            tracker.local_version().await.unwrap(),
            Some(VersionToken::new("41"))
        );
        assert_eq!(tracker.last_check().await.unwrap(), Some(now));
        assert_eq!(
            kv.get("catalog:last_check").await.unwrap().as_deref(),
            Some("1700000000123")
        );
    }

    #[tokio::test]
    async fn test_bad_timestamp_is_corrupt() {
        let kv = MemoryKvStore::new();
        kv.set("catalog:last_check", "yesterday").await.unwrap();

        let err = tracker(&kv).last_check().await.unwrap_err();
        assert!(matches!(err, Error::CorruptValue { .. }));
    }

    #[tokio::test]
    async fn test_freshness_with_baseline_version() {
        let kv = MemoryKvStore::new();
        let tracker = tracker(&kv);
        let now = Utc::now();
        tracker.record_check(now).await.unwrap();

        let baseline = VersionToken::new("40");
        match tracker.freshness(Some(&baseline)).await {
            Freshness::Synced { version, .. } => assert_eq!(version, baseline),
            Freshness::NeverSynced => panic!("expected synced"),
        }
    }
}
