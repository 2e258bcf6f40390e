//! Baseline snapshot: the catalog bundled at build time
//!
//! The baseline is immutable. It is shared by reference and only ever read
//! when building a [`CacheStore`](crate::CacheStore).

use catalogsync_common::{Entity, Error, Result, VersionToken};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Deserialize)]
#[serde(untagged)]
enum BaselineFile {
    Bare(Vec<Entity>),
    Versioned {
        #[serde(default)]
        version: Option<VersionToken>,
        entities: Vec<Entity>,
    },
}

/// Immutable full catalog, the floor state before any sync
#[derive(Debug, Clone, Default)]
pub struct Baseline {
    version: Option<VersionToken>,
    entities: Arc<[Entity]>,
}

impl Baseline {
    /// Build a baseline from entities; for a repeated id the first
    /// occurrence wins.
    #[must_use]
    pub fn new(entities: Vec<Entity>) -> Self {
        let mut seen = HashSet::with_capacity(entities.len());
        let total = entities.len();
        let entities: Vec<Entity> = entities
            .into_iter()
            .filter(|e| seen.insert(e.id.clone()))
            .collect();
        if entities.len() != total {
            warn!(
                "Baseline contains {} duplicate ids, keeping first occurrences",
                total - entities.len()
            );
        }
        Self {
            version: None,
            entities: entities.into(),
        }
    }

    /// Baseline with no entities
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Attach the server version this snapshot was taken at
    #[must_use]
    pub fn with_version(mut self, version: VersionToken) -> Self {
        self.version = Some(version);
        self
    }

    /// Parse a baseline from JSON: either a bare array of entities or
    /// `{"version": ..., "entities": [...]}`.
    ///
    /// # Errors
    /// Returns a deserialization error for malformed input.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let file: BaselineFile = serde_json::from_slice(bytes)?;
        Ok(match file {
            BaselineFile::Bare(entities) => Self::new(entities),
            BaselineFile::Versioned { version, entities } => {
                let mut baseline = Self::new(entities);
                baseline.version = version;
                baseline
            }
        })
    }

    /// Load a baseline JSON file
    ///
    /// # Errors
    /// Returns a configuration error if the file cannot be read, or a
    /// deserialization error if it is malformed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            Error::configuration(format!("cannot read baseline {}: {e}", path.display()))
        })?;
        let baseline = Self::from_json(&bytes)?;
        debug!(
            "Loaded baseline of {} entities from {}",
            baseline.len(),
            path.display()
        );
        Ok(baseline)
    }

    #[must_use]
    pub const fn version(&self) -> Option<&VersionToken> {
        self.version.as_ref()
    }

    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
