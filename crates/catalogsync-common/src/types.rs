//! Core type definitions for CatalogSync
//!
//! This module defines the catalog records shared by the cache engine, the
//! remote client and the command-line front end: full entities, partial
//! update records, version tokens and filter criteria.

use crate::error::Error;
use derive_more::{Display, From, Into};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Metadata key holding the institution status
pub const STATUS_KEY: &str = "status";

/// Stable unique identifier of a catalog entity, never reused
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
#[display("{_0}")]
pub struct EntityId(String);

impl EntityId {
    /// Create a new entity ID
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Opaque server catalog version
///
/// Tokens are only comparable when the server guarantees either decimal
/// integers or fixed-width strings. [`VersionToken::compare`] enforces that
/// precondition instead of guessing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(transparent)]
#[display("{_0}")]
pub struct VersionToken(String);

impl VersionToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_decimal(s: &str) -> bool {
        !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
    }

    /// Order `self` (the local token) against `remote`.
    ///
    /// Decimal tokens compare numerically at any width; other tokens compare
    /// lexicographically only when both have the same length.
    ///
    /// # Errors
    /// Returns [`Error::IncomparableVersion`] when neither rule applies.
    pub fn compare(&self, remote: &Self) -> Result<Ordering, Error> {
        let (a, b) = (self.as_str(), remote.as_str());
        if Self::is_decimal(a) && Self::is_decimal(b) {
            let a = a.trim_start_matches('0');
            let b = b.trim_start_matches('0');
            return Ok(a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        }
        if a.len() == b.len() {
            return Ok(a.cmp(b));
        }
        Err(Error::IncomparableVersion {
            local: self.clone(),
            remote: remote.clone(),
        })
    }
}

impl From<u64> for VersionToken {
    fn from(v: u64) -> Self {
        Self(v.to_string())
    }
}

impl<'de> Deserialize<'de> for VersionToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Servers send either `"42"` or `42`
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Self(s),
            Raw::Number(n) => Self(n.to_string()),
        })
    }
}

/// One catalog item (an institution and its nested sub-records)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: EntityId,
    /// Human-facing numeric code, separate namespace from `id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u64>,
    pub name: String,
    pub locality: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Sub-records with their historical data points, never interpreted here
    #[serde(default)]
    pub children: Vec<Value>,
    /// Open-ended descriptive attributes (status, capacity, affiliation, ...)
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Composite strings precomputed by the data producer
    #[serde(default)]
    pub search_fields: BTreeMap<String, String>,
    /// Top-level fields this version does not know about
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity {
    /// Create an entity with the required display fields
    pub fn new(
        id: impl Into<EntityId>,
        code: u64,
        name: impl Into<String>,
        locality: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            code: Some(code),
            name: name.into(),
            locality: locality.into(),
            keywords: Vec::new(),
            children: Vec::new(),
            metadata: Map::new(),
            search_fields: BTreeMap::new(),
            extra: Map::new(),
        }
    }

    /// Add a metadata attribute
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set the fuzzy-match keywords
    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// The `metadata.status` attribute, if it is a string
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.metadata.get(STATUS_KEY).and_then(Value::as_str)
    }

    /// Shallow-merge `patch` over this entity: every top-level field the
    /// patch carries replaces ours, everything else is kept.
    pub fn apply(&mut self, patch: &EntityPatch) {
        if patch.code.is_some() {
            self.code = patch.code;
        }
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(locality) = &patch.locality {
            self.locality.clone_from(locality);
        }
        if let Some(keywords) = &patch.keywords {
            self.keywords.clone_from(keywords);
        }
        if let Some(children) = &patch.children {
            self.children.clone_from(children);
        }
        if let Some(metadata) = &patch.metadata {
            self.metadata.clone_from(metadata);
        }
        if let Some(search_fields) = &patch.search_fields {
            self.search_fields.clone_from(search_fields);
        }
        for (key, value) in &patch.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

/// A full or partial entity record received from a delta fetch
///
/// Absent fields mean "keep the current value".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityPatch {
    pub id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_fields: Option<BTreeMap<String, String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EntityPatch {
    /// Create an empty patch for `id`
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            code: None,
            name: None,
            locality: None,
            keywords: None,
            children: None,
            metadata: None,
            search_fields: None,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_locality(mut self, locality: impl Into<String>) -> Self {
        self.locality = Some(locality.into());
        self
    }

    #[must_use]
    pub const fn with_code(mut self, code: u64) -> Self {
        self.code = Some(code);
        self
    }

    /// Replace the whole metadata mapping
    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set a single metadata attribute, starting from an empty mapping
    #[must_use]
    pub fn with_metadata_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_search_fields(mut self, fields: BTreeMap<String, String>) -> Self {
        self.search_fields = Some(fields);
        self
    }

    /// Whether the patch can stand alone as a new entity
    ///
    /// A new entity needs `name`, `locality`, `metadata` and `searchFields`
    /// in addition to `id`.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.name.is_some()
            && self.locality.is_some()
            && self.metadata.is_some()
            && self.search_fields.is_some()
    }

    /// Fold a later record for the same id into this one, field by field
    ///
    /// Fields `later` carries win, fields it omits keep their current value,
    /// so replaying the folded record equals replaying both in order.
    pub fn merge_from(&mut self, later: &Self) {
        fn take<T: Clone>(field: &mut Option<T>, later: Option<&T>) {
            if let Some(value) = later {
                *field = Some(value.clone());
            }
        }

        take(&mut self.code, later.code.as_ref());
        take(&mut self.name, later.name.as_ref());
        take(&mut self.locality, later.locality.as_ref());
        take(&mut self.keywords, later.keywords.as_ref());
        take(&mut self.children, later.children.as_ref());
        take(&mut self.metadata, later.metadata.as_ref());
        take(&mut self.search_fields, later.search_fields.as_ref());
        for (key, value) in &later.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }

    /// Build a new entity from a structurally complete patch
    ///
    /// # Errors
    /// Returns [`Error::IncompleteRecord`] when a required field is missing.
    pub fn into_entity(self) -> Result<Entity, Error> {
        match self {
            Self {
                id,
                code,
                name: Some(name),
                locality: Some(locality),
                keywords,
                children,
                metadata: Some(metadata),
                search_fields: Some(search_fields),
                extra,
            } => Ok(Entity {
                id,
                code,
                name,
                locality,
                keywords: keywords.unwrap_or_default(),
                children: children.unwrap_or_default(),
                metadata,
                search_fields,
                extra,
            }),
            Self { id, .. } => Err(Error::IncompleteRecord { id: id.to_string() }),
        }
    }
}

impl From<Entity> for EntityPatch {
    fn from(entity: Entity) -> Self {
        Self {
            id: entity.id,
            code: entity.code,
            name: Some(entity.name),
            locality: Some(entity.locality),
            keywords: Some(entity.keywords),
            children: Some(entity.children),
            metadata: Some(entity.metadata),
            search_fields: Some(entity.search_fields),
            extra: entity.extra,
        }
    }
}

/// Exact-match filter over the merged view; unset fields are not filtered on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Matches `metadata.status` exactly
    #[serde(default)]
    pub status: Option<String>,
    /// Matches `locality` ignoring case
    #[serde(default)]
    pub locality: Option<String>,
}

impl FilterCriteria {
    #[must_use]
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            locality: None,
        }
    }

    #[must_use]
    pub fn with_locality(mut self, locality: impl Into<String>) -> Self {
        self.locality = Some(locality.into());
        self
    }

    /// True when no criteria are set
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.status.is_none() && self.locality.is_none()
    }

    /// Whether `entity` satisfies every set criterion
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        if let Some(status) = &self.status
            && entity.status() != Some(status.as_str())
        {
            return false;
        }
        if let Some(locality) = &self.locality
            && entity.locality.to_lowercase() != locality.to_lowercase()
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_version_compare_numeric() {
        let v9 = VersionToken::new("9");
        let v10 = VersionToken::new("10");
        assert_eq!(v9.compare(&v10).unwrap(), Ordering::Less);
        assert_eq!(v10.compare(&v9).unwrap(), Ordering::Greater);
        assert_eq!(
            VersionToken::new("007").compare(&VersionToken::new("7")).unwrap(),
            Ordering::Equal
        );
    }

    #[test]
    fn test_version_compare_fixed_width() {
        let a = VersionToken::new("2024-01-02");
        let b = VersionToken::new("2024-03-01");
        assert_eq!(a.compare(&b).unwrap(), Ordering::Less);
    }

    #[test]
    fn test_version_compare_rejects_mixed_width() {
        let err = VersionToken::new("v9")
            .compare(&VersionToken::new("v10"))
            .unwrap_err();
        assert!(matches!(err, Error::IncomparableVersion { .. }));
    }

    #[test]
    fn test_version_token_accepts_numbers() {
        let token: VersionToken = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(token.as_str(), "42");
        let token: VersionToken = serde_json::from_value(json!("43")).unwrap();
        assert_eq!(token, VersionToken::from(43));
    }

    #[test]
    fn test_patch_shallow_override() {
        let mut entity = Entity::new("A", 7, "X College", "Pune")
            .with_metadata("status", "Government")
            .with_metadata("capacity", 120);
        let patch: EntityPatch =
            serde_json::from_value(json!({"id": "A", "metadata": {"status": "Un-Aided"}}))
                .unwrap();

        entity.apply(&patch);

        assert_eq!(entity.name, "X College");
        assert_eq!(entity.status(), Some("Un-Aided"));
        // metadata is a top-level field, replaced as a whole
        assert!(!entity.metadata.contains_key("capacity"));
    }

    #[test]
    fn test_unknown_fields_survive() {
        let mut entity: Entity = serde_json::from_value(json!({
            "id": "B", "name": "Y", "locality": "Nashik", "website": "old"
        }))
        .unwrap();
        let patch: EntityPatch =
            serde_json::from_value(json!({"id": "B", "website": "new", "rank": 3})).unwrap();

        entity.apply(&patch);

        assert_eq!(entity.extra["website"], json!("new"));
        assert_eq!(entity.extra["rank"], json!(3));
        let round: Value = serde_json::to_value(&entity).unwrap();
        assert_eq!(round["searchFields"], json!({}));
    }

    #[test]
    fn test_patch_completeness() {
        let partial = EntityPatch::new("N").with_name("New").with_locality("Pune");
        assert!(!partial.is_complete());
        assert!(partial.clone().into_entity().is_err());

        let complete = partial
            .with_metadata(Map::new())
            .with_search_fields(BTreeMap::new());
        assert!(complete.is_complete());
        let entity = complete.into_entity().unwrap();
        assert_eq!(entity.code, None);
        assert!(entity.keywords.is_empty());
    }

    #[test]
    fn test_merge_from_keeps_earlier_fields() {
        let mut stored = EntityPatch::new("A").with_locality("Kolhapur").with_code(8);
        stored.merge_from(&EntityPatch::new("A").with_name("Renamed").with_code(9));

        assert_eq!(stored.name.as_deref(), Some("Renamed"));
        assert_eq!(stored.locality.as_deref(), Some("Kolhapur"));
        assert_eq!(stored.code, Some(9));

        // folding equals applying both in order
        let mut one = Entity::new("A", 7, "X College", "Pune");
        one.apply(&stored);
        let mut two = Entity::new("A", 7, "X College", "Pune");
        two.apply(&EntityPatch::new("A").with_locality("Kolhapur").with_code(8));
        two.apply(&EntityPatch::new("A").with_name("Renamed").with_code(9));
        assert_eq!(one, two);
    }

    #[test]
    fn test_filter_criteria() {
        let entity = Entity::new("A", 1, "X", "Mumbai").with_metadata("status", "Government");
        assert!(FilterCriteria::default().matches(&entity));
        assert!(FilterCriteria::status("Government").matches(&entity));
        assert!(!FilterCriteria::status("government").matches(&entity));
        assert!(
            FilterCriteria::status("Government")
                .with_locality("MUMBAI")
                .matches(&entity)
        );
        assert!(!FilterCriteria::default().with_locality("Pune").matches(&entity));
    }
}
