//! Search and filter over the merged view
//!
//! Every call scans the current snapshot; there is no secondary index to
//! keep in step with deltas.

use crate::store::CacheStore;
use catalogsync_common::{Entity, FilterCriteria};

/// Width used for the zero-padded form of `code`
const CODE_WIDTH: usize = 4;

/// Read-only queries against one [`CacheStore`]
#[derive(Debug, Clone, Copy)]
pub struct Query<'a> {
    store: &'a CacheStore,
}

impl<'a> Query<'a> {
    #[must_use]
    pub const fn new(store: &'a CacheStore) -> Self {
        Self { store }
    }

    /// Case-insensitive substring search over name, locality, keywords and
    /// code; a blank query matches nothing.
    #[must_use]
    pub fn search(&self, text: &str) -> Vec<Entity> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let numeric = needle
            .bytes()
            .all(|b| b.is_ascii_digit())
            .then(|| needle.parse::<u64>().ok())
            .flatten();

        self.store
            .get_all()
            .iter()
            .filter(|e| matches_text(e, &needle) || matches_code(e.code, &needle, numeric))
            .cloned()
            .collect()
    }

    /// Entities satisfying every set criterion, in view order
    #[must_use]
    pub fn filter(&self, criteria: &FilterCriteria) -> Vec<Entity> {
        let all = self.store.get_all();
        if criteria.is_empty() {
            return all.to_vec();
        }
        all.iter().filter(|e| criteria.matches(e)).cloned().collect()
    }
}

impl CacheStore {
    /// Queries over this store's current contents
    #[must_use]
    pub const fn query(&self) -> Query<'_> {
        Query::new(self)
    }
}

fn matches_text(entity: &Entity, needle: &str) -> bool {
    entity.name.to_lowercase().contains(needle)
        || entity.locality.to_lowercase().contains(needle)
        || entity
            .keywords
            .iter()
            .any(|k| k.to_lowercase().contains(needle))
}

fn matches_code(code: Option<u64>, needle: &str, numeric: Option<u64>) -> bool {
    let Some(code) = code else {
        return false;
    };
    numeric == Some(code)
        || code.to_string().contains(needle)
        || format!("{code:0width$}", width = CODE_WIDTH).contains(needle)
}
