//! CatalogSync KV - durable string-keyed storage
//!
//! The cache engine only ever needs `get`/`set`/`remove` on string keys.
//! This crate defines that seam as the [`KvStore`] trait and ships a
//! redb-backed implementation for real deployments and an in-memory one
//! for tests and ephemeral sessions.

pub mod memory;
pub mod store;
mod tables;

use async_trait::async_trait;

pub use memory::MemoryKvStore;
pub use store::{KvError, KvResult, RedbKvStore};

/// Durable string-keyed store that survives process restarts
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value, `None` when the key was never set or was removed
    async fn get(&self, key: &str) -> KvResult<Option<String>>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> KvResult<()>;

    /// Delete a key; removing a missing key is not an error
    async fn remove(&self, key: &str) -> KvResult<()>;
}
