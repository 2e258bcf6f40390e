//! CatalogSync Client - remote catalog endpoints
//!
//! This crate provides the two calls the sync scheduler makes against the
//! catalog service: the version check and the delta fetch.

pub mod http;

use async_trait::async_trait;
use catalogsync_common::{EntityPatch, Result, VersionToken};

// Re-exports
pub use http::HttpCatalogClient;

/// Remote catalog service as seen by the sync scheduler
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    /// Fetch the current server catalog version
    async fn fetch_version(&self) -> Result<VersionToken>;

    /// Fetch the records changed in `(from, to]`
    ///
    /// `from` is `None` when the client has never held a version; the
    /// server then returns every record up to `to`.
    async fn fetch_delta(
        &self,
        from: Option<&VersionToken>,
        to: &VersionToken,
    ) -> Result<Vec<EntityPatch>>;
}
