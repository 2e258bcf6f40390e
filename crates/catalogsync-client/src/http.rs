//! HTTP implementation of the remote catalog endpoints
//!
//! - `GET {endpoint}/version` returns `{"version": <token>}`
//! - `GET {endpoint}/delta?from=<token>&to=<token>` returns an array of
//!   entity records, optionally wrapped as `{"records": [...]}`

use crate::RemoteCatalog;
use async_trait::async_trait;
use catalogsync_common::{EntityPatch, Error, Result, VersionToken};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Deserialize)]
struct VersionResponse {
    version: VersionToken,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DeltaResponse {
    Bare(Vec<Value>),
    Wrapped { records: Vec<Value> },
}

impl DeltaResponse {
    fn into_records(self) -> Vec<Value> {
        match self {
            Self::Bare(records) | Self::Wrapped { records } => records,
        }
    }
}

/// Catalog service client over HTTP
#[derive(Clone)]
pub struct HttpCatalogClient {
    endpoint: String,
    http_client: reqwest::Client,
}

impl HttpCatalogClient {
    /// Create a client whose every request is bounded by `timeout`
    ///
    /// # Errors
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::configuration(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Base URL of the catalog service
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/{}", self.endpoint, path);

        let response = self
            .http_client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout
                } else {
                    Error::ConnectionFailed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ServiceUnavailable(format!(
                "catalog service returned status {status}: {body}"
            )));
        }

        response.json().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout
            } else {
                Error::Deserialization(e.to_string())
            }
        })
    }
}

/// Decode delta records one by one, dropping those without a usable shape
fn decode_records(records: Vec<Value>) -> Vec<EntityPatch> {
    let total = records.len();
    let decoded: Vec<EntityPatch> = records
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<EntityPatch>(value) {
            Ok(patch) => Some(patch),
            Err(e) => {
                warn!("Dropping malformed delta record: {}", e);
                None
            }
        })
        .collect();
    if decoded.len() != total {
        debug!("Decoded {} of {} delta records", decoded.len(), total);
    }
    decoded
}

#[async_trait]
impl RemoteCatalog for HttpCatalogClient {
    async fn fetch_version(&self) -> Result<VersionToken> {
        let resp: VersionResponse = self.get_json("version", &[]).await?;
        Ok(resp.version)
    }

    async fn fetch_delta(
        &self,
        from: Option<&VersionToken>,
        to: &VersionToken,
    ) -> Result<Vec<EntityPatch>> {
        let mut query = vec![("to", to.as_str())];
        if let Some(from) = from {
            query.push(("from", from.as_str()));
        }
        let resp: DeltaResponse = self.get_json("delta", &query).await?;
        Ok(decode_records(resp.into_records()))
    }
}
