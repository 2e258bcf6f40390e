//! Error types for CatalogSync
//!
//! Every fallible operation in the workspace reports one of these errors.
//! The engine never lets them escape past a read; they are recorded as sync
//! outcomes instead, and [`ErrorKind`] tells diagnostics which class of
//! failure degraded freshness.

use crate::types::VersionToken;
use thiserror::Error;

/// Common result type for CatalogSync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Broad failure class, used for diagnostics and counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Local key-value store read/write failures and malformed stored values
    Persistence,
    /// Version-check or delta-fetch transport failures
    Network,
    /// Records or payloads that do not have the expected shape
    DataShape,
    /// The server broke the version-token contract
    Protocol,
    /// Invalid local configuration
    Configuration,
}

/// Common error type for CatalogSync
#[derive(Debug, Error)]
pub enum Error {
    // Persistence errors
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("corrupt stored value under '{key}': {reason}")]
    CorruptValue { key: String, reason: String },

    // Network errors
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("request timeout")]
    Timeout,

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    // Data-shape errors
    #[error("incomplete record for new entity: {id}")]
    IncompleteRecord { id: String },

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    // Version protocol errors
    #[error("version tokens are not comparable: local {local}, remote {remote}")]
    IncomparableVersion {
        local: VersionToken,
        remote: VersionToken,
    },

    #[error("remote version {remote} is older than local version {local}")]
    VersionRegressed {
        local: VersionToken,
        remote: VersionToken,
    },

    // Internal errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a corrupt value error for a stored key
    pub fn corrupt(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::CorruptValue {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Failure class of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Persistence(_) | Self::CorruptValue { .. } => ErrorKind::Persistence,
            Self::ConnectionFailed(_) | Self::Timeout | Self::ServiceUnavailable(_) => {
                ErrorKind::Network
            }
            Self::IncompleteRecord { .. } | Self::Deserialization(_) | Self::Serialization(_) => {
                ErrorKind::DataShape
            }
            Self::IncomparableVersion { .. } | Self::VersionRegressed { .. } => ErrorKind::Protocol,
            Self::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// Check if this is a retryable error
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::ServiceUnavailable(_) | Self::ConnectionFailed(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Self::Persistence(e.to_string())
        } else {
            Self::Deserialization(e.to_string())
        }
    }
}
