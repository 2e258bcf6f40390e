//! CatalogSync Common - Shared types and utilities
//!
//! This crate provides the catalog record types, error definitions and
//! configuration structures used across all CatalogSync components.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use types::*;
