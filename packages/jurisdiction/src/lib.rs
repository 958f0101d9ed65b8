#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Jurisdiction catalog and location resolver.
//!
//! The catalog is read-only reference data (metros, districts per province,
//! and an ordered list of approximate bounding boxes) built once and handed
//! to a [`LocationResolver`]. The bundled South African catalog is embedded
//! at compile time from `catalogs/south_africa.toml`; tests and deployments
//! can construct their own.

pub mod catalog;
pub mod resolver;

pub use catalog::JurisdictionCatalog;
pub use resolver::{LocationResolver, Resolution};

use thiserror::Error;

/// Errors that can occur while loading or validating a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The catalog TOML is malformed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The catalog parsed but violates an invariant.
    #[error("Invalid catalog: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },
}
