//! Error types for catalog construction and artifact acquisition.
//!
//! Only failures that must reach the caller are represented here. Per-row
//! problems during a catalog build (a checksum document that cannot be
//! fetched, a section without a table) are absorbed by the scraper, and the
//! "normal" negative outcomes of an acquisition (unknown version, failed
//! transfer, digest mismatch) are reported through
//! [`Acquired`](crate::acquire::Acquired) instead of an error.

use std::path::PathBuf;
use thiserror::Error;

/// Error raised by the catalog scraper or the acquisition pipeline.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The upstream listing URL is missing or malformed.
    ///
    /// Fatal to the catalog build: nothing is fetched.
    #[error("configuration error: {message}")]
    Config {
        /// Description of what is wrong with the configuration.
        message: String,
    },

    /// The top-level listing page could not be fetched or read.
    #[error("fetch error: {message}")]
    Fetch {
        /// Description of the failed request.
        message: String,
        /// The underlying transport error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A local file or directory operation failed.
    #[error("I/O error on {}: {message}", path.display())]
    Io {
        /// Description of the operation that failed.
        message: String,
        /// The path the operation was working on.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl CatalogError {
    /// Creates a new `Config` error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a new `Fetch` error without an underlying cause.
    #[must_use]
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new `Fetch` error wrapping a transport error.
    #[must_use]
    pub fn fetch_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Fetch {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new `Io` error for the given path.
    #[must_use]
    pub fn io(message: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            path: path.into(),
            source,
        }
    }

    /// Returns `true` for errors caused by configuration rather than the network.
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}
