//! Backup directory mirroring against a remote file store.
//!
//! [`RemoteStore`] is the directory-oriented interface the sync logic talks
//! to; [`webdav::WebDavStore`] implements it over HTTP. [`sync::BackupSync`]
//! pulls remote files into the local backup directory and pushes local
//! files back, seeding an empty directory from a default archive.

pub mod sync;
pub mod webdav;

use async_trait::async_trait;
use thiserror::Error;

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Entry name (last path segment, decoded).
    pub name: String,
    /// `true` for collections (directories).
    pub is_dir: bool,
}

impl RemoteEntry {
    /// Creates a file entry.
    #[must_use]
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    /// Creates a directory entry.
    #[must_use]
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// Error raised by a [`RemoteStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The remote path does not exist.
    #[error("remote path not found: {path}")]
    NotFound {
        /// The missing remote path.
        path: String,
    },

    /// The server answered with an unexpected status.
    #[error("{method} {path} failed with HTTP {status}")]
    Status {
        /// HTTP method of the request.
        method: String,
        /// The remote path.
        path: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The request could not be sent or its body could not be read.
    #[error("request to {path} failed")]
    Transport {
        /// The remote path.
        path: String,
        /// The underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The store itself is misconfigured.
    #[error("invalid remote store configuration: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },
}

impl StoreError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates a new `Status` error.
    #[must_use]
    pub fn status(method: impl Into<String>, path: impl Into<String>, status: u16) -> Self {
        Self::Status {
            method: method.into(),
            path: path.into(),
            status,
        }
    }

    /// Creates a new `Transport` error.
    #[must_use]
    pub fn transport(path: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            path: path.into(),
            source,
        }
    }

    /// Creates a new `Config` error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns `true` for [`StoreError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A directory-oriented remote file store.
///
/// Paths are `/`-separated and relative to the store root.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Lists the direct children of `dir`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if `dir` does not exist; other variants on failure.
    async fn list(&self, dir: &str) -> Result<Vec<RemoteEntry>, StoreError>;

    /// Creates `dir` and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a level cannot be created.
    async fn mkdir_all(&self, dir: &str) -> Result<(), StoreError>;

    /// Reads a whole file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file cannot be read.
    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError>;

    /// Writes a whole file, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file cannot be written.
    async fn write(&self, path: &str, bytes: Vec<u8>) -> Result<(), StoreError>;
}

/// Joins a remote directory and an entry name with a single `/`.
#[must_use]
pub fn remote_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if dir.is_empty() {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_path_joins_with_single_slash() {
        assert_eq!(remote_path("/toolup_backups", "bashrc"), "/toolup_backups/bashrc");
        assert_eq!(remote_path("/toolup_backups/", "/bashrc"), "/toolup_backups/bashrc");
        assert_eq!(remote_path("/", "bashrc"), "/bashrc");
        assert_eq!(remote_path("", "bashrc"), "/bashrc");
    }

    #[test]
    fn store_error_messages() {
        assert_eq!(
            StoreError::not_found("/b").to_string(),
            "remote path not found: /b"
        );
        assert_eq!(
            StoreError::status("PROPFIND", "/b", 401).to_string(),
            "PROPFIND /b failed with HTTP 401"
        );
        assert!(StoreError::not_found("/b").is_not_found());
        assert!(!StoreError::config("bad url").is_not_found());
    }
}
