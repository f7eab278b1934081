//! Error types for the toolup CLI.
//!
//! Commands return `anyhow::Result`; the variants below are the failures a
//! user is expected to act on, so they carry the details worth printing.

use thiserror::Error;

/// User-facing failures of toolup commands.
#[derive(Debug, Error)]
pub enum ToolupError {
    /// The listing has no artifact for the requested version on this platform.
    #[error("version not found: {version} (run 'toolup versions' to see what is available)")]
    VersionNotFound {
        /// The version label that was requested.
        version: String,
    },

    /// The artifact transfer produced no bytes.
    #[error("download failed: {url}")]
    DownloadFailed {
        /// The URL that was requested.
        url: String,
    },

    /// The downloaded archive did not match its published digest.
    #[error(
        "checksum mismatch for {file}: expected {expected}, got {actual} \
         (corrupt or incomplete download, please retry)"
    )]
    ChecksumMismatch {
        /// The downloaded file name.
        file: String,
        /// The published checksum.
        expected: String,
        /// The checksum of the downloaded bytes.
        actual: String,
    },

    /// Extraction or placement of an installation failed.
    #[error("installation failed: {message}")]
    InstallError {
        /// Description of the installation error.
        message: String,
    },

    /// The requested version is not installed locally.
    #[error("Java {version} is not installed")]
    NotInstalled {
        /// The version label.
        version: String,
    },

    /// Backup sync was requested without WebDAV credentials.
    #[error(
        "backup store not configured: run 'toolup backup config' or set username and \
         password under [backup] in {config}"
    )]
    BackupNotConfigured {
        /// Location of the configuration file.
        config: String,
    },
}

impl ToolupError {
    /// Creates a new `VersionNotFound` error.
    #[must_use]
    pub fn version_not_found(version: impl Into<String>) -> Self {
        Self::VersionNotFound {
            version: version.into(),
        }
    }

    /// Creates a new `DownloadFailed` error.
    #[must_use]
    pub fn download_failed(url: impl Into<String>) -> Self {
        Self::DownloadFailed { url: url.into() }
    }

    /// Creates a new `ChecksumMismatch` error.
    #[must_use]
    pub fn checksum_mismatch(
        file: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        let expected = expected.into();
        Self::ChecksumMismatch {
            file: file.into(),
            expected: if expected.is_empty() {
                "<none published>".to_string()
            } else {
                expected
            },
            actual: actual.into(),
        }
    }

    /// Creates a new `InstallError`.
    #[must_use]
    pub fn install_error(message: impl Into<String>) -> Self {
        Self::InstallError {
            message: message.into(),
        }
    }

    /// Creates a new `NotInstalled` error.
    #[must_use]
    pub fn not_installed(version: impl Into<String>) -> Self {
        Self::NotInstalled {
            version: version.into(),
        }
    }

    /// Creates a new `BackupNotConfigured` error.
    #[must_use]
    pub fn backup_not_configured(config: impl Into<String>) -> Self {
        Self::BackupNotConfigured {
            config: config.into(),
        }
    }
}
