//! Command modules for the toolup CLI.
//!
//! ## Java Commands
//!
//! - [`versions`] - List versions published for this platform
//! - [`download`] - Fetch and verify an archive into the cache
//! - [`install`] - Install a version
//! - [`list`] - List installed versions
//! - [`uninstall`] - Remove an installed version
//!
//! ## Backup Commands
//!
//! - [`backup`] - Pull or push the backup directory over WebDAV

pub mod backup;
pub mod download;
pub mod install;
pub mod list;
pub mod uninstall;
pub mod versions;

use std::path::PathBuf;

use anyhow::{Context, Result};
use toolup_catalog::{Acquired, AcquisitionPipeline, CatalogScraper, HttpRetriever};

use crate::config::Config;
use crate::errors::ToolupError;
use crate::paths::ToolupPaths;

/// Resolves the toolup home and loads its configuration.
pub(crate) fn load_environment() -> Result<(ToolupPaths, Config)> {
    let paths = ToolupPaths::new()?;
    let config = Config::load_or_init(&paths)?;
    Ok((paths, config))
}

/// Builds a scraper for the configured Java listing.
pub(crate) fn java_scraper(config: &Config) -> Result<CatalogScraper> {
    CatalogScraper::new(config.java.listing_url(), config.java.layout())
        .context("Failed to set up the listing scraper")
}

/// Builds the acquisition pipeline writing into the download cache.
pub(crate) fn java_pipeline(paths: &ToolupPaths, config: &Config) -> Result<AcquisitionPipeline> {
    let scraper = java_scraper(config)?;
    Ok(AcquisitionPipeline::new(
        Box::new(scraper),
        Box::new(HttpRetriever::new().with_progress(true)),
        paths.downloads.clone(),
    )
    .with_label_prefix(config.java.section_prefix.clone())
    .with_timeout(config.java.download_timeout()))
}

/// Acquires a version and turns every non-ready outcome into a [`ToolupError`].
pub(crate) async fn acquire_verified(
    pipeline: &AcquisitionPipeline,
    label: &str,
) -> Result<PathBuf> {
    match pipeline.acquire(label).await? {
        Acquired::Ready(path) => Ok(path),
        Acquired::NotFound { version } => Err(ToolupError::version_not_found(version).into()),
        Acquired::TransferFailed { url } => Err(ToolupError::download_failed(url).into()),
        Acquired::VerificationFailed {
            file_name,
            expected,
            actual,
        } => Err(ToolupError::checksum_mismatch(file_name, expected, actual).into()),
    }
}
