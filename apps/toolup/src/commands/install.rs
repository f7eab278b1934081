//! Install command for the toolup CLI.
//!
//! ## Usage
//!
//! ```bash
//! toolup install 21
//! ```
//!
//! The archive is acquired through the download cache and extracted into
//! `<home>/java/versions/<label>`. Extraction happens in a staging directory
//! that is renamed into place only once complete.

use anyhow::Result;
use clap::Args;
use toolup_catalog::normalize_label;

use super::{acquire_verified, java_pipeline, load_environment};
use crate::archive::install_staged;
use crate::errors::ToolupError;

/// Arguments for the install command.
#[derive(Args)]
pub struct InstallArgs {
    /// Version label (e.g. "21" or "java21").
    pub version: String,
}

/// Executes the install command.
///
/// # Process
///
/// 1. Normalize the label and stop if that version is already installed
///    (labels that are not a plain directory name are never found)
/// 2. Acquire and verify the archive for the current platform
/// 3. Extract it into the versions directory through a staging directory
///
/// # Errors
///
/// Returns an error if acquisition or extraction fails.
pub async fn execute(args: &InstallArgs) -> Result<()> {
    let (paths, config) = load_environment()?;
    let label = normalize_label(&args.version, &config.java.section_prefix).to_string();

    let Some(target) = paths.version_dir(&label) else {
        return Err(ToolupError::version_not_found(label).into());
    };
    if target.is_dir() {
        println!("Java {label} is already installed at {}", target.display());
        return Ok(());
    }

    paths.ensure_directories()?;
    let pipeline = java_pipeline(&paths, &config)?;
    let archive = acquire_verified(&pipeline, &label).await?;

    println!("Extracting {}...", archive.display());
    install_staged(&archive, &target).map_err(|e| ToolupError::install_error(format!("{e:#}")))?;

    println!("Java {label} installed to {}", target.display());
    Ok(())
}
