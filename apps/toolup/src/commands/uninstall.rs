//! Uninstall command for the toolup CLI.
//!
//! ```bash
//! toolup uninstall 17
//! ```

use anyhow::{Context, Result};
use clap::Args;
use toolup_catalog::normalize_label;

use super::load_environment;
use crate::errors::ToolupError;

/// Arguments for the uninstall command.
#[derive(Args)]
pub struct UninstallArgs {
    /// Version label to remove (e.g. "17" or "java17").
    pub version: String,
}

/// Executes the uninstall command.
///
/// # Errors
///
/// Returns an error if the version is not installed or its directory
/// cannot be removed. Labels that do not name a directory directly under
/// the versions directory are never installed.
pub fn execute(args: &UninstallArgs) -> Result<()> {
    let (paths, config) = load_environment()?;
    let label = normalize_label(&args.version, &config.java.section_prefix);

    let Some(dir) = paths.version_dir(label).filter(|dir| dir.is_dir()) else {
        return Err(ToolupError::not_installed(label).into());
    };

    std::fs::remove_dir_all(&dir)
        .with_context(|| format!("Failed to remove directory: {}", dir.display()))?;

    println!("Java {label} uninstalled.");
    Ok(())
}
