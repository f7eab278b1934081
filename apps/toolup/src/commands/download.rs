//! Download command for the toolup CLI.
//!
//! Fetches the archive of a version into the download cache, verifies its
//! SHA-256 digest and prints the path of the verified file.
//!
//! ## Usage
//!
//! ```bash
//! toolup download 21
//! toolup download java17
//! ```

use anyhow::Result;
use clap::Args;

use super::{acquire_verified, java_pipeline, load_environment};

/// Arguments for the download command.
#[derive(Args)]
pub struct DownloadArgs {
    /// Version label (e.g. "21" or "java21").
    pub version: String,
}

/// Executes the download command.
///
/// # Errors
///
/// Returns an error if the version is not listed for this platform, the
/// transfer fails or the digest does not match.
pub async fn execute(args: &DownloadArgs) -> Result<()> {
    let (paths, config) = load_environment()?;
    paths.ensure_directories()?;

    let pipeline = java_pipeline(&paths, &config)?;
    let archive = acquire_verified(&pipeline, &args.version).await?;

    println!("{}", archive.display());
    Ok(())
}
