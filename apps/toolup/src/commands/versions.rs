//! Versions command for the toolup CLI.
//!
//! Scrapes the Java downloads listing and shows the archive published for
//! the current platform under each version label.
//!
//! ## Output Format
//!
//! ```text
//! Available Java versions (linux-x64):
//!
//!   java21  jdk-21_linux-x64_bin.tar.gz  (191.82 MB) *
//!   java17  jdk-17_linux-x64_bin.tar.gz  (174.84 MB)
//!
//!   * = installed
//! ```

use anyhow::Result;
use clap::Args;
use toolup_catalog::VersionCatalog;

use super::{java_scraper, load_environment};
use crate::paths::ToolupPaths;

/// Arguments for the versions command.
#[derive(Args)]
pub struct VersionsArgs {
    /// Print the catalog as JSON.
    #[clap(long, short = 'j')]
    pub json: bool,
}

/// Executes the versions command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or the listing
/// page cannot be fetched.
pub async fn execute(args: &VersionsArgs) -> Result<()> {
    let (paths, config) = load_environment()?;
    let scraper = java_scraper(&config)?;
    let catalog = scraper.scrape().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    let platform = scraper.platform();
    if catalog.is_empty() {
        println!("No Java versions available for {platform}.");
        return Ok(());
    }

    println!("Available Java versions ({platform}):");
    println!();
    for line in format_rows(&catalog, &paths, &config.java.section_prefix) {
        println!("  {line}");
    }
    println!();
    println!("  * = installed");
    Ok(())
}

fn format_rows(catalog: &VersionCatalog, paths: &ToolupPaths, prefix: &str) -> Vec<String> {
    let rows = catalog
        .entries()
        .filter_map(|entry| {
            let artifact = entry.canonical()?;
            let name = format!("{prefix}{}", entry.label);
            let marker = if paths.is_version_installed(&entry.label) {
                " *"
            } else {
                ""
            };
            Some((name, artifact.file_name.as_str(), artifact.size.trim(), marker))
        })
        .collect::<Vec<_>>();

    let name_width = rows.iter().map(|(name, ..)| name.len()).max().unwrap_or(0);
    rows.into_iter()
        .map(|(name, file, size, marker)| {
            if size.is_empty() {
                format!("{name:<name_width$}  {file}{marker}")
            } else {
                format!("{name:<name_width$}  {file}  ({size}){marker}")
            }
        })
        .collect()
}
