//! List command for the toolup CLI.
//!
//! ## Output Format
//!
//! ```text
//! Installed Java versions:
//!   17    /home/user/.toolup/java/versions/17
//!   21    /home/user/.toolup/java/versions/21
//! ```

use anyhow::Result;

use crate::paths::ToolupPaths;

/// Executes the list command.
///
/// # Errors
///
/// Returns an error if the versions directory cannot be read.
pub fn execute() -> Result<()> {
    let paths = ToolupPaths::new()?;
    let versions = paths.list_installed_versions()?;

    if versions.is_empty() {
        println!("No Java versions installed.");
        println!();
        println!("Run 'toolup versions' to see what can be installed.");
        return Ok(());
    }

    println!("Installed Java versions:");
    let width = versions.iter().map(String::len).max().unwrap_or(0);
    for version in &versions {
        println!(
            "  {version:<width$}    {}",
            paths.versions.join(version).display()
        );
    }
    Ok(())
}
