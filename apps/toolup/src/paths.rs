//! Filesystem layout of a toolup home.
//!
//! The root directory is `~/.toolup/` (`%APPDATA%\toolup` on Windows) and can
//! be overridden with the `TOOLUP_HOME` environment variable.
//!
//! ```text
//! ~/.toolup/                  # Root directory (or TOOLUP_HOME)
//!   config.toml               # Listing and backup settings
//!   java/
//!     downloads/              # Verified archives, named as upstream
//!     versions/
//!       21/                   # Extracted installation per version label
//!       17/
//!   backups/                  # Default local side of the backup sync
//! ```

use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

/// Environment variable to override the default root directory.
pub const TOOLUP_HOME_ENV: &str = "TOOLUP_HOME";

const CONFIG_FILE: &str = "config.toml";
const SEED_ARCHIVE: &str = "seed.zip";

/// Paths of a toolup home directory.
#[derive(Debug, Clone)]
pub struct ToolupPaths {
    /// Root directory (`~/.toolup` or `TOOLUP_HOME`).
    pub root: PathBuf,
    /// Download cache for Java archives.
    pub downloads: PathBuf,
    /// Installed Java versions, one directory per label.
    pub versions: PathBuf,
    /// Default local backup directory.
    pub backups: PathBuf,
}

impl ToolupPaths {
    /// Resolves the root directory from the environment.
    ///
    /// 1. The `TOOLUP_HOME` environment variable if set and non-empty
    /// 2. On Windows: `%APPDATA%\toolup`
    /// 3. Elsewhere: `~/.toolup`
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        let root = if let Some(home) = std::env::var_os(TOOLUP_HOME_ENV).filter(|h| !h.is_empty()) {
            PathBuf::from(home)
        } else {
            #[cfg(windows)]
            {
                dirs::data_dir()
                    .context("Cannot determine AppData directory. Set TOOLUP_HOME environment variable.")?
                    .join("toolup")
            }
            #[cfg(not(windows))]
            {
                dirs::home_dir()
                    .context("Cannot determine home directory. Set TOOLUP_HOME environment variable.")?
                    .join(".toolup")
            }
        };

        Ok(Self::with_root(root))
    }

    /// Lays out the directories under an explicit root.
    #[must_use = "returns new paths instance without side effects"]
    pub fn with_root(root: PathBuf) -> Self {
        let java = root.join("java");
        Self {
            downloads: java.join("downloads"),
            versions: java.join("versions"),
            backups: root.join("backups"),
            root,
        }
    }

    /// Returns the configuration file path.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Returns the temporary location of the backup seed archive.
    #[must_use]
    pub fn seed_archive(&self) -> PathBuf {
        self.root.join(SEED_ARCHIVE)
    }

    /// Returns the installation directory of a version label.
    ///
    /// Returns `None` unless the label is a plain directory name (see
    /// [`is_plain_label`]), so the result always lies directly inside the
    /// versions directory.
    #[must_use]
    pub fn version_dir(&self, label: &str) -> Option<PathBuf> {
        is_plain_label(label).then(|| self.versions.join(label))
    }

    /// Checks if a version label is installed.
    #[must_use]
    pub fn is_version_installed(&self, label: &str) -> bool {
        self.version_dir(label).is_some_and(|dir| dir.is_dir())
    }

    /// Creates the cache, installation and backup directories.
    ///
    /// # Errors
    ///
    /// Returns an error if any directory cannot be created.
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.root, &self.downloads, &self.versions, &self.backups] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }

    /// Lists installed version labels, oldest release first.
    ///
    /// Hidden entries (such as in-progress staging directories) are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the versions directory exists but cannot be read.
    pub fn list_installed_versions(&self) -> Result<Vec<String>> {
        if !self.versions.exists() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.versions).with_context(|| {
            format!(
                "Failed to read versions directory: {}",
                self.versions.display()
            )
        })?;

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.context("Failed to read directory entry")?;
            if !entry.path().is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && !name.starts_with('.')
            {
                versions.push(name.to_string());
            }
        }

        versions.sort_by_key(|v| version_sort_key(v));
        Ok(versions)
    }
}

/// Orders labels like `8`, `11.0.2`, `17`, `21` numerically, with
/// non-numeric labels after the numeric ones.
fn version_sort_key(label: &str) -> (Vec<u64>, String) {
    let numbers = label
        .split(['.', '_', '-', '+'])
        .map_while(|part| part.parse::<u64>().ok())
        .collect::<Vec<_>>();
    let numbers = if numbers.is_empty() {
        vec![u64::MAX]
    } else {
        numbers
    };
    (numbers, label.to_string())
}

/// Returns `true` if `label` can name a directory under `java/versions`.
///
/// The label must be exactly one normal path component without separators.
/// Hidden names are refused as well; they are reserved for staging.
#[must_use]
pub fn is_plain_label(label: &str) -> bool {
    let mut components = Path::new(label).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !label.starts_with('.')
        && !label.contains(['/', '\\'])
}

/// Returns `true` if `dir` is missing or has no entries.
#[must_use]
pub fn is_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir).map_or(true, |mut entries| entries.next().is_none())
}
