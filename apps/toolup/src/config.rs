//! `config.toml` handling.
//!
//! The file lives in the toolup home and is written with defaults the first
//! time it is needed. Every field may be omitted; missing fields take their
//! default value.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use toolup_catalog::{DEFAULT_LISTING_URL, ListingLayout};

use crate::paths::ToolupPaths;

/// Environment variable that overrides `java.listing_url`.
pub const JAVA_URL_ENV: &str = "TOOLUP_JAVA_URL";

/// Default WebDAV endpoint.
const DEFAULT_WEBDAV_URL: &str = "https://dav.jianguoyun.com/dav/";

/// Default remote backup directory.
const DEFAULT_REMOTE_DIR: &str = "/toolup_backups";

/// Default transfer timeout for Java archives: 300 minutes.
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300 * 60;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Java listing settings.
    pub java: JavaConfig,
    /// WebDAV backup settings.
    pub backup: BackupConfig,
}

/// Where and how the Java listing is scraped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JavaConfig {
    /// Downloads page URL.
    pub listing_url: String,
    /// CSS selector of the version tab bar.
    pub tabs_selector: String,
    /// Section id prefix, also stripped from user-entered labels.
    pub section_prefix: String,
    /// Token that marks archive rows (as opposed to installers).
    pub archive_marker: String,
    /// Transfer timeout for archives, in seconds.
    pub download_timeout_secs: u64,
}

impl Default for JavaConfig {
    fn default() -> Self {
        let layout = ListingLayout::default();
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            tabs_selector: layout.tabs_selector,
            section_prefix: layout.section_prefix,
            archive_marker: layout.archive_marker,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        }
    }
}

impl JavaConfig {
    /// Returns the listing URL, honouring `TOOLUP_JAVA_URL`.
    #[must_use]
    pub fn listing_url(&self) -> String {
        self.listing_url_with(std::env::var(JAVA_URL_ENV).ok())
    }

    fn listing_url_with(&self, override_url: Option<String>) -> String {
        override_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| self.listing_url.clone())
    }

    /// Returns the page layout used by the scraper.
    #[must_use]
    pub fn layout(&self) -> ListingLayout {
        ListingLayout {
            tabs_selector: self.tabs_selector.clone(),
            section_prefix: self.section_prefix.clone(),
            archive_marker: self.archive_marker.clone(),
        }
    }

    /// Returns the archive transfer timeout.
    #[must_use]
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

/// WebDAV backup settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// WebDAV endpoint.
    pub url: String,
    /// WebDAV user name.
    pub username: String,
    /// WebDAV password.
    pub password: String,
    /// Remote directory holding the backup files.
    pub remote_dir: String,
    /// Local backup directory; `<home>/backups` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_dir: Option<PathBuf>,
    /// Archive used to seed an empty backup directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_files: Option<String>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WEBDAV_URL.to_string(),
            username: String::new(),
            password: String::new(),
            remote_dir: DEFAULT_REMOTE_DIR.to_string(),
            local_dir: None,
            default_files: None,
        }
    }
}

impl BackupConfig {
    /// Returns `true` if both credentials are set.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.trim().is_empty()
    }

    /// Returns the local backup directory.
    #[must_use]
    pub fn local_dir(&self, paths: &ToolupPaths) -> PathBuf {
        self.local_dir
            .clone()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| paths.backups.clone())
    }

    /// Returns the seed archive URL, if one is configured.
    #[must_use]
    pub fn default_files(&self) -> Option<&str> {
        self.default_files
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

impl Config {
    /// Loads the configuration of a toolup home, writing defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or created.
    pub fn load_or_init(paths: &ToolupPaths) -> Result<Self> {
        let path = paths.config_file();
        if path.exists() {
            return Self::load(&path);
        }
        let config = Self::default();
        config.save(&path)?;
        tracing::info!(path = %path.display(), "wrote default configuration");
        Ok(config)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Writes the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;

    #[test]
    fn defaults_match_listing_layout() {
        let config = Config::default();
        assert_eq!(config.java.listing_url, DEFAULT_LISTING_URL);
        assert_eq!(config.java.layout(), ListingLayout::default());
        assert_eq!(config.java.download_timeout(), Duration::from_secs(18_000));
        assert_eq!(config.backup.url, "https://dav.jianguoyun.com/dav/");
        assert_eq!(config.backup.remote_dir, "/toolup_backups");
        assert!(!config.backup.is_configured());
    }

    #[test]
    fn load_or_init_writes_defaults_once() {
        let temp = TempDir::new().expect("temp dir");
        let paths = ToolupPaths::with_root(temp.path().to_path_buf());

        let config = Config::load_or_init(&paths).expect("init");
        assert_eq!(config, Config::default());
        temp.child("config.toml")
            .assert(predicates::str::contains("[java]"))
            .assert(predicates::str::contains("[backup]"));

        let mut edited = config.clone();
        edited.backup.username = "alice".to_string();
        edited.save(&paths.config_file()).expect("save");
        let reloaded = Config::load_or_init(&paths).expect("reload");
        assert_eq!(reloaded.backup.username, "alice");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let temp = TempDir::new().expect("temp dir");
        let file = temp.child("config.toml");
        file.write_str(
            "[backup]\nusername = \"bob\"\npassword = \"secret\"\ndefault_files = \"https://h/seed.zip\"\n",
        )
        .expect("write");

        let config = Config::load(file.path()).expect("load");
        assert_eq!(config.java, JavaConfig::default());
        assert!(config.backup.is_configured());
        assert_eq!(config.backup.remote_dir, "/toolup_backups");
        assert_eq!(config.backup.default_files(), Some("https://h/seed.zip"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = TempDir::new().expect("temp dir");
        let file = temp.child("config.toml");
        file.write_str("[java\nlisting_url = ").expect("write");
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn listing_url_override_ignores_blank_values() {
        let java = JavaConfig::default();
        assert_eq!(
            java.listing_url_with(Some(" http://127.0.0.1:8080/dl/ ".to_string())),
            "http://127.0.0.1:8080/dl/"
        );
        assert_eq!(java.listing_url_with(Some("   ".to_string())), DEFAULT_LISTING_URL);
        assert_eq!(java.listing_url_with(None), DEFAULT_LISTING_URL);
    }

    #[test]
    fn local_dir_defaults_to_home_backups() {
        let paths = ToolupPaths::with_root(PathBuf::from("/opt/toolup"));
        let mut backup = BackupConfig::default();
        assert_eq!(backup.local_dir(&paths), PathBuf::from("/opt/toolup/backups"));

        backup.local_dir = Some(PathBuf::from("/data/dotfiles"));
        assert_eq!(backup.local_dir(&paths), PathBuf::from("/data/dotfiles"));
    }

    #[test]
    fn blank_default_files_is_unset() {
        let backup = BackupConfig {
            default_files: Some("  ".to_string()),
            ..BackupConfig::default()
        };
        assert_eq!(backup.default_files(), None);
    }
}
