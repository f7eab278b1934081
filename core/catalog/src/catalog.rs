//! The in-memory version catalog.
//!
//! A [`VersionCatalog`] maps upstream version labels (for example `"21"`) to
//! the artifacts available for the current platform, in the order the
//! listing page presents them. Catalogs are filled by
//! [`CatalogScraper`](crate::listing::CatalogScraper) and are read-only
//! afterwards.

use indexmap::IndexMap;
use serde::Serialize;

/// One downloadable release file for the current platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    /// Absolute download URL.
    pub url: String,
    /// File name, taken from the last path segment of the URL.
    pub file_name: String,
    /// OS tag from the platform vocabulary.
    pub os: String,
    /// Architecture tag from the platform vocabulary.
    pub arch: String,
    /// Human-readable size as shown on the listing page (display only).
    pub size: String,
    /// Hex-encoded SHA-256 digest. Empty when the checksum could not be resolved.
    pub checksum: String,
}

impl Artifact {
    /// Extracts the file name from a download URL (last non-empty path segment).
    ///
    /// Example: `"https://host/jdk/21/jdk-21_linux-x64_bin.tar.gz"` -> `"jdk-21_linux-x64_bin.tar.gz"`
    #[must_use]
    pub fn file_name_from_url(url: &str) -> String {
        reqwest::Url::parse(url)
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .and_then(|mut segments| segments.rfind(|s| !s.is_empty()).map(str::to_string))
            })
            .unwrap_or_else(|| url.rsplit('/').next().unwrap_or(url).to_string())
    }

    /// Returns `true` if the artifact carries a checksum to verify against.
    #[must_use]
    pub fn has_checksum(&self) -> bool {
        !self.checksum.trim().is_empty()
    }
}

/// The artifacts published under one version label.
///
/// Never empty: labels without artifacts are not part of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionEntry {
    /// Upstream version label, without product prefix (e.g. `"17"`).
    pub label: String,
    artifacts: Vec<Artifact>,
}

impl VersionEntry {
    /// Returns the artifacts in listing order.
    #[must_use]
    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    /// Returns the canonical artifact for this version: the first one listed.
    #[must_use]
    pub fn canonical(&self) -> Option<&Artifact> {
        self.artifacts.first()
    }
}

/// Version label to artifacts index for the current platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VersionCatalog {
    entries: IndexMap<String, VersionEntry>,
}

impl VersionCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an artifact under `label`, creating the entry on first use.
    pub(crate) fn push(&mut self, label: &str, artifact: Artifact) {
        self.entries
            .entry(label.to_string())
            .or_insert_with(|| VersionEntry {
                label: label.to_string(),
                artifacts: Vec::new(),
            })
            .artifacts
            .push(artifact);
    }

    /// Looks up the entry for an exact version label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&VersionEntry> {
        self.entries.get(label)
    }

    /// Returns `true` if the catalog has an entry for `label`.
    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    /// Returns the version labels in listing order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates over the entries in listing order.
    pub fn entries(&self) -> impl Iterator<Item = &VersionEntry> {
        self.entries.values()
    }

    /// Number of version labels in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no version is available for this platform.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Artifact)> for VersionCatalog {
    fn from_iter<I: IntoIterator<Item = (String, Artifact)>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for (label, artifact) in iter {
            catalog.push(&label, artifact);
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(url: &str, checksum: &str) -> Artifact {
        Artifact {
            url: url.to_string(),
            file_name: Artifact::file_name_from_url(url),
            os: "linux".to_string(),
            arch: "x64".to_string(),
            size: "180 MB".to_string(),
            checksum: checksum.to_string(),
        }
    }

    #[test]
    fn file_name_is_last_path_segment() {
        assert_eq!(
            Artifact::file_name_from_url("https://x/jdk17-linux-x64.tar.gz"),
            "jdk17-linux-x64.tar.gz"
        );
        assert_eq!(
            Artifact::file_name_from_url("https://x/a/b/jdk.zip?token=1"),
            "jdk.zip"
        );
        assert_eq!(Artifact::file_name_from_url("https://x/dir/"), "dir");
        assert_eq!(Artifact::file_name_from_url("not a url/file.zip"), "file.zip");
    }

    #[test]
    fn push_groups_by_label_in_insertion_order() {
        let mut catalog = VersionCatalog::new();
        catalog.push("21", artifact("https://x/jdk-21.tar.gz", "aa"));
        catalog.push("17", artifact("https://x/jdk-17.tar.gz", "bb"));
        catalog.push("21", artifact("https://x/jdk-21-alt.tar.gz", "cc"));

        assert_eq!(catalog.labels().collect::<Vec<_>>(), vec!["21", "17"]);
        let entry = catalog.get("21").expect("entry");
        assert_eq!(entry.label, "21");
        assert_eq!(entry.artifacts().len(), 2);
        assert_eq!(
            entry.canonical().map(|a| a.file_name.as_str()),
            Some("jdk-21.tar.gz")
        );
    }

    #[test]
    fn absent_label_has_no_entry() {
        let catalog: VersionCatalog =
            [("17".to_string(), artifact("https://x/jdk-17.tar.gz", "bb"))]
                .into_iter()
                .collect();
        assert!(catalog.contains("17"));
        assert!(!catalog.contains("8"));
        assert!(catalog.get("8").is_none());
        assert_eq!(catalog.len(), 1);
        assert!(!catalog.is_empty());
        assert!(VersionCatalog::new().is_empty());
    }

    #[test]
    fn has_checksum_ignores_whitespace() {
        assert!(artifact("https://x/a.zip", "abc123").has_checksum());
        assert!(!artifact("https://x/a.zip", "").has_checksum());
        assert!(!artifact("https://x/a.zip", " \n").has_checksum());
    }

    #[test]
    fn catalog_serializes_as_map() {
        let catalog: VersionCatalog =
            [("17".to_string(), artifact("https://x/jdk-17.tar.gz", "bb"))]
                .into_iter()
                .collect();
        let json = serde_json::to_value(&catalog).expect("serializes");
        assert_eq!(json["17"]["label"], "17");
        assert_eq!(json["17"]["artifacts"][0]["file_name"], "jdk-17.tar.gz");
    }
}
