//! Verified artifact acquisition.
//!
//! [`AcquisitionPipeline`] resolves a human-entered version label against a
//! lazily built [`VersionCatalog`], downloads the canonical artifact into the
//! cache directory and checks its SHA-256 digest before handing out a path.
//!
//! The transfer lands in `<cache>/<file>.part` and is renamed onto
//! `<cache>/<file>` only once the digest matches, so a failed attempt never
//! disturbs what the cache held before.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::catalog::{Artifact, VersionCatalog};
use crate::download::{Retriever, WriteMode};
use crate::errors::CatalogError;
use crate::listing::CatalogScraper;
use crate::verify::{compute_sha256, digest_matches, digest_token};

/// Default transfer timeout: 300 minutes.
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(300 * 60);

/// Default product prefix stripped from version labels.
pub const DEFAULT_LABEL_PREFIX: &str = "java";

/// Suffix of in-flight downloads inside the cache directory.
const PARTIAL_SUFFIX: &str = ".part";

/// Produces the catalog an [`AcquisitionPipeline`] resolves labels against.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Builds a fresh catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the catalog cannot be built at all.
    async fn load(&self) -> Result<VersionCatalog, CatalogError>;
}

#[async_trait]
impl CatalogSource for CatalogScraper {
    async fn load(&self) -> Result<VersionCatalog, CatalogError> {
        self.scrape().await
    }
}

/// A fixed, prebuilt catalog.
#[async_trait]
impl CatalogSource for VersionCatalog {
    async fn load(&self) -> Result<VersionCatalog, CatalogError> {
        Ok(self.clone())
    }
}

/// Outcome of [`AcquisitionPipeline::acquire`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "an acquisition outcome should be checked"]
pub enum Acquired {
    /// The artifact was downloaded and its digest matched.
    Ready(PathBuf),
    /// The catalog has no entry for the requested version.
    NotFound {
        /// The normalized label that was looked up.
        version: String,
    },
    /// The transfer produced no bytes.
    TransferFailed {
        /// The URL that was requested.
        url: String,
    },
    /// The downloaded bytes did not match the recorded digest. The file was removed.
    VerificationFailed {
        /// The downloaded file name.
        file_name: String,
        /// The recorded digest (empty if none was published).
        expected: String,
        /// The digest of the downloaded bytes.
        actual: String,
    },
}

impl Acquired {
    /// Returns the verified path, if the acquisition succeeded.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Acquired::Ready(path) => Some(path),
            _ => None,
        }
    }

    /// Consumes the outcome and returns the verified path, if any.
    #[must_use]
    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            Acquired::Ready(path) => Some(path),
            _ => None,
        }
    }

    /// Returns `true` if the acquisition succeeded.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Acquired::Ready(_))
    }
}

/// Strips the product prefix from a version label.
///
/// `"java17"` becomes `"17"`; `"17"` stays `"17"`. Matching is
/// case-insensitive and surrounding whitespace is ignored.
#[must_use]
pub fn normalize_label<'a>(label: &'a str, prefix: &str) -> &'a str {
    let label = label.trim();
    if !prefix.is_empty()
        && let Some(head) = label.get(..prefix.len())
        && head.eq_ignore_ascii_case(prefix)
    {
        return label[prefix.len()..].trim_start();
    }
    label
}

/// Resolves version labels to verified local files.
pub struct AcquisitionPipeline {
    source: Box<dyn CatalogSource>,
    retriever: Box<dyn Retriever>,
    cache_dir: PathBuf,
    label_prefix: String,
    timeout: Duration,
    catalog: OnceCell<VersionCatalog>,
}

impl AcquisitionPipeline {
    /// Creates a pipeline that downloads into `cache_dir`.
    ///
    /// The catalog is not built until first needed.
    #[must_use]
    pub fn new(
        source: Box<dyn CatalogSource>,
        retriever: Box<dyn Retriever>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            retriever,
            cache_dir: cache_dir.into(),
            label_prefix: DEFAULT_LABEL_PREFIX.to_string(),
            timeout: DEFAULT_TRANSFER_TIMEOUT,
            catalog: OnceCell::new(),
        }
    }

    /// Sets the product prefix stripped from version labels.
    #[must_use]
    pub fn with_label_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.label_prefix = prefix.into();
        self
    }

    /// Sets the transfer timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the product prefix stripped from version labels.
    #[must_use]
    pub fn label_prefix(&self) -> &str {
        &self.label_prefix
    }

    /// Returns the catalog, building it on first use.
    ///
    /// # Errors
    ///
    /// Propagates the error of the first build. A failed build is not
    /// cached; the next call tries again.
    pub async fn catalog(&self) -> Result<&VersionCatalog, CatalogError> {
        self.catalog
            .get_or_try_init(|| async { self.source.load().await })
            .await
    }

    /// Discards the cached catalog and builds a new one.
    ///
    /// # Errors
    ///
    /// See [`AcquisitionPipeline::catalog`].
    pub async fn refresh(&mut self) -> Result<&VersionCatalog, CatalogError> {
        self.catalog = OnceCell::new();
        self.catalog().await
    }

    /// Looks up the canonical artifact for a version label.
    ///
    /// # Errors
    ///
    /// See [`AcquisitionPipeline::catalog`].
    pub async fn resolve(&self, label: &str) -> Result<Option<&Artifact>, CatalogError> {
        let version = normalize_label(label, &self.label_prefix);
        let catalog = self.catalog().await?;
        Ok(catalog.get(version).and_then(|entry| entry.canonical()))
    }

    /// Downloads and verifies the artifact for `label`.
    ///
    /// Returns [`Acquired::Ready`] with `<cache>/<file name>` only if the
    /// digest of the downloaded bytes matches the catalog. Every other
    /// outcome leaves the cache directory as it was, including not existing
    /// at all.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::Config`] / [`CatalogError::Fetch`] if the catalog cannot be built
    /// - [`CatalogError::Io`] if the cache directory cannot be prepared or
    ///   the downloaded file cannot be read or moved into place
    pub async fn acquire(&self, label: &str) -> Result<Acquired, CatalogError> {
        let version = normalize_label(label, &self.label_prefix);
        let catalog = self.catalog().await?;
        let Some(artifact) = catalog.get(version).and_then(|entry| entry.canonical()) else {
            debug!(version, "version not in catalog");
            return Ok(Acquired::NotFound {
                version: version.to_string(),
            });
        };

        if !is_plain_file_name(&artifact.file_name) {
            warn!(url = %artifact.url, "artifact URL has no usable file name");
            return Ok(Acquired::TransferFailed {
                url: artifact.url.clone(),
            });
        }

        let created = missing_dirs(&self.cache_dir);
        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| CatalogError::io("failed to create cache directory", &self.cache_dir, e))?;

        let outcome = self.fetch_verified(artifact).await;
        if !matches!(outcome, Ok(Acquired::Ready(_))) {
            remove_created_dirs(&created).await;
        }
        outcome
    }

    /// Transfers `artifact` into the existing cache directory and verifies it.
    async fn fetch_verified(&self, artifact: &Artifact) -> Result<Acquired, CatalogError> {
        let target = self.cache_dir.join(&artifact.file_name);
        let partial = self
            .cache_dir
            .join(format!("{}{PARTIAL_SUFFIX}", artifact.file_name));

        info!(url = %artifact.url, dest = %target.display(), "downloading artifact");
        let bytes = self
            .retriever
            .get(&artifact.url, &partial, WriteMode::Truncate, self.timeout)
            .await;

        if bytes == 0 {
            remove_partial(&partial).await;
            return Ok(Acquired::TransferFailed {
                url: artifact.url.clone(),
            });
        }

        let actual = match compute_sha256(&partial) {
            Ok(digest) => digest,
            Err(e) => {
                remove_partial(&partial).await;
                return Err(e);
            }
        };

        if !digest_matches(&artifact.checksum, &actual) {
            warn!(
                file = %artifact.file_name,
                expected = digest_token(&artifact.checksum),
                actual = %actual,
                "checksum mismatch, removing download"
            );
            remove_partial(&partial).await;
            return Ok(Acquired::VerificationFailed {
                file_name: artifact.file_name.clone(),
                expected: digest_token(&artifact.checksum).to_string(),
                actual,
            });
        }

        if let Err(e) = tokio::fs::rename(&partial, &target).await {
            remove_partial(&partial).await;
            return Err(CatalogError::io("failed to move download into place", &target, e));
        }

        info!(path = %target.display(), bytes, "artifact verified");
        Ok(Acquired::Ready(target))
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
}

/// Returns `dir` and those of its ancestors that do not exist yet, innermost first.
fn missing_dirs(dir: &Path) -> Vec<PathBuf> {
    dir.ancestors()
        .take_while(|d| !d.as_os_str().is_empty() && !d.exists())
        .map(Path::to_path_buf)
        .collect()
}

/// Removes directories created for a download that did not succeed.
async fn remove_created_dirs(dirs: &[PathBuf]) {
    for dir in dirs {
        if let Err(e) = tokio::fs::remove_dir(dir).await {
            warn!(path = %dir.display(), error = %e, "failed to remove cache directory");
            break;
        }
    }
}

async fn remove_partial(path: &Path) {
    if path.exists()
        && let Err(e) = tokio::fs::remove_file(path).await
    {
        warn!(path = %path.display(), error = %e, "failed to remove partial download");
    }
}
