//! Listing page scraper.
//!
//! Turns the upstream downloads page into a [`VersionCatalog`]. The page is
//! organised as a tab bar whose anchors point at per-version sections; each
//! section holds a table with one release file per row:
//!
//! ```text
//! <ul class="rw-inpagetabs">
//!   <li><a href="#java21">JDK 21</a></li>
//!   ...
//! </ul>
//! <div id="java21">
//!   <table>
//!     <tr><th>Product/file description</th><th>File size</th><th>Download</th></tr>
//!     <tr>
//!       <td>x64 Compressed Archive</td>
//!       <td>186.63 MB</td>
//!       <td><a href=".../jdk-21_linux-x64_bin.tar.gz">...</a>
//!           (<a href=".../jdk-21_linux-x64_bin.tar.gz.sha256">sha256</a>)</td>
//!     </tr>
//!   </table>
//! </div>
//! ```
//!
//! A build runs in two passes. [`CatalogScraper::scan`] walks the parsed
//! document synchronously and collects the accepted rows; afterwards
//! [`CatalogScraper::build_catalog`] fetches the checksum documents of those
//! rows one after the other. The parsed document is not `Send`, so it is
//! dropped before the second pass starts awaiting. Failures
//! inside a build (missing table, unreachable checksum) only shrink or
//! degrade the result; only the top-level page fetch can fail.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::Url;
use tracing::{debug, info, warn};

use crate::catalog::{Artifact, VersionCatalog};
use crate::checksum::{ChecksumResolver, HttpChecksumResolver, USER_AGENT};
use crate::errors::CatalogError;
use crate::html::{Document, Node, Query};
use crate::platform::PlatformTags;

/// Default listing page for Java SE downloads.
pub const DEFAULT_LISTING_URL: &str = "https://www.oracle.com/java/technologies/downloads/";

/// Request timeout for the listing page, in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Structural conventions of the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingLayout {
    /// Selector of the tab bar enumerating version sections (first match wins).
    pub tabs_selector: String,
    /// Token preceding the version label in tab fragments and section ids.
    pub section_prefix: String,
    /// Substring of the row label that marks a plain archive (vs. installers).
    pub archive_marker: String,
}

impl Default for ListingLayout {
    fn default() -> Self {
        Self {
            tabs_selector: "ul.rw-inpagetabs".to_string(),
            section_prefix: "java".to_string(),
            archive_marker: "archive".to_string(),
        }
    }
}

/// A table row that passed the acceptance predicate, before checksum resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRow {
    /// Version label of the enclosing section.
    pub version: String,
    /// Lower-cased file description (first column).
    pub description: String,
    /// Size text (second column), as written on the page.
    pub size: String,
    /// Absolute download URL (first anchor of the third column).
    pub download_url: String,
    /// Absolute checksum-document URL (second anchor), empty when missing.
    pub checksum_url: String,
}

/// Decides whether a listing row belongs to the current platform.
///
/// `description` must already be lower-cased. A row is accepted when its
/// description names the architecture tag and the archive marker, and its
/// download link names the OS tag. `download_href` is the link as written on
/// the page, before resolution, so the host of the listing page never counts.
/// Empty tags never match.
#[must_use]
pub fn accepts_row(
    description: &str,
    download_href: &str,
    tags: PlatformTags,
    archive_marker: &str,
) -> bool {
    tags.is_supported()
        && !archive_marker.is_empty()
        && description.contains(tags.arch)
        && description.contains(archive_marker)
        && download_href.contains(tags.os)
}

/// Extracts the version label from a tab anchor.
///
/// Takes the URL fragment (or the whole href when there is none) and keeps
/// what follows the last occurrence of `prefix`: `"#java21"` -> `"21"`.
/// Returns `None` when the prefix does not occur or nothing follows it.
#[must_use]
pub fn section_label<'h>(href: &'h str, prefix: &str) -> Option<&'h str> {
    if prefix.is_empty() {
        return None;
    }
    let fragment = href.rsplit_once('#').map_or(href, |(_, fragment)| fragment);
    let (_, label) = fragment.rsplit_once(prefix)?;
    let label = label.trim();
    (!label.is_empty()).then_some(label)
}

/// Builds [`VersionCatalog`]s from the upstream listing page.
pub struct CatalogScraper {
    listing_url: String,
    layout: ListingLayout,
    tags: PlatformTags,
    checksums: Box<dyn ChecksumResolver>,
}

impl CatalogScraper {
    /// Creates a scraper for the current platform with an HTTP checksum resolver.
    ///
    /// The URL is not validated here; see [`CatalogScraper::fetch_document`].
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Fetch`] if the HTTP client cannot be built.
    pub fn new(listing_url: impl Into<String>, layout: ListingLayout) -> Result<Self, CatalogError> {
        Ok(Self {
            listing_url: listing_url.into(),
            layout,
            tags: PlatformTags::current(),
            checksums: Box::new(HttpChecksumResolver::new()?),
        })
    }

    /// Targets a platform other than the running one.
    #[must_use]
    pub fn with_platform(mut self, tags: PlatformTags) -> Self {
        self.tags = tags;
        self
    }

    /// Replaces the checksum resolver.
    #[must_use]
    pub fn with_checksum_resolver(mut self, checksums: Box<dyn ChecksumResolver>) -> Self {
        self.checksums = checksums;
        self
    }

    /// Returns the platform tags rows are matched against.
    #[must_use]
    pub fn platform(&self) -> PlatformTags {
        self.tags
    }

    /// Returns the configured listing URL.
    #[must_use]
    pub fn listing_url(&self) -> &str {
        &self.listing_url
    }

    /// Fetches the listing page and builds the catalog from it.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Config`] if a layout selector does not parse,
    /// otherwise see [`CatalogScraper::fetch_document`]. Nothing after the
    /// page fetch can fail.
    pub async fn scrape(&self) -> Result<VersionCatalog, CatalogError> {
        Queries::new(&self.layout)?;
        let rows = {
            let document = self.fetch_document().await?;
            self.scan(&document)
        };
        let catalog = self.build_catalog(rows).await;
        info!(
            versions = catalog.len(),
            platform = %self.tags,
            "built version catalog"
        );
        Ok(catalog)
    }

    /// Validates the listing URL, fetches it once and parses the body.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::Config`] if the URL is empty or malformed (no request is made)
    /// - [`CatalogError::Fetch`] on network failure, non-success status or unreadable body
    pub async fn fetch_document(&self) -> Result<Document, CatalogError> {
        let url = parse_listing_url(&self.listing_url)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CatalogError::fetch_with_source("failed to create HTTP client", e))?;

        debug!(%url, "fetching listing page");
        let response = client.get(url.clone()).send().await.map_err(|e| {
            CatalogError::fetch_with_source(format!("failed to fetch listing from {url}"), e)
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::fetch(format!("HTTP {status} from {url}")));
        }

        let body = response.text().await.map_err(|e| {
            CatalogError::fetch_with_source(format!("failed to read listing from {url}"), e)
        })?;

        Ok(Document::parse(&body, url))
    }

    /// Builds a catalog from rows returned by [`CatalogScraper::scan`],
    /// resolving the checksum of each.
    ///
    /// Infallible: unreachable checksum documents leave an empty digest.
    pub async fn build_catalog(&self, rows: Vec<CandidateRow>) -> VersionCatalog {
        let mut catalog = VersionCatalog::new();
        for row in rows {
            let checksum = if row.checksum_url.is_empty() {
                warn!(url = %row.download_url, "row has no checksum link");
                String::new()
            } else {
                self.checksums.resolve(&row.checksum_url).await
            };

            let artifact = Artifact {
                file_name: Artifact::file_name_from_url(&row.download_url),
                url: row.download_url,
                os: self.tags.os.to_string(),
                arch: self.tags.arch.to_string(),
                size: row.size,
                checksum,
            };
            catalog.push(&row.version, artifact);
        }
        catalog
    }

    /// Walks the document and returns the accepted rows in document order.
    ///
    /// Pure: performs no I/O, so scanning the same document twice yields the
    /// same rows.
    #[must_use]
    pub fn scan(&self, document: &Document) -> Vec<CandidateRow> {
        if !self.tags.is_supported() {
            warn!(
                os = std::env::consts::OS,
                arch = std::env::consts::ARCH,
                "platform has no listing tags, no artifact can match"
            );
            return Vec::new();
        }

        let queries = match Queries::new(&self.layout) {
            Ok(queries) => queries,
            Err(e) => {
                warn!(error = %e, "cannot scan listing");
                return Vec::new();
            }
        };

        let Some(tabs) = document.first(&queries.tabs) else {
            warn!(
                selector = %self.layout.tabs_selector,
                "listing has no version tabs, page layout may have changed"
            );
            return Vec::new();
        };

        let mut rows = Vec::new();
        let mut visited = HashSet::new();
        for anchor in tabs.select(&queries.tab_anchor) {
            let Some(href) = anchor.attr("href") else {
                continue;
            };
            let Some(label) = section_label(href, &self.layout.section_prefix) else {
                debug!(href, "tab does not name a version section");
                continue;
            };
            let section_id = format!("{}{label}", self.layout.section_prefix);
            if !visited.insert(section_id.clone()) {
                debug!(href, section = %section_id, "section already scanned");
                continue;
            }
            let Some(table) = document
                .element_by_id(&section_id)
                .and_then(|section| section_table(section, &queries.table))
            else {
                debug!(section = %section_id, "version section has no table, skipping");
                continue;
            };

            for row in table.select(&queries.row).into_iter().skip(1) {
                if let Some(candidate) = self.read_row(document, &queries, row, label) {
                    rows.push(candidate);
                }
            }
        }
        rows
    }

    /// Reads one table row and applies the acceptance predicate.
    fn read_row(
        &self,
        document: &Document,
        queries: &Queries,
        row: Node<'_>,
        label: &str,
    ) -> Option<CandidateRow> {
        let cells = row.select(&queries.cell);
        let [description, size, links, ..] = cells.as_slice() else {
            return None;
        };

        let anchors = links.select(&queries.anchor);
        let href = anchors.first().and_then(|a| a.attr("href"))?;

        let description = description.text().to_lowercase();
        if !accepts_row(&description, href, self.tags, &self.layout.archive_marker) {
            return None;
        }
        let download_url = document.resolve(href)?.to_string();

        let checksum_url = anchors
            .get(1)
            .and_then(|a| a.attr("href"))
            .and_then(|href| document.resolve(href))
            .map(String::from)
            .unwrap_or_default();

        Some(CandidateRow {
            version: label.to_string(),
            description: description.trim().to_string(),
            size: size.text(),
            download_url,
            checksum_url,
        })
    }
}

/// Returns the data table of a version section: inside it, or else inside
/// one of the following siblings up to the next element carrying an `id`
/// (the next section).
fn section_table<'a>(section: Node<'a>, table: &Query) -> Option<Node<'a>> {
    if section.name() == "table" {
        return Some(section);
    }
    section.first(table).or_else(|| {
        section
            .following_siblings()
            .take_while(|sibling| sibling.id().is_none())
            .find_map(|sibling| {
                if sibling.name() == "table" {
                    Some(sibling)
                } else {
                    sibling.first(table)
                }
            })
    })
}

/// Validates the configured listing URL.
fn parse_listing_url(raw: &str) -> Result<Url, CatalogError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CatalogError::config("listing URL is empty"));
    }
    let url = Url::parse(raw)
        .map_err(|e| CatalogError::config(format!("listing URL `{raw}` is malformed: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CatalogError::config(format!(
            "listing URL `{raw}` must use http or https"
        )));
    }
    Ok(url)
}

/// Selectors compiled once per scan.
struct Queries {
    tabs: Query,
    tab_anchor: Query,
    table: Query,
    row: Query,
    cell: Query,
    anchor: Query,
}

impl Queries {
    fn new(layout: &ListingLayout) -> Result<Self, CatalogError> {
        Ok(Self {
            tabs: Query::new(&layout.tabs_selector)?,
            tab_anchor: Query::new("li a[href]")?,
            table: Query::new("table")?,
            row: Query::new("tr")?,
            cell: Query::new("td")?,
            anchor: Query::new("a")?,
        })
    }
}
