#![warn(clippy::pedantic)]

//! # toolup-catalog
//!
//! Release catalog scraping and verified artifact acquisition.
//!
//! The crate turns an upstream downloads page (an HTML listing plus one
//! checksum document per release file) into a platform-filtered
//! [`VersionCatalog`], and turns a catalog entry into a local file whose
//! SHA-256 digest has been checked.
//!
//! ## Pipeline
//!
//! 1. [`PlatformTags`] maps the running OS/arch onto the listing's vocabulary
//! 2. [`CatalogScraper`] fetches the page and collects matching rows
//! 3. [`ChecksumResolver`] fetches the digest behind every accepted row
//! 4. [`AcquisitionPipeline`] downloads through a [`Retriever`] and verifies
//!
//! ## Example
//!
//! ```no_run
//! use toolup_catalog::{
//!     AcquisitionPipeline, CatalogScraper, HttpRetriever, ListingLayout, DEFAULT_LISTING_URL,
//! };
//!
//! # async fn demo() -> Result<(), toolup_catalog::CatalogError> {
//! let scraper = CatalogScraper::new(DEFAULT_LISTING_URL, ListingLayout::default())?;
//! let pipeline = AcquisitionPipeline::new(
//!     Box::new(scraper),
//!     Box::new(HttpRetriever::new()),
//!     "/tmp/toolup-cache",
//! );
//! if let Some(path) = pipeline.acquire("java21").await?.into_path() {
//!     println!("verified: {}", path.display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod acquire;
pub mod catalog;
pub mod checksum;
pub mod download;
pub mod errors;
pub mod html;
pub mod listing;
pub mod platform;
pub mod verify;

pub use acquire::{
    AcquisitionPipeline, Acquired, CatalogSource, DEFAULT_LABEL_PREFIX, DEFAULT_TRANSFER_TIMEOUT,
    normalize_label,
};
pub use catalog::{Artifact, VersionCatalog, VersionEntry};
pub use checksum::{ChecksumResolver, HttpChecksumResolver};
pub use download::{HttpRetriever, Retriever, WriteMode, format_bytes};
pub use errors::CatalogError;
pub use listing::{CatalogScraper, DEFAULT_LISTING_URL, ListingLayout, accepts_row};
pub use platform::PlatformTags;
pub use verify::{compute_sha256, digest_matches};
