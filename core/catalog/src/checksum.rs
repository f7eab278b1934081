//! Checksum document resolution.
//!
//! Each row of the listing links to a small text document holding the
//! SHA-256 digest of the artifact. Resolving it never fails the catalog
//! build: on any error the digest degrades to an empty string, so the
//! artifact stays listed but is rejected after download.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::errors::CatalogError;

/// Request timeout for checksum documents, in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// User-Agent header for HTTP requests.
pub(crate) const USER_AGENT: &str = concat!("toolup/", env!("CARGO_PKG_VERSION"));

/// Fetches the textual digest behind a checksum-document URL.
#[async_trait]
pub trait ChecksumResolver: Send + Sync {
    /// Returns the body of the checksum document, or an empty string on failure.
    async fn resolve(&self, url: &str) -> String;
}

/// [`ChecksumResolver`] backed by a single HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpChecksumResolver {
    client: reqwest::Client,
}

impl HttpChecksumResolver {
    /// Creates a resolver with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Fetch`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CatalogError::fetch_with_source("failed to create HTTP client", e))?;
        Ok(Self { client })
    }

    async fn fetch(&self, url: &str) -> Result<String, String> {
        let parsed = reqwest::Url::parse(url).map_err(|e| format!("malformed URL: {e}"))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        response
            .text()
            .await
            .map_err(|e| format!("unreadable body: {e}"))
    }
}

#[async_trait]
impl ChecksumResolver for HttpChecksumResolver {
    async fn resolve(&self, url: &str) -> String {
        match self.fetch(url).await {
            Ok(body) => {
                debug!(url, "resolved checksum document");
                body
            }
            Err(reason) => {
                warn!(url, %reason, "checksum unavailable, artifact will fail verification");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn resolve_returns_raw_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/jdk-21_linux-x64_bin.tar.gz.sha256")
            .with_status(200)
            .with_body("7f3d0e8a\n")
            .create_async()
            .await;

        let resolver = HttpChecksumResolver::new().expect("client");
        let digest = resolver
            .resolve(&format!(
                "{}/jdk-21_linux-x64_bin.tar.gz.sha256",
                server.url()
            ))
            .await;

        mock.assert_async().await;
        assert_eq!(digest, "7f3d0e8a\n");
    }

    #[tokio::test]
    async fn resolve_degrades_to_empty_on_http_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/missing.sha256")
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let resolver = HttpChecksumResolver::new().expect("client");
        let digest = resolver
            .resolve(&format!("{}/missing.sha256", server.url()))
            .await;

        mock.assert_async().await;
        assert_eq!(digest, "");
    }

    #[tokio::test]
    async fn resolve_degrades_to_empty_on_malformed_url() {
        let resolver = HttpChecksumResolver::new().expect("client");
        assert_eq!(resolver.resolve("").await, "");
        assert_eq!(resolver.resolve("::not a url::").await, "");
    }

    #[tokio::test]
    async fn resolve_degrades_to_empty_on_unreachable_host() {
        let resolver = HttpChecksumResolver::new().expect("client");
        assert_eq!(resolver.resolve("http://127.0.0.1:1/x.sha256").await, "");
    }
}
