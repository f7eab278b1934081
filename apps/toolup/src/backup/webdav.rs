//! [`RemoteStore`] over WebDAV.
//!
//! Uses `PROPFIND` with `Depth: 1` to list a collection, `MKCOL` to create
//! collections level by level, and plain `GET`/`PUT` for file content. All
//! requests carry HTTP basic credentials.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use regex::Regex;
use reqwest::{Method, StatusCode, Url};
use tracing::debug;

use super::{RemoteEntry, RemoteStore, StoreError};

/// Request timeout for WebDAV calls.
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Characters left unescaped in a path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:">
  <d:prop><d:resourcetype/></d:prop>
</d:propfind>"#;

/// WebDAV client bound to one endpoint and account.
#[derive(Clone)]
pub struct WebDavStore {
    client: reqwest::Client,
    base: Url,
    username: String,
    password: String,
}

impl WebDavStore {
    /// Creates a client for the endpoint at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL is not an absolute http(s)
    /// URL or the HTTP client cannot be built.
    pub fn new(
        url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let mut base = Url::parse(url.trim())
            .map_err(|e| StoreError::config(format!("WebDAV URL `{url}` is malformed: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(StoreError::config(format!(
                "WebDAV URL `{url}` must use http or https"
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("toolup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base,
            username: username.into(),
            password: password.into(),
        })
    }

    /// Resolves a store path against the endpoint.
    fn url_for(&self, path: &str, collection: bool) -> Result<Url, StoreError> {
        let mut relative = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/");
        if collection && !relative.is_empty() {
            relative.push('/');
        }
        self.base
            .join(&relative)
            .map_err(|e| StoreError::config(format!("cannot address `{path}`: {e}")))
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<reqwest::Response, StoreError> {
        builder
            .send()
            .await
            .map_err(|e| StoreError::transport(path, e))
    }
}

fn dav_method(name: &'static str) -> Result<Method, StoreError> {
    Method::from_bytes(name.as_bytes())
        .map_err(|e| StoreError::config(format!("invalid HTTP method {name}: {e}")))
}

#[async_trait]
impl RemoteStore for WebDavStore {
    async fn list(&self, dir: &str) -> Result<Vec<RemoteEntry>, StoreError> {
        let url = self.url_for(dir, true)?;
        let request_path = url.path().to_string();
        debug!(%url, "listing remote collection");

        let response = self
            .send(
                self.request(dav_method("PROPFIND")?, url)
                    .header("Depth", "1")
                    .header("Content-Type", "application/xml; charset=utf-8")
                    .body(PROPFIND_BODY),
                dir,
            )
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StoreError::not_found(dir)),
            StatusCode::MULTI_STATUS | StatusCode::OK => {
                let body = response
                    .text()
                    .await
                    .map_err(|e| StoreError::transport(dir, e))?;
                Ok(parse_multistatus(&body, &request_path))
            }
            status => Err(StoreError::status("PROPFIND", dir, status.as_u16())),
        }
    }

    async fn mkdir_all(&self, dir: &str) -> Result<(), StoreError> {
        let mut current = String::new();
        for segment in dir.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(segment);

            let url = self.url_for(&current, true)?;
            let response = self
                .send(self.request(dav_method("MKCOL")?, url), &current)
                .await?;
            match response.status() {
                // 405: the collection already exists
                StatusCode::CREATED | StatusCode::OK | StatusCode::METHOD_NOT_ALLOWED => {
                    debug!(path = %current, status = %response.status(), "collection ready");
                }
                status => return Err(StoreError::status("MKCOL", &current, status.as_u16())),
            }
        }
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let url = self.url_for(path, false)?;
        let response = self.send(self.request(Method::GET, url), path).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(StoreError::not_found(path)),
            status if status.is_success() => response
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| StoreError::transport(path, e)),
            status => Err(StoreError::status("GET", path, status.as_u16())),
        }
    }

    async fn write(&self, path: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let url = self.url_for(path, false)?;
        let response = self
            .send(self.request(Method::PUT, url).body(bytes), path)
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(StoreError::status("PUT", path, status.as_u16()))
        }
    }
}

fn response_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)<(?:[a-z0-9]+:)?response\b[^>]*>(.*?)</(?:[a-z0-9]+:)?response\s*>")
            .expect("valid regex")
    })
}

fn href_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)<(?:[a-z0-9]+:)?href\b[^>]*>\s*(.*?)\s*</(?:[a-z0-9]+:)?href\s*>")
            .expect("valid regex")
    })
}

fn collection_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)<(?:[a-z0-9]+:)?collection\b").expect("valid regex")
    })
}

/// Extracts the children of `request_path` from a `207 Multi-Status` body.
///
/// The entry describing the collection itself is dropped.
fn parse_multistatus(body: &str, request_path: &str) -> Vec<RemoteEntry> {
    let own_path = decode(request_path);
    let own_path = own_path.trim_matches('/');

    response_pattern()
        .captures_iter(body)
        .filter_map(|response| {
            let block = response.get(1)?.as_str();
            let href = href_pattern().captures(block)?.get(1)?.as_str();
            let path = href_path(&unescape_xml(href));
            let path = path.trim_matches('/');
            if path == own_path {
                return None;
            }
            let name = path.rsplit('/').next().filter(|n| !n.is_empty())?;
            Some(if collection_pattern().is_match(block) {
                RemoteEntry::dir(name)
            } else {
                RemoteEntry::file(name)
            })
        })
        .collect()
}

/// Returns the decoded path of an href, which may be absolute or a bare path.
fn href_path(href: &str) -> String {
    let raw = Url::parse(href).map_or_else(|_| href.to_string(), |url| url.path().to_string());
    decode(&raw)
}

fn decode(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

fn entity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"&(?:#[xX]([0-9a-fA-F]+)|#([0-9]+)|(lt|gt|quot|apos|amp));")
            .expect("valid regex")
    })
}

/// Decodes the predefined XML entities and numeric character references.
///
/// References to code points that are not valid characters are kept as
/// written.
fn unescape_xml(text: &str) -> String {
    entity_pattern()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let decoded = if let Some(hex) = caps.get(1) {
                u32::from_str_radix(hex.as_str(), 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = caps.get(2) {
                dec.as_str().parse().ok().and_then(char::from_u32)
            } else {
                match caps.get(3).as_ref().map(regex::Match::as_str) {
                    Some("lt") => Some('<'),
                    Some("gt") => Some('>'),
                    Some("quot") => Some('"'),
                    Some("apos") => Some('\''),
                    Some("amp") => Some('&'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}
