//! Byte transfer to local disk.
//!
//! [`Retriever`] is the seam between the acquisition pipeline and the
//! network. It never returns an error: every failure (connection, HTTP
//! status, disk) is logged and reported as zero bytes written, and any file
//! it created is removed again.
//!
//! [`HttpRetriever`] streams the response body with `reqwest` and can print
//! a single-line progress indicator to stderr. It does not retry or resume.

use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::checksum::USER_AGENT;

/// How the destination file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Create the file, or truncate it if it already exists.
    #[default]
    Truncate,
    /// Create the file, or append to it if it already exists.
    Append,
}

/// Fetches a URL into a local file.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Downloads `url` into `dest` and returns the number of bytes written.
    ///
    /// Returns 0 on any failure.
    async fn get(&self, url: &str, dest: &Path, mode: WriteMode, timeout: Duration) -> u64;
}

/// Minimum interval between progress updates in milliseconds.
const PROGRESS_INTERVAL_MS: u128 = 250;

/// [`Retriever`] over HTTP(S).
#[derive(Debug, Clone, Default)]
pub struct HttpRetriever {
    show_progress: bool,
}

impl HttpRetriever {
    /// Creates a retriever that transfers silently.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the progress line on stderr.
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    async fn transfer(
        &self,
        url: &str,
        dest: &Path,
        mode: WriteMode,
        timeout: Duration,
    ) -> Result<u64, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| format!("failed to create HTTP client: {e}"))?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("failed to connect: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("HTTP error {}", response.status()));
        }

        let total_size = response.content_length().unwrap_or(0);

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.create(true);
        match mode {
            WriteMode::Truncate => options.write(true).truncate(true),
            WriteMode::Append => options.append(true),
        };
        let mut file = options
            .open(dest)
            .await
            .map_err(|e| format!("failed to open {}: {e}", dest.display()))?;

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        let start_time = Instant::now();
        let mut last_update = Instant::now();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| format!("failed to read body: {e}"))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| format!("failed to write {}: {e}", dest.display()))?;
            downloaded += chunk.len() as u64;

            if self.show_progress
                && last_update.elapsed().as_millis() >= PROGRESS_INTERVAL_MS
            {
                print_progress(downloaded, total_size, start_time.elapsed().as_secs_f64());
                last_update = Instant::now();
            }
        }

        file.flush()
            .await
            .map_err(|e| format!("failed to flush {}: {e}", dest.display()))?;

        if self.show_progress {
            print_progress(downloaded, total_size, start_time.elapsed().as_secs_f64());
            eprintln!();
        }

        Ok(downloaded)
    }
}

#[async_trait]
impl Retriever for HttpRetriever {
    async fn get(&self, url: &str, dest: &Path, mode: WriteMode, timeout: Duration) -> u64 {
        let existed = dest.exists();
        match self.transfer(url, dest, mode, timeout).await {
            Ok(0) => {
                warn!(url, "server returned an empty body");
                remove_created(dest, existed, mode).await;
                0
            }
            Ok(bytes) => {
                debug!(url, bytes, dest = %dest.display(), "transfer complete");
                bytes
            }
            Err(reason) => {
                warn!(url, %reason, "transfer failed");
                remove_created(dest, existed, mode).await;
                0
            }
        }
    }
}

/// Removes what a failed transfer left behind.
///
/// A file opened for appending that existed before keeps its earlier content
/// on disk; anything else written by the failed transfer is removed.
async fn remove_created(dest: &Path, existed: bool, mode: WriteMode) {
    if existed && mode == WriteMode::Append {
        return;
    }
    if dest.exists()
        && let Err(e) = tokio::fs::remove_file(dest).await
    {
        warn!(path = %dest.display(), error = %e, "failed to remove incomplete download");
    }
}

/// Prints a simple text-based progress line to stderr.
#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
fn print_progress(downloaded: u64, total: u64, elapsed_secs: f64) {
    let percent = if total > 0 {
        (downloaded as f64 / total as f64 * 100.0) as u8
    } else {
        0
    };
    let speed = if elapsed_secs > 0.0 {
        downloaded as f64 / elapsed_secs
    } else {
        0.0
    };

    eprint!(
        "\r{}/{} ({percent}%) {}     ",
        format_bytes(downloaded),
        format_bytes(total),
        format_speed(speed)
    );
    let _ = std::io::stderr().flush();
}

/// Formats bytes into a human-readable string (KB, MB, GB).
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    #[allow(clippy::cast_precision_loss)]
    let bytes_f = bytes as f64;

    if bytes_f >= GB {
        format!("{:.2} GB", bytes_f / GB)
    } else if bytes_f >= MB {
        format!("{:.2} MB", bytes_f / MB)
    } else if bytes_f >= KB {
        format!("{:.2} KB", bytes_f / KB)
    } else {
        format!("{bytes} B")
    }
}

/// Formats speed (bytes/sec) into a human-readable string.
fn format_speed(speed: f64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    if speed >= MB {
        format!("{:.2} MB/s", speed / MB)
    } else if speed >= KB {
        format!("{:.2} KB/s", speed / KB)
    } else {
        format!("{speed:.0} B/s")
    }
}
