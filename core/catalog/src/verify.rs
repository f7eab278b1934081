//! SHA-256 verification of downloaded artifacts.
//!
//! Checksum documents on the listing are not uniform: some hold just the hex
//! digest, some append the file name (`<hex>  <file>`), and most end with a
//! newline. [`digest_matches`] compares only the first token, ignoring case.

use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::errors::CatalogError;

/// Computes the SHA-256 hash of a file as a lowercase hex string.
///
/// The file is streamed in 8 KiB blocks, so archives of any size are fine.
///
/// # Errors
///
/// Returns [`CatalogError::Io`] if the file cannot be opened or read.
pub fn compute_sha256(file_path: &Path) -> Result<String, CatalogError> {
    let mut file = std::fs::File::open(file_path)
        .map_err(|e| CatalogError::io("failed to open file for checksum", file_path, e))?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| CatalogError::io("failed to read file for checksum", file_path, e))?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Returns the digest token of a checksum document: its first
/// whitespace-separated word.
#[must_use]
pub fn digest_token(document: &str) -> &str {
    document.split_whitespace().next().unwrap_or("")
}

/// Compares a recorded checksum document against a computed hex digest.
///
/// Case-insensitive. An empty recorded digest never matches.
#[must_use]
pub fn digest_matches(expected: &str, actual: &str) -> bool {
    let expected = digest_token(expected);
    !expected.is_empty() && expected.eq_ignore_ascii_case(actual.trim())
}
