//! Archive extraction for JDK installs and backup seeds.
//!
//! JDK archives wrap everything in a single top-level folder
//! (`jdk-21.0.2/bin/java`); that folder is stripped so an installation
//! directory holds `bin/`, `lib/` and friends directly. Entries that would
//! escape the destination are rejected.

use std::fs::File;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use flate2::read::GzDecoder;
use tar::Archive;
use tracing::debug;

/// Archive formats understood by [`extract_archive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Gzip-compressed tarball (`.tar.gz`, `.tgz`).
    TarGz,
    /// ZIP archive.
    Zip,
}

impl ArchiveFormat {
    /// Detects the format from the file name, falling back to the magic bytes.
    #[must_use]
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            return Some(Self::TarGz);
        }
        if name.ends_with(".zip") {
            return Some(Self::Zip);
        }

        let mut magic = [0u8; 4];
        let read = File::open(path)
            .and_then(|mut f| std::io::Read::read(&mut f, &mut magic))
            .ok()?;
        match &magic[..read] {
            [0x1f, 0x8b, ..] => Some(Self::TarGz),
            [b'P', b'K', 0x03, 0x04] => Some(Self::Zip),
            _ => None,
        }
    }
}

/// Extracts a ZIP or tar.gz archive into `dest_dir`, creating it if needed.
///
/// # Errors
///
/// Returns an error if the format is unknown, the archive is unreadable, an
/// entry path is unsafe or a file cannot be written.
pub fn extract_archive(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    match ArchiveFormat::detect(archive_path) {
        Some(ArchiveFormat::TarGz) => extract_tar_gz(archive_path, dest_dir),
        Some(ArchiveFormat::Zip) => extract_zip(archive_path, dest_dir),
        None => bail!("Unsupported archive format: {}", archive_path.display()),
    }
}

/// Extracts `archive_path` into `target` through a sibling staging directory.
///
/// The staging directory (`.<name>.staging` next to `target`) is renamed onto
/// `target` only after a complete extraction, so a failure leaves `target`
/// untouched.
///
/// # Errors
///
/// Returns an error if `target` already exists, or if extraction or the
/// final rename fails. The staging directory is removed on failure.
pub fn install_staged(archive_path: &Path, target: &Path) -> Result<()> {
    if target.exists() {
        bail!("Destination already exists: {}", target.display());
    }
    let staging = staging_dir(target)?;
    if staging.exists() {
        std::fs::remove_dir_all(&staging).with_context(|| {
            format!("Failed to clear staging directory: {}", staging.display())
        })?;
    }

    let result = extract_archive(archive_path, &staging).and_then(|()| {
        std::fs::rename(&staging, target).with_context(|| {
            format!(
                "Failed to move {} to {}",
                staging.display(),
                target.display()
            )
        })
    });

    if result.is_err() {
        std::fs::remove_dir_all(&staging).ok();
    }
    result
}

fn staging_dir(target: &Path) -> Result<PathBuf> {
    let name = target
        .file_name()
        .with_context(|| format!("Invalid install directory: {}", target.display()))?;
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    Ok(parent.join(format!(".{}.staging", name.to_string_lossy())))
}

/// Extracts a tar.gz archive into `dest_dir`.
///
/// # Errors
///
/// See [`extract_archive`].
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let names = {
        let mut archive = open_tar(archive_path)?;
        let mut names = Vec::new();
        for entry in archive
            .entries()
            .with_context(|| format!("Failed to read tar entries: {}", archive_path.display()))?
        {
            let entry = entry
                .with_context(|| format!("Failed to read tar entry: {}", archive_path.display()))?;
            names.push(entry.path().context("Failed to get entry path")?.into_owned());
        }
        names
    };
    let strip = common_root(&names);

    std::fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    let mut archive = open_tar(archive_path)?;
    for entry in archive
        .entries()
        .with_context(|| format!("Failed to read tar entries: {}", archive_path.display()))?
    {
        let mut entry = entry
            .with_context(|| format!("Failed to read tar entry: {}", archive_path.display()))?;
        let entry_path = entry.path().context("Failed to get entry path")?.into_owned();
        let Some(relative) = relative_path(&entry_path, strip.as_deref())? else {
            continue;
        };
        let output_path = dest_dir.join(relative);

        if entry.header().entry_type().is_dir() {
            std::fs::create_dir_all(&output_path).with_context(|| {
                format!("Failed to create directory: {}", output_path.display())
            })?;
        } else {
            create_parent(&output_path)?;
            entry
                .unpack(&output_path)
                .with_context(|| format!("Failed to extract: {}", output_path.display()))?;
        }
    }

    debug!(archive = %archive_path.display(), dest = %dest_dir.display(), "extracted tar.gz");
    Ok(())
}

/// Extracts a ZIP archive into `dest_dir`.
///
/// # Errors
///
/// See [`extract_archive`].
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("Failed to read ZIP archive: {}", archive_path.display()))?;

    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read archive entry {i}"))?;
        let name = entry
            .enclosed_name()
            .with_context(|| format!("Refusing to extract unsafe path: {}", entry.name()))?;
        names.push(name);
    }
    let strip = common_root(&names);

    std::fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    for (i, name) in names.iter().enumerate() {
        let Some(relative) = relative_path(name, strip.as_deref())? else {
            continue;
        };
        let output_path = dest_dir.join(relative);
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read archive entry {i}"))?;

        if entry.is_dir() {
            std::fs::create_dir_all(&output_path).with_context(|| {
                format!("Failed to create directory: {}", output_path.display())
            })?;
        } else {
            create_parent(&output_path)?;
            let mut outfile = File::create(&output_path)
                .with_context(|| format!("Failed to create file: {}", output_path.display()))?;
            std::io::copy(&mut entry, &mut outfile)
                .with_context(|| format!("Failed to extract: {}", output_path.display()))?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    std::fs::set_permissions(&output_path, std::fs::Permissions::from_mode(mode))
                        .with_context(|| {
                            format!("Failed to set permissions: {}", output_path.display())
                        })?;
                }
            }
        }
    }

    debug!(archive = %archive_path.display(), dest = %dest_dir.display(), "extracted zip");
    Ok(())
}

fn open_tar(archive_path: &Path) -> Result<Archive<GzDecoder<File>>> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    Ok(Archive::new(GzDecoder::new(file)))
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Returns the single top-level folder shared by every entry, if there is one
/// and at least one entry is nested below it.
fn common_root(names: &[PathBuf]) -> Option<PathBuf> {
    let mut root: Option<&std::ffi::OsStr> = None;
    let mut nested = false;
    for name in names {
        let mut components = name.components().filter(|c| !matches!(c, Component::CurDir));
        let first = components.next()?;
        if components.next().is_some() {
            nested = true;
        }
        match root {
            None => root = Some(first.as_os_str()),
            Some(existing) if existing != first.as_os_str() => return None,
            Some(_) => {}
        }
    }
    if nested { root.map(PathBuf::from) } else { None }
}

/// Maps an archive entry to its path below the destination.
///
/// Returns `Ok(None)` for the stripped root folder itself.
fn relative_path(entry_path: &Path, strip: Option<&Path>) -> Result<Option<PathBuf>> {
    if entry_path.is_absolute()
        || entry_path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_) | Component::RootDir))
    {
        bail!(
            "Refusing to extract path with parent directory or absolute reference: {}",
            entry_path.display()
        );
    }

    let cleaned: PathBuf = entry_path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    let relative = match strip {
        Some(prefix) => cleaned.strip_prefix(prefix).map_or(cleaned.clone(), Path::to_path_buf),
        None => cleaned,
    };
    Ok((!relative.as_os_str().is_empty()).then_some(relative))
}
