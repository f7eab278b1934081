//! Pull and push of a local backup directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use toolup_catalog::{Retriever, WriteMode};
use tracing::{debug, info, warn};

use super::{RemoteEntry, RemoteStore, remote_path};
use crate::archive::extract_archive;
use crate::paths::is_empty_dir;

/// Transfer timeout for the seed archive.
const SEED_TIMEOUT: Duration = Duration::from_secs(60);

/// Outcome of a pull or push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Names of the files copied, in transfer order.
    pub transferred: Vec<String>,
    /// The remote directory did not exist and was created.
    pub remote_created: bool,
    /// The local directory was populated from the seed archive.
    pub seeded: bool,
}

/// Mirrors one local directory against one remote directory.
pub struct BackupSync {
    store: Box<dyn RemoteStore>,
    retriever: Box<dyn Retriever>,
    remote_dir: String,
    local_dir: PathBuf,
    default_files: Option<String>,
    seed_archive: PathBuf,
}

impl BackupSync {
    #[must_use]
    pub fn new(
        store: Box<dyn RemoteStore>,
        retriever: Box<dyn Retriever>,
        remote_dir: impl Into<String>,
        local_dir: PathBuf,
        seed_archive: PathBuf,
    ) -> Self {
        Self {
            store,
            retriever,
            remote_dir: remote_dir.into(),
            local_dir,
            default_files: None,
            seed_archive,
        }
    }

    /// Sets the archive URL used to seed an empty local directory.
    #[must_use]
    pub fn with_default_files(mut self, url: Option<String>) -> Self {
        self.default_files = url;
        self
    }

    #[must_use]
    pub fn local_dir(&self) -> &Path {
        &self.local_dir
    }

    #[must_use]
    pub fn remote_dir(&self) -> &str {
        &self.remote_dir
    }

    /// Copies every remote file into the local directory.
    ///
    /// A missing remote directory is created. When the remote side holds no
    /// files, the local directory is seeded from the default archive if one
    /// is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if listing, reading or writing fails.
    pub async fn pull(&self) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let files = self
            .list_remote(&mut report)
            .await?
            .into_iter()
            .filter(|entry| !entry.is_dir)
            .collect::<Vec<_>>();

        if files.is_empty() {
            if self.default_files.is_some() {
                report.seeded = self.seed().await?;
            }
            return Ok(report);
        }

        tokio::fs::create_dir_all(&self.local_dir)
            .await
            .with_context(|| format!("Failed to create directory: {}", self.local_dir.display()))?;

        for entry in files {
            let source = remote_path(&self.remote_dir, &entry.name);
            let bytes = self
                .store
                .read(&source)
                .await
                .with_context(|| format!("Failed to download {source}"))?;
            let target = self.local_dir.join(&entry.name);
            tokio::fs::write(&target, bytes)
                .await
                .with_context(|| format!("Failed to write file: {}", target.display()))?;
            debug!(file = %entry.name, "pulled");
            report.transferred.push(entry.name);
        }

        info!(count = report.transferred.len(), "pull complete");
        Ok(report)
    }

    /// Uploads every local file to the remote directory.
    ///
    /// A missing remote directory is created. An empty local directory is
    /// seeded from the default archive instead, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if listing, reading or uploading fails.
    pub async fn push(&self) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        self.list_remote(&mut report).await?;

        if is_empty_dir(&self.local_dir) {
            if self.default_files.is_some() {
                report.seeded = self.seed().await?;
            }
            return Ok(report);
        }

        for (name, path) in self.local_files().await? {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read file: {}", path.display()))?;
            let target = remote_path(&self.remote_dir, &name);
            self.store
                .write(&target, bytes)
                .await
                .with_context(|| format!("Failed to upload {target}"))?;
            debug!(file = %name, "pushed");
            report.transferred.push(name);
        }

        info!(count = report.transferred.len(), "push complete");
        Ok(report)
    }

    /// Populates an empty local directory from the default archive.
    ///
    /// Returns `true` if the archive was extracted. The downloaded archive is
    /// removed in every case.
    ///
    /// # Errors
    ///
    /// Returns an error if the local directory cannot be created or the
    /// archive cannot be extracted.
    pub async fn seed(&self) -> Result<bool> {
        let Some(url) = self.default_files.as_deref() else {
            return Ok(false);
        };

        let outcome = self.fetch_and_unpack(url).await;
        if self.seed_archive.exists()
            && let Err(e) = tokio::fs::remove_file(&self.seed_archive).await
        {
            warn!(path = %self.seed_archive.display(), error = %e, "failed to remove seed archive");
        }
        outcome
    }

    async fn fetch_and_unpack(&self, url: &str) -> Result<bool> {
        let bytes = self
            .retriever
            .get(url, &self.seed_archive, WriteMode::Truncate, SEED_TIMEOUT)
            .await;
        if bytes == 0 {
            warn!(url, "seed archive could not be downloaded");
            return Ok(false);
        }
        if !is_empty_dir(&self.local_dir) {
            warn!(dir = %self.local_dir.display(), "backup directory is not empty, seed skipped");
            return Ok(false);
        }

        tokio::fs::create_dir_all(&self.local_dir)
            .await
            .with_context(|| format!("Failed to create directory: {}", self.local_dir.display()))?;
        extract_archive(&self.seed_archive, &self.local_dir)
            .with_context(|| format!("Failed to extract seed archive from {url}"))?;
        info!(url, dir = %self.local_dir.display(), "seeded backup directory");
        Ok(true)
    }

    /// Lists the remote directory, creating it if it is missing.
    async fn list_remote(&self, report: &mut SyncReport) -> Result<Vec<RemoteEntry>> {
        match self.store.list(&self.remote_dir).await {
            Ok(entries) => Ok(entries),
            Err(e) if e.is_not_found() => {
                self.store
                    .mkdir_all(&self.remote_dir)
                    .await
                    .with_context(|| format!("Failed to create {}", self.remote_dir))?;
                info!(dir = %self.remote_dir, "created remote backup directory");
                report.remote_created = true;
                Ok(Vec::new())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to list {}", self.remote_dir)),
        }
    }

    /// Regular files directly inside the local directory, sorted by name.
    async fn local_files(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut entries = tokio::fs::read_dir(&self.local_dir)
            .await
            .with_context(|| format!("Failed to read directory: {}", self.local_dir.display()))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let file_type = entry
                .file_type()
                .await
                .context("Failed to read file type")?;
            if !file_type.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                files.push((name.to_string(), entry.path()));
            }
        }
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::write_zip;
    use crate::backup::StoreError;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    /// In-memory store holding a single remote directory.
    #[derive(Default)]
    struct MemoryStore {
        state: Arc<Mutex<MemoryState>>,
        fail_listing: bool,
    }

    #[derive(Default)]
    struct MemoryState {
        exists: bool,
        files: BTreeMap<String, Vec<u8>>,
        subdirs: Vec<String>,
        mkdirs: Vec<String>,
    }

    #[async_trait]
    impl RemoteStore for MemoryStore {
        async fn list(&self, dir: &str) -> Result<Vec<RemoteEntry>, StoreError> {
            if self.fail_listing {
                return Err(StoreError::status("PROPFIND", dir, 401));
            }
            let state = self.state.lock().unwrap();
            if !state.exists {
                return Err(StoreError::not_found(dir));
            }
            let mut entries = state
                .files
                .keys()
                .map(|path| RemoteEntry::file(path.rsplit('/').next().unwrap()))
                .collect::<Vec<_>>();
            entries.extend(state.subdirs.iter().map(RemoteEntry::dir));
            Ok(entries)
        }

        async fn mkdir_all(&self, dir: &str) -> Result<(), StoreError> {
            let mut state = self.state.lock().unwrap();
            state.exists = true;
            state.mkdirs.push(dir.to_string());
            Ok(())
        }

        async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
            self.state
                .lock()
                .unwrap()
                .files
                .get(path)
                .cloned()
                .ok_or_else(|| StoreError::not_found(path))
        }

        async fn write(&self, path: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
            self.state
                .lock()
                .unwrap()
                .files
                .insert(path.to_string(), bytes);
            Ok(())
        }
    }

    /// Serves a zip archive of `entries`, or nothing when `entries` is empty.
    struct ZipRetriever {
        entries: Vec<(&'static str, &'static [u8])>,
    }

    #[async_trait]
    impl Retriever for ZipRetriever {
        async fn get(&self, _url: &str, dest: &Path, _mode: WriteMode, timeout: Duration) -> u64 {
            assert_eq!(timeout, SEED_TIMEOUT);
            if self.entries.is_empty() {
                return 0;
            }
            write_zip(dest, &self.entries);
            std::fs::metadata(dest).map(|m| m.len()).unwrap_or(0)
        }
    }

    fn no_seed() -> Box<ZipRetriever> {
        Box::new(ZipRetriever {
            entries: Vec::new(),
        })
    }

    fn seed_with_bashrc() -> Box<ZipRetriever> {
        Box::new(ZipRetriever {
            entries: vec![("dotfiles/bashrc", &b"alias ll='ls -l'\n"[..])],
        })
    }

    fn sync(store: MemoryStore, retriever: Box<ZipRetriever>, temp: &TempDir) -> BackupSync {
        BackupSync::new(
            Box::new(store),
            retriever,
            "/toolup_backups",
            temp.path().join("backups"),
            temp.path().join("seed.zip"),
        )
    }

    fn existing_store(files: &[(&str, &[u8])]) -> (MemoryStore, Arc<Mutex<MemoryState>>) {
        let state = Arc::new(Mutex::new(MemoryState {
            exists: true,
            files: files
                .iter()
                .map(|(name, bytes)| (format!("/toolup_backups/{name}"), bytes.to_vec()))
                .collect(),
            ..MemoryState::default()
        }));
        let store = MemoryStore {
            state: Arc::clone(&state),
            fail_listing: false,
        };
        (store, state)
    }

    #[tokio::test]
    async fn pull_copies_remote_files_and_skips_directories() {
        let temp = TempDir::new().expect("temp dir");
        let (store, state) = existing_store(&[("bashrc", b"export A=1\n"), ("vimrc", b"set nu\n")]);
        state.lock().unwrap().subdirs.push("archive".to_string());

        let report = sync(store, no_seed(), &temp).pull().await.expect("pull");

        assert_eq!(report.transferred, vec!["bashrc", "vimrc"]);
        assert!(!report.remote_created);
        assert!(!report.seeded);
        temp.child("backups/bashrc").assert("export A=1\n");
        temp.child("backups/vimrc").assert("set nu\n");
        temp.child("backups/archive").assert(predicates::path::missing());
    }

    #[tokio::test]
    async fn pull_creates_missing_remote_directory() {
        let temp = TempDir::new().expect("temp dir");
        let store = MemoryStore::default();
        let state = Arc::clone(&store.state);

        let report = sync(store, no_seed(), &temp).pull().await.expect("pull");

        assert!(report.remote_created);
        assert!(report.transferred.is_empty());
        assert_eq!(state.lock().unwrap().mkdirs, vec!["/toolup_backups"]);
    }

    #[tokio::test]
    async fn pull_seeds_when_remote_is_empty() {
        let temp = TempDir::new().expect("temp dir");
        let (store, _) = existing_store(&[]);

        let report = sync(store, seed_with_bashrc(), &temp)
            .with_default_files(Some("https://example.com/seed.zip".to_string()))
            .pull()
            .await
            .expect("pull");

        assert!(report.seeded);
        temp.child("backups/bashrc").assert("alias ll='ls -l'\n");
        temp.child("seed.zip").assert(predicates::path::missing());
    }

    #[tokio::test]
    async fn pull_propagates_listing_errors() {
        let temp = TempDir::new().expect("temp dir");
        let store = MemoryStore {
            fail_listing: true,
            ..MemoryStore::default()
        };

        let err = sync(store, no_seed(), &temp).pull().await.expect_err("denied");
        assert!(err.to_string().contains("Failed to list /toolup_backups"));
    }

    #[tokio::test]
    async fn push_uploads_local_files() {
        let temp = TempDir::new().expect("temp dir");
        temp.child("backups/bashrc").write_str("export B=2\n").expect("write");
        temp.child("backups/nested").create_dir_all().expect("mkdir");
        let (store, state) = existing_store(&[]);

        let report = sync(store, no_seed(), &temp).push().await.expect("push");

        assert_eq!(report.transferred, vec!["bashrc"]);
        let state = state.lock().unwrap();
        assert_eq!(
            state.files.get("/toolup_backups/bashrc").map(Vec::as_slice),
            Some(&b"export B=2\n"[..])
        );
        assert_eq!(state.files.len(), 1);
    }

    #[tokio::test]
    async fn push_creates_remote_directory_then_uploads() {
        let temp = TempDir::new().expect("temp dir");
        temp.child("backups/vimrc").write_str("set nu\n").expect("write");
        let store = MemoryStore::default();
        let state = Arc::clone(&store.state);

        let report = sync(store, no_seed(), &temp).push().await.expect("push");

        assert!(report.remote_created);
        assert_eq!(report.transferred, vec!["vimrc"]);
        assert!(state.lock().unwrap().files.contains_key("/toolup_backups/vimrc"));
    }

    #[tokio::test]
    async fn push_with_empty_local_directory_seeds_instead() {
        let temp = TempDir::new().expect("temp dir");
        let (store, state) = existing_store(&[]);

        let report = sync(store, seed_with_bashrc(), &temp)
            .with_default_files(Some("https://example.com/seed.zip".to_string()))
            .push()
            .await
            .expect("push");

        assert!(report.seeded);
        assert!(report.transferred.is_empty());
        assert!(state.lock().unwrap().files.is_empty());
        temp.child("backups/bashrc").assert(predicates::path::exists());
    }

    #[tokio::test]
    async fn seed_skips_non_empty_directory_and_removes_archive() {
        let temp = TempDir::new().expect("temp dir");
        temp.child("backups/keep").write_str("mine").expect("write");
        let (store, _) = existing_store(&[]);

        let seeded = sync(store, seed_with_bashrc(), &temp)
            .with_default_files(Some("https://example.com/seed.zip".to_string()))
            .seed()
            .await
            .expect("seed");

        assert!(!seeded);
        temp.child("backups/bashrc").assert(predicates::path::missing());
        temp.child("seed.zip").assert(predicates::path::missing());
    }

    #[tokio::test]
    async fn seed_without_download_reports_false() {
        let temp = TempDir::new().expect("temp dir");
        let (store, _) = existing_store(&[]);

        let seeded = sync(store, no_seed(), &temp)
            .with_default_files(Some("https://example.com/seed.zip".to_string()))
            .seed()
            .await
            .expect("seed");

        assert!(!seeded);
        temp.child("backups").assert(predicates::path::missing());
    }

    #[tokio::test]
    async fn seed_outcome_survives_failed_archive_cleanup() {
        let temp = TempDir::new().expect("temp dir");
        temp.child("seed.zip").create_dir_all().expect("mkdir");
        let (store, _) = existing_store(&[]);

        let seeded = sync(store, no_seed(), &temp)
            .with_default_files(Some("https://example.com/seed.zip".to_string()))
            .seed()
            .await
            .expect("seed");

        assert!(!seeded);
        temp.child("seed.zip").assert(predicates::path::is_dir());
    }
}
