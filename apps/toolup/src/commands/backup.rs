//! Backup command for the toolup CLI.
//!
//! Mirrors the local backup directory against the WebDAV store configured
//! under `[backup]` in `config.toml`.
//!
//! ## Usage
//!
//! ```bash
//! toolup backup pull    # Copy remote files into the local directory
//! toolup backup push    # Upload local files to the remote directory
//! toolup backup path    # Print the configuration file location
//! toolup backup config --username alice --password secret
//! toolup backup config  # Prompt for URL, user name and password
//! toolup backup reset   # Restore the default [backup] settings
//! ```

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use reqwest::Url;
use toolup_catalog::HttpRetriever;

use super::load_environment;
use crate::backup::sync::{BackupSync, SyncReport};
use crate::backup::webdav::WebDavStore;
use crate::config::{BackupConfig, Config};
use crate::errors::ToolupError;
use crate::paths::ToolupPaths;

/// Arguments for the backup command.
#[derive(Args)]
pub struct BackupArgs {
    /// The backup action to perform.
    #[command(subcommand)]
    pub action: BackupAction,
}

/// Backup actions.
#[derive(Subcommand)]
pub enum BackupAction {
    /// Copy remote files into the local backup directory.
    Pull,
    /// Upload local backup files to the remote directory.
    Push,
    /// Print the configuration file location.
    Path,
    /// Set the WebDAV endpoint and credentials.
    ///
    /// Without any option, asks for the URL, user name and password on
    /// standard input. Blank answers keep the current value.
    Config(ConfigArgs),
    /// Restore the default backup settings, clearing the credentials.
    Reset,
}

/// Values written by `toolup backup config`; omitted or blank ones are kept.
#[derive(Args, Default)]
pub struct ConfigArgs {
    /// WebDAV endpoint URL.
    #[clap(long)]
    pub url: Option<String>,
    /// WebDAV user name.
    #[clap(long, short = 'u')]
    pub username: Option<String>,
    /// WebDAV password.
    #[clap(long, short = 'p')]
    pub password: Option<String>,
    /// Remote directory holding the backup files.
    #[clap(long)]
    pub remote_dir: Option<String>,
    /// Local backup directory.
    #[clap(long)]
    pub local_dir: Option<PathBuf>,
    /// Archive URL used to seed an empty backup directory.
    #[clap(long)]
    pub default_files: Option<String>,
}

impl ConfigArgs {
    fn is_empty(&self) -> bool {
        self.url.is_none()
            && self.username.is_none()
            && self.password.is_none()
            && self.remote_dir.is_none()
            && self.local_dir.is_none()
            && self.default_files.is_none()
    }

    /// Writes the non-blank values over `backup`.
    ///
    /// Nothing is changed if the URL is not an absolute http(s) URL.
    fn apply(&self, backup: &mut BackupConfig) -> Result<()> {
        let url = non_blank(self.url.as_deref());
        if let Some(url) = url {
            let parsed = Url::parse(url).with_context(|| format!("Invalid WebDAV URL: {url}"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                bail!("WebDAV URL must use http or https: {url}");
            }
        }

        if let Some(url) = url {
            backup.url = url.to_string();
        }
        if let Some(username) = non_blank(self.username.as_deref()) {
            backup.username = username.to_string();
        }
        if let Some(password) = non_blank(self.password.as_deref()) {
            backup.password = password.to_string();
        }
        if let Some(remote_dir) = non_blank(self.remote_dir.as_deref()) {
            backup.remote_dir = remote_dir.to_string();
        }
        if let Some(local_dir) = self.local_dir.as_ref().filter(|d| !d.as_os_str().is_empty()) {
            backup.local_dir = Some(local_dir.clone());
        }
        if let Some(default_files) = non_blank(self.default_files.as_deref()) {
            backup.default_files = Some(default_files.to_string());
        }
        Ok(())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Executes the backup command.
///
/// # Errors
///
/// Returns an error if the store is not configured or a transfer fails.
pub async fn execute(args: &BackupArgs) -> Result<()> {
    let (paths, mut config) = load_environment()?;

    match &args.action {
        BackupAction::Path => {
            println!("{}", paths.config_file().display());
            Ok(())
        }
        BackupAction::Pull => {
            let sync = backup_sync(&paths, &config)?;
            let report = sync.pull().await?;
            print_report("Pulled", &sync, &report);
            Ok(())
        }
        BackupAction::Push => {
            let sync = backup_sync(&paths, &config)?;
            let report = sync.push().await?;
            print_report("Pushed", &sync, &report);
            Ok(())
        }
        BackupAction::Config(settings) => {
            let prompted;
            let settings = if settings.is_empty() {
                prompted = prompt_settings(&config.backup)?;
                &prompted
            } else {
                settings
            };
            settings.apply(&mut config.backup)?;
            config.save(&paths.config_file())?;
            println!("Saved backup settings to {}", paths.config_file().display());
            print_settings(&config.backup, &paths);
            Ok(())
        }
        BackupAction::Reset => {
            config.backup = BackupConfig::default();
            config.save(&paths.config_file())?;
            println!(
                "Restored default backup settings in {}",
                paths.config_file().display()
            );
            print_settings(&config.backup, &paths);
            Ok(())
        }
    }
}

/// Asks for the endpoint and credentials on standard input.
fn prompt_settings(current: &BackupConfig) -> Result<ConfigArgs> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let url = prompt(&mut input, &format!("WebDAV URL [{}]: ", current.url))?;
    let username = prompt(&mut input, &format!("WebDAV username [{}]: ", current.username))?;
    let password = prompt(&mut input, "WebDAV password: ")?;
    Ok(ConfigArgs {
        url: Some(url),
        username: Some(username),
        password: Some(password),
        ..ConfigArgs::default()
    })
}

fn prompt(input: &mut impl BufRead, question: &str) -> Result<String> {
    print!("{question}");
    std::io::stdout().flush().context("Failed to write prompt")?;
    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("Failed to read from standard input")?;
    Ok(answer.trim().to_string())
}

fn print_settings(backup: &BackupConfig, paths: &ToolupPaths) {
    let password = if backup.password.is_empty() {
        "(not set)"
    } else {
        "********"
    };
    println!("  url:        {}", backup.url);
    println!("  username:   {}", backup.username);
    println!("  password:   {password}");
    println!("  remote dir: {}", backup.remote_dir);
    println!("  local dir:  {}", backup.local_dir(paths).display());
}

fn backup_sync(paths: &ToolupPaths, config: &Config) -> Result<BackupSync> {
    let backup = &config.backup;
    if !backup.is_configured() {
        return Err(
            ToolupError::backup_not_configured(paths.config_file().display().to_string()).into(),
        );
    }

    let store = WebDavStore::new(&backup.url, &backup.username, &backup.password)
        .context("Failed to set up the WebDAV store")?;
    Ok(BackupSync::new(
        Box::new(store),
        Box::new(HttpRetriever::new()),
        backup.remote_dir.clone(),
        backup.local_dir(paths),
        paths.seed_archive(),
    )
    .with_default_files(backup.default_files().map(str::to_string)))
}

fn print_report(verb: &str, sync: &BackupSync, report: &SyncReport) {
    if report.remote_created {
        println!("Created remote directory {}", sync.remote_dir());
    }
    if report.seeded {
        println!("Seeded {} from the default files", sync.local_dir().display());
    }
    if report.transferred.is_empty() {
        if !report.seeded {
            println!("Nothing to transfer.");
        }
        return;
    }
    for name in &report.transferred {
        println!("  {name}");
    }
    println!(
        "{verb} {} file(s) between {} and {}",
        report.transferred.len(),
        sync.local_dir().display(),
        sync.remote_dir()
    );
}
