#![warn(clippy::pedantic)]

//! # toolup
//!
//! Manages local Java installations and a WebDAV-synced backup directory.
//!
//! ## Subcommands
//!
//! - `versions` - List Java versions published for this platform
//! - `download` - Fetch and verify an archive into the download cache
//! - `install` - Install a Java version
//! - `list` - List installed Java versions
//! - `uninstall` - Remove an installed Java version
//! - `backup` - Pull or push the backup directory, or set its credentials
//!
//! ## Examples
//!
//! ```bash
//! toolup versions
//! toolup install 21
//! toolup backup config --username alice --password secret
//! toolup backup pull
//! ```

mod archive;
mod backup;
mod commands;
mod config;
mod errors;
mod paths;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use commands::{backup as backup_cmd, download, install, list, uninstall, versions};
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter; overrides `--log-level`.
const LOG_ENV: &str = "TOOLUP_LOG";

/// Java version manager with WebDAV backup sync.
#[derive(Parser)]
#[command(
    name = "toolup",
    author,
    version,
    about = "Java version manager with WebDAV backup sync",
    after_help = "\
ENVIRONMENT VARIABLES:
    TOOLUP_HOME             Home directory (default: ~/.toolup)
    TOOLUP_JAVA_URL         Java downloads page (overrides java.listing_url)
    TOOLUP_LOG              Log filter (overrides --log-level), e.g. 'toolup_catalog=debug'"
)]
pub struct Cli {
    /// Minimum level of log messages written to stderr.
    #[clap(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Available subcommands for the toolup CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// List Java versions available for this platform.
    ///
    /// Scrapes the downloads page and shows the archive published under
    /// each version, marking the ones already installed.
    Versions(versions::VersionsArgs),

    /// Download and verify a Java archive.
    ///
    /// Prints the path of the verified archive in the download cache.
    Download(download::DownloadArgs),

    /// Install a Java version.
    Install(install::InstallArgs),

    /// List installed Java versions.
    List,

    /// Remove an installed Java version.
    Uninstall(uninstall::UninstallArgs),

    /// Sync the backup directory with the WebDAV store, or configure it.
    Backup(backup_cmd::BackupArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level);

    match cli.command {
        Commands::Versions(args) => versions::execute(&args).await,
        Commands::Download(args) => download::execute(&args).await,
        Commands::Install(args) => install::execute(&args).await,
        Commands::List => list::execute(),
        Commands::Uninstall(args) => uninstall::execute(&args),
        Commands::Backup(args) => backup_cmd::execute(&args).await,
    }
}

/// Installs the stderr log subscriber.
///
/// A non-empty `TOOLUP_LOG` takes precedence over `--log-level`; an invalid
/// filter falls back to the flag.
fn init_tracing(level: LogLevel) {
    let directive = level.to_filter_directive();
    let filter = std::env::var(LOG_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
