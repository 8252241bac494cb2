//! CLI for the PDL asset downloader.

mod commands;
mod control_socket;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use pdl_core::config;
use pdl_core::control::ControlCommand;
use pdl_core::store::AssetStore;
use std::path::PathBuf;

use commands::{run_control, run_downloads, run_reset_failed, run_status, RunArgs};

/// Top-level CLI for PDL.
#[derive(Debug, Parser)]
#[command(name = "pdl")]
#[command(about = "PDL: download every version of every asset in a library to local storage", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download all pending assets of a library.
    Run {
        /// Library directory containing catalog.json (default: `library_dir` from config).
        #[arg(long, value_name = "DIR")]
        library: Option<PathBuf>,
        /// Destination directory (default: `download_dir` from config, else the current directory).
        #[arg(long, value_name = "DIR")]
        dest: Option<PathBuf>,
        /// Only assets created on or after this date (YYYY-MM-DD or RFC 3339).
        #[arg(long, value_name = "DATE", value_parser = parse_since)]
        since: Option<DateTime<Utc>>,
        /// Download up to N assets concurrently (default: `max_concurrent_jobs` from config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
    },

    /// Show assets that are not fully downloaded yet.
    Status {
        /// Include completed assets.
        #[arg(long)]
        all: bool,
    },

    /// Stop starting new downloads in the running `pdl run`.
    Suspend,

    /// Let a suspended `pdl run` start downloads again.
    Resume,

    /// Cancel the running `pdl run`.
    Cancel,

    /// Clear the failed flag on all assets so the next run retries them.
    ResetFailed,
}

/// Parse `--since`: a plain date means midnight UTC.
pub(crate) fn parse_since(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("invalid date `{s}` (expected YYYY-MM-DD or RFC 3339)"))?;
    date.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid date `{s}`"))
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run {
                library,
                dest,
                since,
                jobs,
            } => {
                let library_dir = match library.or_else(|| cfg.library_dir.clone()) {
                    Some(dir) => dir,
                    None => anyhow::bail!(
                        "no library given: pass --library or set library_dir in {}",
                        config::config_path()?.display()
                    ),
                };
                let dest_dir = match dest.or_else(|| cfg.download_dir.clone()) {
                    Some(dir) => dir,
                    None => std::env::current_dir()?,
                };
                let store = AssetStore::open_default().await?;
                let args = RunArgs {
                    library_dir,
                    dest_dir,
                    since,
                    jobs: jobs.unwrap_or(cfg.max_concurrent_jobs),
                };
                run_downloads(&store, &cfg, &args).await?;
            }
            CliCommand::Status { all } => {
                let store = AssetStore::open_default().await?;
                run_status(&store, all).await?;
            }
            CliCommand::Suspend => run_control(ControlCommand::Suspend).await?,
            CliCommand::Resume => run_control(ControlCommand::Resume).await?,
            CliCommand::Cancel => run_control(ControlCommand::Cancel).await?,
            CliCommand::ResetFailed => {
                let store = AssetStore::open_default().await?;
                run_reset_failed(&store).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
