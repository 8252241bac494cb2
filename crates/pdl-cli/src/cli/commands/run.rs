//! `pdl run` – download all pending assets of a library.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use pdl_core::config::PdlConfig;
use pdl_core::control::default_control_socket_path;
use pdl_core::library::{
    plan_run, run_persistence_loop, AssetLibrary, ChannelDelegate, PlanOptions, RunStats,
};
use pdl_core::runner::JobRunner;
use pdl_core::store::AssetStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::cli::control_socket;

const PROGRESS_INTERVAL_MS: u64 = 500;

/// Resolved arguments of `pdl run`.
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub library_dir: PathBuf,
    pub dest_dir: PathBuf,
    pub since: Option<DateTime<Utc>>,
    pub jobs: usize,
}

pub async fn run_downloads(store: &AssetStore, cfg: &PdlConfig, args: &RunArgs) -> Result<()> {
    let library = AssetLibrary::open(&args.library_dir)
        .await
        .with_context(|| format!("open library {}", args.library_dir.display()))?;

    let mut opts = PlanOptions::new(&args.dest_dir);
    opts.since = args.since;
    opts.include_hidden = cfg.include_hidden;
    opts.chunk_size = cfg.chunk_size_bytes;
    opts.transfer = cfg.transfer();

    let plan = plan_run(&library, store, &opts).await?;
    if plan.skipped_failed > 0 {
        println!(
            "{} failed asset(s) skipped; run `pdl reset-failed` to retry them.",
            plan.skipped_failed
        );
    }
    if plan.jobs.is_empty() {
        println!(
            "Nothing to download ({} asset(s) already complete).",
            plan.skipped_complete
        );
        return Ok(());
    }

    let (delegate, events_rx) = ChannelDelegate::new();
    let runner = JobRunner::new(args.jobs, Arc::new(delegate))?;
    let control = runner.control();

    let listener = match default_control_socket_path() {
        Ok(path) => match control_socket::spawn_control_listener(control.clone(), &path) {
            Ok(handle) => {
                tracing::debug!(path = %path.display(), "control socket listening");
                Some((handle, path))
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "control socket unavailable: {:#}", e);
                None
            }
        },
        Err(e) => {
            tracing::warn!("control socket path: {}", e);
            None
        }
    };

    let interrupt = {
        let control = control.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                println!();
                println!("Cancelling; waiting for in-flight downloads to stop...");
                control.cancel_all();
            }
        })
    };

    let (stats_tx, mut stats_rx) = tokio::sync::mpsc::channel::<RunStats>(16);
    let persist = tokio::spawn(run_persistence_loop(events_rx, store.clone(), Some(stats_tx)));
    let progress_handle = tokio::spawn(async move {
        let mut last_print: Option<Instant> = None;
        while let Some(stats) = stats_rx.recv().await {
            let now = Instant::now();
            let due = last_print.map_or(true, |t| {
                now.duration_since(t).as_millis() as u64 >= PROGRESS_INTERVAL_MS
            });
            if due || stats.completed >= stats.total {
                println!(
                    "  {} / {} assets ({:.1}%)  {} failed  ",
                    stats.completed,
                    stats.total,
                    stats.fraction() * 100.0,
                    stats.failed
                );
                last_print = Some(now);
            }
        }
    });

    println!(
        "Downloading {} asset(s) with up to {} at a time...",
        plan.jobs.len(),
        runner.concurrency()
    );
    let summary = runner.submit(plan.jobs)?.wait().await?;
    // Dropping the runner closes the event channel so the persistence loop can finish.
    drop(runner);
    let persisted = persist.await.context("persistence task join")?;
    let _ = progress_handle.await;

    interrupt.abort();
    if let Some((handle, path)) = listener {
        handle.abort();
        let _ = std::fs::remove_file(&path);
    }

    if summary.cancelled {
        println!(
            "Cancelled: {} of {} asset(s) processed, {} interrupted, {} not started.",
            summary.completed, summary.total, summary.interrupted, summary.dropped
        );
    } else {
        println!(
            "Done: {} downloaded, {} failed, {} skipped (unknown media type).",
            persisted.completed_assets, persisted.failed_assets, persisted.skipped_assets
        );
    }
    if persisted.failed_assets > 0 {
        println!("Failed assets stay marked; run `pdl reset-failed` and `pdl run` to retry.");
    }
    tracing::info!(
        total = summary.total,
        completed = summary.completed,
        failed = summary.failed,
        cancelled = summary.cancelled,
        "run completed"
    );
    Ok(())
}
