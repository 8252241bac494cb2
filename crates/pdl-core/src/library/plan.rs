//! Turn library assets into runner jobs and register them in the store.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;

use super::catalog::{AssetLibrary, CatalogAsset, EnumerateOptions};
use super::paths::{asset_dir_name, version_file_name};
use super::transfer::CopyTransfer;
use crate::config::{TransferConfig, DEFAULT_CHUNK_SIZE_BYTES};
use crate::runner::{Job, SubtaskOp};
use crate::store::{AssetStore, NewAsset};

/// Inputs for planning one run.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    /// Where versions are written (`<dest>/<asset dir>/<version>.<ext>`).
    pub dest_dir: PathBuf,
    /// Only assets created at or after this instant.
    pub since: Option<DateTime<Utc>>,
    pub include_hidden: bool,
    pub chunk_size: usize,
    pub transfer: TransferConfig,
}

impl PlanOptions {
    pub fn new(dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            dest_dir: dest_dir.into(),
            since: None,
            include_hidden: true,
            chunk_size: DEFAULT_CHUNK_SIZE_BYTES,
            transfer: TransferConfig::default(),
        }
    }
}

/// Jobs for one run plus what was left out.
#[derive(Debug)]
pub struct RunPlan {
    pub jobs: Vec<Job>,
    /// Eligible assets already fully downloaded.
    pub skipped_complete: usize,
    /// Eligible assets marked failed by an earlier run (cleared by `reset_failed`).
    pub skipped_failed: usize,
}

/// Build one job per asset, in the given order.
///
/// Each job gets one [`CopyTransfer`] sub-task per version configured for the
/// asset's media kind. Unknown kinds get a job with no sub-tasks; the runner
/// logs and skips it.
pub fn build_jobs(
    library: &AssetLibrary,
    assets: &[&CatalogAsset],
    opts: &PlanOptions,
) -> Vec<Job> {
    assets
        .iter()
        .map(|asset| {
            let kind = asset.kind();
            let asset_dir = opts.dest_dir.join(asset_dir_name(&asset.id));
            let mut job = Job::new(asset.id.clone(), kind);
            for &version in opts.transfer.versions_for(kind) {
                let source = asset.version_path(version).map(|p| library.resolve(p));
                let dest = asset_dir.join(version_file_name(version, source.as_deref()));
                let op: Arc<dyn SubtaskOp> =
                    Arc::new(CopyTransfer::new(source, dest, opts.chunk_size));
                job.push_subtask(version, op);
            }
            job
        })
        .collect()
}

/// Enumerate eligible assets, register them in the store, and build jobs for
/// those not yet complete and not marked failed.
pub async fn plan_run(
    library: &AssetLibrary,
    store: &AssetStore,
    opts: &PlanOptions,
) -> Result<RunPlan> {
    let eligible = library.enumerate(&EnumerateOptions {
        since: opts.since,
        include_hidden: opts.include_hidden,
    });

    let mut todo = Vec::with_capacity(eligible.len());
    let mut skipped_complete = 0usize;
    let mut skipped_failed = 0usize;
    for asset in eligible {
        store
            .upsert_asset(&NewAsset {
                local_identifier: asset.id.clone(),
                media_kind: asset.kind(),
                source: asset.source_kind(),
                creation_date: asset.creation_date.timestamp(),
            })
            .await?;
        match store.get_asset(&asset.id).await? {
            Some(rec) if rec.is_complete() => skipped_complete += 1,
            Some(rec) if rec.failed_to_download => skipped_failed += 1,
            _ => todo.push(asset),
        }
    }

    tracing::info!(
        jobs = todo.len(),
        skipped_complete,
        skipped_failed,
        "run planned"
    );
    Ok(RunPlan {
        jobs: build_jobs(library, &todo, opts),
        skipped_complete,
        skipped_failed,
    })
}
