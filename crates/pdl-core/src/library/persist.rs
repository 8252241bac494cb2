//! Persistence side of a run: a delegate that forwards runner events over a
//! channel, and a background loop that writes them to the asset store.

use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;

use crate::runner::{Job, JobOutcome, MediaKind, RunDelegate, Subtask, TransferError};
use crate::store::AssetStore;

/// Minimum change in stored progress before another write.
const PROGRESS_WRITE_STEP: f64 = 0.01;

/// Highest value a progress event may store. Only a clean job completion
/// writes 1.0, after the last version file is in place.
const MAX_PROGRESS_BEFORE_COMPLETION: f64 = 0.99;

/// Owned copy of one runner callback.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Progress {
        asset_id: String,
        /// Position of the sub-task in its job.
        index: usize,
        /// Number of sub-tasks in the job.
        count: usize,
        progress: f64,
        error: Option<String>,
    },
    JobFailed {
        asset_id: String,
        error: String,
    },
    JobCompleted {
        asset_id: String,
        outcome: JobOutcome,
        /// The job had nothing to download (unknown kind or no versions).
        skipped: bool,
    },
    Aggregate {
        completed: usize,
        total: usize,
    },
    Finished,
}

/// Run-level progress for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub completed: usize,
    pub total: usize,
    /// Assets that failed so far in this run.
    pub failed: usize,
}

impl RunStats {
    /// Fraction of jobs done in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.completed as f64 / self.total as f64).min(1.0)
    }
}

/// What the persistence loop saw, returned when the channel closes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistSummary {
    pub completed_assets: usize,
    pub failed_assets: usize,
    pub skipped_assets: usize,
    /// Assets whose job was cut short by cancellation; left pending.
    pub interrupted_assets: usize,
    pub run_finished: bool,
}

/// `RunDelegate` that turns every callback into a [`RunEvent`] on an unbounded channel.
///
/// Sends never block, so the runner's dispatch lock is held only briefly.
pub struct ChannelDelegate {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelDelegate {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: RunEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("run event dropped: persistence loop gone");
        }
    }
}

impl RunDelegate for ChannelDelegate {
    fn on_progress(
        &self,
        job: &Job,
        subtask: &Subtask,
        progress: f64,
        error: Option<&TransferError>,
    ) {
        self.send(RunEvent::Progress {
            asset_id: job.asset_id().to_string(),
            index: job.subtask_index(subtask).unwrap_or(0),
            count: job.subtasks().len(),
            progress,
            error: error.map(ToString::to_string),
        });
    }

    fn on_job_failed(&self, job: &Job, error: &TransferError) {
        self.send(RunEvent::JobFailed {
            asset_id: job.asset_id().to_string(),
            error: error.to_string(),
        });
    }

    fn on_job_completed(&self, job: &Job, outcome: JobOutcome) {
        self.send(RunEvent::JobCompleted {
            asset_id: job.asset_id().to_string(),
            outcome,
            skipped: job.kind() == MediaKind::Unknown || job.subtasks().is_empty(),
        });
    }

    fn on_aggregate_progress(&self, completed: usize, total: usize) {
        self.send(RunEvent::Aggregate { completed, total });
    }

    fn on_run_finished(&self) {
        self.send(RunEvent::Finished);
    }
}

/// Overall asset progress from a sub-task's own progress, kept below 1.0.
fn overall_fraction(index: usize, count: usize, progress: f64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let p = if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    };
    ((index as f64 + p) / count as f64).min(MAX_PROGRESS_BEFORE_COMPLETION)
}

/// Persist run events until every sender is dropped. Spawn with `tokio::spawn`.
///
/// - progress: `download_progress = (index + p) / count`, throttled and capped
///   below 1.0
/// - failure: `failed_to_download = true`, progress reset to 0; later progress
///   for that asset in this run is ignored
/// - successful completion: progress set to 1.0
/// - interrupted completion: progress left as is, so the asset stays pending
///
/// Aggregate updates are forwarded to `stats_tx` (dropped when the receiver lags).
pub async fn run_persistence_loop(
    mut rx: mpsc::UnboundedReceiver<RunEvent>,
    store: AssetStore,
    stats_tx: Option<mpsc::Sender<RunStats>>,
) -> PersistSummary {
    let mut summary = PersistSummary::default();
    let mut failed: HashSet<String> = HashSet::new();
    let mut last_written: HashMap<String, f64> = HashMap::new();

    while let Some(event) = rx.recv().await {
        match event {
            RunEvent::Progress {
                asset_id,
                index,
                count,
                progress,
                error,
            } => {
                if let Some(err) = error {
                    tracing::debug!(asset = %asset_id, index, "transfer reported: {}", err);
                }
                if failed.contains(&asset_id) {
                    continue;
                }
                let fraction = overall_fraction(index, count, progress);
                let due = last_written
                    .get(&asset_id)
                    .map_or(true, |last| (fraction - last).abs() >= PROGRESS_WRITE_STEP);
                if !due {
                    continue;
                }
                if let Err(e) = store.set_progress(&asset_id, fraction).await {
                    tracing::warn!(asset = %asset_id, "progress update failed: {:#}", e);
                }
                last_written.insert(asset_id, fraction);
            }
            RunEvent::JobFailed { asset_id, error } => {
                tracing::warn!(asset = %asset_id, "download failed: {}", error);
                if let Err(e) = store.mark_failed(&asset_id).await {
                    tracing::warn!(asset = %asset_id, "failure update failed: {:#}", e);
                }
                failed.insert(asset_id);
            }
            RunEvent::JobCompleted {
                asset_id,
                outcome,
                skipped,
            } => {
                last_written.remove(&asset_id);
                if skipped {
                    summary.skipped_assets += 1;
                } else if outcome.is_failed() || failed.contains(&asset_id) {
                    summary.failed_assets += 1;
                } else if outcome == JobOutcome::Interrupted {
                    tracing::info!(asset = %asset_id, "download interrupted; left pending");
                    summary.interrupted_assets += 1;
                } else {
                    if let Err(e) = store.mark_completed(&asset_id).await {
                        tracing::warn!(asset = %asset_id, "completion update failed: {:#}", e);
                    }
                    summary.completed_assets += 1;
                }
            }
            RunEvent::Aggregate { completed, total } => {
                if let Some(ref tx) = stats_tx {
                    let _ = tx.try_send(RunStats {
                        completed,
                        total,
                        failed: summary.failed_assets,
                    });
                }
            }
            RunEvent::Finished => {
                summary.run_finished = true;
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::db::open_memory;
    use crate::store::{NewAsset, SourceKind};

    async fn store_with(ids: &[&str]) -> AssetStore {
        let store = open_memory().await.unwrap();
        for (i, id) in ids.iter().enumerate() {
            store
                .upsert_asset(&NewAsset {
                    local_identifier: id.to_string(),
                    media_kind: MediaKind::Image,
                    source: SourceKind::UserLibrary,
                    creation_date: i as i64,
                })
                .await
                .unwrap();
        }
        store
    }

    fn progress(id: &str, index: usize, count: usize, p: f64) -> RunEvent {
        RunEvent::Progress {
            asset_id: id.to_string(),
            index,
            count,
            progress: p,
            error: None,
        }
    }

    #[test]
    fn overall_fraction_spreads_over_subtasks() {
        assert_eq!(overall_fraction(0, 3, 0.0), 0.0);
        assert!((overall_fraction(1, 2, 0.5) - 0.75).abs() < 1e-9);
        assert_eq!(overall_fraction(2, 3, 1.0), MAX_PROGRESS_BEFORE_COMPLETION);
        assert_eq!(overall_fraction(0, 0, 0.5), 0.0);
        assert_eq!(overall_fraction(0, 2, f64::NAN), 0.0);
    }

    #[test]
    fn stats_fraction() {
        let s = RunStats {
            completed: 1,
            total: 4,
            failed: 0,
        };
        assert_eq!(s.fraction(), 0.25);
        let empty = RunStats {
            completed: 0,
            total: 0,
            failed: 0,
        };
        assert_eq!(empty.fraction(), 1.0);
    }

    #[tokio::test]
    async fn progress_and_completion_are_persisted() {
        let store = store_with(&["a"]).await;
        let (tx, rx) = mpsc::unbounded_channel();
        let (stats_tx, mut stats_rx) = mpsc::channel(8);
        let worker = tokio::spawn(run_persistence_loop(rx, store.clone(), Some(stats_tx)));

        tx.send(progress("a", 1, 2, 0.5)).unwrap();
        tx.send(RunEvent::JobCompleted {
            asset_id: "a".into(),
            outcome: JobOutcome::Succeeded,
            skipped: false,
        })
        .unwrap();
        tx.send(RunEvent::Aggregate {
            completed: 1,
            total: 1,
        })
        .unwrap();
        tx.send(RunEvent::Finished).unwrap();
        drop(tx);

        let summary = worker.await.unwrap();
        assert_eq!(summary.completed_assets, 1);
        assert!(summary.run_finished);
        assert_eq!(
            stats_rx.recv().await,
            Some(RunStats {
                completed: 1,
                total: 1,
                failed: 0
            })
        );
        let rec = store.get_asset("a").await.unwrap().unwrap();
        assert_eq!(rec.download_progress, 1.0);
    }

    #[tokio::test]
    async fn failure_resets_and_ignores_later_progress() {
        let store = store_with(&["f"]).await;
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_persistence_loop(rx, store.clone(), None));

        tx.send(progress("f", 0, 3, 1.0)).unwrap();
        tx.send(RunEvent::JobFailed {
            asset_id: "f".into(),
            error: "transfer returned no data".into(),
        })
        .unwrap();
        tx.send(progress("f", 2, 3, 0.9)).unwrap();
        tx.send(RunEvent::JobCompleted {
            asset_id: "f".into(),
            outcome: JobOutcome::Failed,
            skipped: false,
        })
        .unwrap();
        drop(tx);

        let summary = worker.await.unwrap();
        assert_eq!(summary.failed_assets, 1);
        assert!(!summary.run_finished);
        let rec = store.get_asset("f").await.unwrap().unwrap();
        assert!(rec.failed_to_download);
        assert_eq!(rec.download_progress, 0.0);
    }

    #[tokio::test]
    async fn skipped_assets_are_left_untouched() {
        let store = store_with(&["u"]).await;
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_persistence_loop(rx, store.clone(), None));
        tx.send(RunEvent::JobCompleted {
            asset_id: "u".into(),
            outcome: JobOutcome::Succeeded,
            skipped: true,
        })
        .unwrap();
        drop(tx);

        let summary = worker.await.unwrap();
        assert_eq!(summary.skipped_assets, 1);
        let rec = store.get_asset("u").await.unwrap().unwrap();
        assert_eq!(rec.download_progress, 0.0);
        assert!(!rec.failed_to_download);
    }

    #[tokio::test]
    async fn last_progress_event_does_not_mark_asset_complete() {
        let store = store_with(&["p"]).await;
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_persistence_loop(rx, store.clone(), None));

        tx.send(progress("p", 1, 2, 1.0)).unwrap();
        drop(tx);
        worker.await.unwrap();

        let rec = store.get_asset("p").await.unwrap().unwrap();
        assert_eq!(rec.download_progress, MAX_PROGRESS_BEFORE_COMPLETION);
        assert!(!rec.is_complete());
    }

    #[tokio::test]
    async fn interrupted_job_stays_pending() {
        let store = store_with(&["c"]).await;
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_persistence_loop(rx, store.clone(), None));

        tx.send(progress("c", 0, 3, 1.0)).unwrap();
        tx.send(RunEvent::JobCompleted {
            asset_id: "c".into(),
            outcome: JobOutcome::Interrupted,
            skipped: false,
        })
        .unwrap();
        drop(tx);

        let summary = worker.await.unwrap();
        assert_eq!(summary.interrupted_assets, 1);
        assert_eq!(summary.completed_assets, 0);
        let rec = store.get_asset("c").await.unwrap().unwrap();
        assert!(!rec.is_complete());
        assert!(!rec.failed_to_download);
        assert!((rec.download_progress - 1.0 / 3.0).abs() < 1e-9);
    }
}
