//! Jobs, sub-tasks and the injected sub-task operation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::control::RunControl;
use super::dispatch::Dispatcher;
use super::error::TransferError;

/// Media kind of an asset. Decides which versions a job requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Unknown,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Unknown => "unknown",
        }
    }

    /// Unrecognized strings map to `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "image" => MediaKind::Image,
            "video" => MediaKind::Video,
            "audio" => MediaKind::Audio,
            _ => MediaKind::Unknown,
        }
    }

    /// Every version the library can hand out for this kind, in request order.
    pub fn default_versions(self) -> &'static [Version] {
        match self {
            MediaKind::Image => &[Version::Current, Version::Unadjusted, Version::Original],
            MediaKind::Video | MediaKind::Audio => &[Version::Current, Version::Original],
            MediaKind::Unknown => &[],
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edit version of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Version {
    /// The asset with all edits applied.
    Current,
    /// The original capture before adjustments (may differ from `Original` for RAW+JPEG).
    Unadjusted,
    /// The original file as imported.
    Original,
}

impl Version {
    pub fn as_str(self) -> &'static str {
        match self {
            Version::Current => "current",
            Version::Unadjusted => "unadjusted",
            Version::Original => "original",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "current" => Some(Version::Current),
            "unadjusted" => Some(Version::Unadjusted),
            "original" => Some(Version::Original),
            _ => None,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The transfer behind one sub-task, injected by the job source.
///
/// An operation reports zero or more `(progress, error)` events through the
/// context and then returns exactly once. `Err` marks the sub-task failed;
/// the runner still moves on to the job's next sub-task.
#[async_trait]
pub trait SubtaskOp: Send + Sync {
    async fn run(&self, ctx: SubtaskContext) -> Result<(), TransferError>;
}

/// One step of a job: a version label plus the operation that fetches it.
#[derive(Clone)]
pub struct Subtask {
    version: Version,
    op: Arc<dyn SubtaskOp>,
}

impl Subtask {
    pub fn new(version: Version, op: Arc<dyn SubtaskOp>) -> Self {
        Self { version, op }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub(crate) fn op(&self) -> Arc<dyn SubtaskOp> {
        Arc::clone(&self.op)
    }
}

impl fmt::Debug for Subtask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subtask")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// A unit of work for one asset. Sub-tasks run sequentially, in order.
#[derive(Debug, Clone)]
pub struct Job {
    asset_id: String,
    kind: MediaKind,
    subtasks: Vec<Subtask>,
}

impl Job {
    pub fn new(asset_id: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            asset_id: asset_id.into(),
            kind,
            subtasks: Vec::new(),
        }
    }

    /// Append a sub-task; returns `self` for chaining.
    pub fn with_subtask(mut self, version: Version, op: Arc<dyn SubtaskOp>) -> Self {
        self.subtasks.push(Subtask::new(version, op));
        self
    }

    pub fn push_subtask(&mut self, version: Version, op: Arc<dyn SubtaskOp>) {
        self.subtasks.push(Subtask::new(version, op));
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn subtasks(&self) -> &[Subtask] {
        &self.subtasks
    }

    /// Position of `subtask` in this job, if it belongs to it.
    pub fn subtask_index(&self, subtask: &Subtask) -> Option<usize> {
        self.subtasks
            .iter()
            .position(|s| std::ptr::eq(s, subtask))
    }
}

/// Handle given to a running [`SubtaskOp`]: event sink plus cancellation view.
pub struct SubtaskContext {
    job: Arc<Job>,
    index: usize,
    dispatcher: Arc<Dispatcher>,
    control: RunControl,
}

impl SubtaskContext {
    pub(crate) fn new(
        job: Arc<Job>,
        index: usize,
        dispatcher: Arc<Dispatcher>,
        control: RunControl,
    ) -> Self {
        Self {
            job,
            index,
            dispatcher,
            control,
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn subtask(&self) -> &Subtask {
        &self.job.subtasks[self.index]
    }

    /// Position of this sub-task within its job.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Forward a `(progress, error)` event to the delegate unmodified.
    pub fn report(&self, progress: f64, error: Option<TransferError>) {
        self.dispatcher
            .progress(&self.job, self.subtask(), progress, error.as_ref());
    }

    /// True once `cancel_all` was requested; long transfers should stop at the next chunk.
    pub fn is_cancelled(&self) -> bool {
        self.control.is_cancelled()
    }
}
