//! Bounded job runner.
//!
//! Runs a list of jobs (one per asset, each with an ordered list of sub-tasks)
//! with at most K jobs in flight, forwarding every sub-task event to a
//! [`RunDelegate`] and reporting aggregate completion:
//! submit → refill loop (FIFO start, unordered finish) → per-job sequential
//! sub-tasks → completion counter → run finished.

mod control;
mod delegate;
mod dispatch;
mod error;
mod job;
mod run;

pub use control::{ControlState, RunControl};
pub use delegate::{JobOutcome, RunDelegate};
pub use error::{RunnerError, TransferError};
pub use job::{Job, MediaKind, Subtask, SubtaskContext, SubtaskOp, Version};
pub use run::{JobRunner, RunHandle, RunSummary};
