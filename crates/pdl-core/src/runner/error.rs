//! Runner error types.

use std::io;
use thiserror::Error;

/// Failure of a single sub-task transfer. Reported to the delegate, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The transfer finished without producing any data.
    #[error("transfer returned no data")]
    NoData,
    /// The run was cancelled while the transfer was in progress.
    #[error("transfer cancelled")]
    Cancelled,
    /// Local or remote I/O failed.
    #[error("i/o: {0}")]
    Io(String),
    /// Any other failure reported by the sub-task operation.
    #[error("{0}")]
    Failed(String),
}

impl From<io::Error> for TransferError {
    fn from(e: io::Error) -> Self {
        TransferError::Io(e.to_string())
    }
}

/// Misuse of the runner itself (never produced by a job).
#[derive(Debug, Error)]
pub enum RunnerError {
    /// `submit` was called while the previous run is still in flight.
    #[error("a run is already in flight; wait for it before submitting again")]
    RunInFlight,
    /// A concurrency limit of zero can never start a job.
    #[error("concurrency limit must be at least 1")]
    InvalidConcurrency,
    /// The run's driver task panicked or was aborted.
    #[error("run task join: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A job whose media kind the runner cannot download. Logged, then counted complete.
#[derive(Debug, Clone, Error)]
#[error("unrecognized media kind for asset {asset_id}")]
pub(crate) struct UnrecognizedJobKind {
    pub(crate) asset_id: String,
}
