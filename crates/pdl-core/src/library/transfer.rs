//! Chunked copy of one asset version into local storage, with progress.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::runner::{SubtaskContext, SubtaskOp, TransferError};

/// Temporary file suffix used before the atomic rename.
pub(crate) const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path.
fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Copies `source` to `dest` in `chunk_size` pieces, reporting progress after each.
///
/// Writes to `<dest>.part` and renames on success, so `dest` only ever holds a
/// complete file. A missing source is `NoData`; cancellation is checked
/// between chunks.
#[derive(Debug, Clone)]
pub struct CopyTransfer {
    source: Option<PathBuf>,
    dest: PathBuf,
    chunk_size: usize,
}

impl CopyTransfer {
    pub fn new(source: Option<PathBuf>, dest: PathBuf, chunk_size: usize) -> Self {
        Self {
            source,
            dest,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    async fn copy(&self, source: &Path, ctx: &SubtaskContext) -> Result<(), TransferError> {
        let mut input = match tokio::fs::File::open(source).await {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(TransferError::NoData),
            Err(e) => return Err(e.into()),
        };
        let total = input.metadata().await?.len();

        if let Some(parent) = self.dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let part = temp_path(&self.dest);
        let result = self.write_part(&mut input, total, &part, ctx).await;
        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(&part).await {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!("could not remove {}: {}", part.display(), e);
                }
            }
        }
        result
    }

    /// Copy into `part`, then sync and rename it over `dest`. The caller removes
    /// `part` when this fails.
    async fn write_part(
        &self,
        input: &mut tokio::fs::File,
        total: u64,
        part: &Path,
        ctx: &SubtaskContext,
    ) -> Result<(), TransferError> {
        let mut output = tokio::fs::File::create(part).await?;

        let mut buf = vec![0u8; self.chunk_size];
        let mut copied: u64 = 0;
        loop {
            if ctx.is_cancelled() {
                return Err(TransferError::Cancelled);
            }
            let n = match input.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    let err = TransferError::from(e);
                    ctx.report(fraction(copied, total), Some(err.clone()));
                    return Err(err);
                }
            };
            if let Err(e) = output.write_all(&buf[..n]).await {
                let err = TransferError::from(e);
                ctx.report(fraction(copied, total), Some(err.clone()));
                return Err(err);
            }
            copied += n as u64;
            ctx.report(fraction(copied, total), None);
        }

        if copied == 0 {
            return Err(TransferError::NoData);
        }

        output.flush().await?;
        output.sync_all().await?;
        drop(output);
        tokio::fs::rename(part, &self.dest).await?;
        tracing::debug!(
            asset = ctx.job().asset_id(),
            version = %ctx.subtask().version(),
            bytes = copied,
            "version stored at {}",
            self.dest.display()
        );
        Ok(())
    }
}

fn fraction(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 1.0;
    }
    (done as f64 / total as f64).min(1.0)
}

#[async_trait]
impl SubtaskOp for CopyTransfer {
    async fn run(&self, ctx: SubtaskContext) -> Result<(), TransferError> {
        let Some(source) = self.source.as_deref() else {
            return Err(TransferError::NoData);
        };
        self.copy(source, &ctx).await
    }
}
