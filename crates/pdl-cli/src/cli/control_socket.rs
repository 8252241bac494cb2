//! Control socket: server (during `pdl run`) and client (for `pdl suspend|resume|cancel`).
//! Protocol: one command per line, see `pdl_core::control::ControlCommand`.

use anyhow::Result;
use pdl_core::control::ControlCommand;
use pdl_core::runner::RunControl;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

/// Binds `path` and spawns a task that applies each received command to `control`.
/// A stale socket file is replaced. Malformed lines are ignored.
pub fn spawn_control_listener(
    control: RunControl,
    path: impl AsRef<Path>,
) -> Result<tokio::task::JoinHandle<()>> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path)?;

    let handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let control = control.clone();
                    tokio::spawn(async move {
                        let mut lines = BufReader::new(stream).lines();
                        while let Ok(Some(line)) = lines.next_line().await {
                            match ControlCommand::parse_line(&line) {
                                Some(cmd) => {
                                    tracing::info!("control socket: {}", cmd);
                                    cmd.apply(&control);
                                }
                                None => tracing::debug!("control socket: ignoring {:?}", line),
                            }
                        }
                    });
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
    });
    Ok(handle)
}

/// Sends one command line. Returns `Ok(false)` if no run is listening.
pub async fn send_command(socket_path: &Path, cmd: ControlCommand) -> Result<bool> {
    if !socket_path.exists() {
        return Ok(false);
    }
    let mut stream = match UnixStream::connect(socket_path).await {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    stream.write_all(format!("{}\n", cmd).as_bytes()).await?;
    stream.flush().await?;
    Ok(true)
}
