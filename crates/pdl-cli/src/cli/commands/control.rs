//! `pdl suspend|resume|cancel` – signal a running `pdl run` over the control socket.

use anyhow::Result;
use pdl_core::control::{default_control_socket_path, ControlCommand};

use crate::cli::control_socket;

pub async fn run_control(cmd: ControlCommand) -> Result<()> {
    let path = default_control_socket_path()?;
    if control_socket::send_command(&path, cmd).await? {
        println!("Sent `{cmd}` to the running download.");
    } else {
        println!("No download is running.");
    }
    Ok(())
}
