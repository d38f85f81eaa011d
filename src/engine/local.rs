//! Local shell commands
//!
//! The command line is handed to the platform shell (`sh -c`, or `cmd /C` on
//! Windows) and inherits the terminal, so its output streams straight through.

use tokio::process::Command;
use tracing::{debug, info};

use crate::engine::error::ExecutorError;

fn shell(command: &str) -> Command {
    let (program, flag) = if cfg!(windows) {
        ("cmd", "/C")
    } else {
        ("sh", "-c")
    };
    let mut cmd = Command::new(program);
    cmd.arg(flag).arg(command);
    cmd
}

/// Run `command` to completion; success means exit status zero
pub async fn run_command(command: &str) -> Result<(), ExecutorError> {
    info!("Executing command: {}", command);

    let status = shell(command)
        .status()
        .await
        .map_err(ExecutorError::Spawn)?;

    match status.code() {
        Some(0) => {
            debug!("Command completed successfully");
            Ok(())
        }
        Some(code) => Err(ExecutorError::CommandFailed(code)),
        None => Err(ExecutorError::CommandTerminated),
    }
}
