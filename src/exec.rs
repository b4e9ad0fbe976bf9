// External command runner with a deadline and cooperative cancellation.
// Dropping the child future on timeout or cancel kills the process.

use crate::error::ExecError;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Default deadline for helper commands (ip, ss, netstat).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    /// stdout followed by stderr, lossily decoded.
    pub text: String,
}

pub async fn run_command(
    program: &str,
    args: &[String],
    deadline: Duration,
    cancel: &CancellationToken,
) -> Result<CommandOutput, ExecError> {
    if cancel.is_cancelled() {
        return Err(ExecError::Cancelled);
    }
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ExecError::Cancelled),
        res = tokio::time::timeout(deadline, child) => match res {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ExecError::Spawn {
                    program: program.to_string(),
                    source: e,
                });
            }
            Err(_) => {
                return Err(ExecError::Timeout {
                    program: program.to_string(),
                    secs: deadline.as_secs_f64(),
                });
            }
        },
    };

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok(CommandOutput {
        success: output.status.success(),
        text,
    })
}

/// True when `program` resolves to a file in one of the `PATH` directories.
pub fn command_exists(program: &str) -> bool {
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path).any(|dir| dir.join(program).is_file())
}
