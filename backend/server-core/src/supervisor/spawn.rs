use crate::SERVER_LOG_TARGET;
use crate::error::spawn::SpawnError;
use crate::supervisor::launch::LaunchPlan;
use crate::supervisor::process::ServerProcess;

use common::ErrorLocation;

use std::panic::Location;

use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child as TokioChild;
use tokio::spawn as TokioSpawn;

/// Spawn the server described by `plan` and start forwarding its output to the log.
///
/// Must be called from within a tokio runtime: output forwarding runs on spawned tasks.
///
/// # Returns
///
/// * `Ok(ServerProcess)` - The child is running (it may still fail to bind later)
/// * `Err(SpawnError)` - The executable could not be started
#[track_caller]
pub fn spawn_server(plan: &LaunchPlan) -> Result<ServerProcess, SpawnError> {
    info!(
        "Spawning server in {} mode: {:?} (cwd: {})",
        plan.mode,
        plan.command_line(),
        plan.cwd.display()
    );

    let location = ErrorLocation::from(Location::caller());
    let mut child = plan.to_command().spawn().map_err(|e| SpawnError::Spawn {
        message: format!(
            "Failed to spawn {} in {}: {e}",
            plan.program.display(),
            plan.cwd.display()
        ),
        location,
        source: Box::new(e),
    })?;

    let pid = child.id().unwrap_or_default();
    info!("Server spawned (PID: {pid}, port: {})", plan.port);

    forward_output(&mut child);

    Ok(ServerProcess::new(child, pid, plan.port))
}

fn forward_output(child: &mut TokioChild) {
    if let Some(stdout) = child.stdout.take() {
        TokioSpawn(forward_lines(stdout, false));
    }
    if let Some(stderr) = child.stderr.take() {
        TokioSpawn(forward_lines(stderr, true));
    }
}

/// Forward raw lines until EOF. Bytes that are not UTF-8 are logged lossily
/// and reading continues, so the child never writes into a closed pipe.
async fn forward_lines<R>(stream: R, is_stderr: bool)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(trim_line_ending(&buf));
                if is_stderr {
                    warn!(target: SERVER_LOG_TARGET, "{line}");
                } else {
                    info!(target: SERVER_LOG_TARGET, "{line}");
                }
            }
            Err(e) => {
                debug!("Stopped reading server output: {e}");
                break;
            }
        }
    }
}

pub(crate) fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
