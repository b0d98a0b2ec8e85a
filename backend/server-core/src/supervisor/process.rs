use crate::error::process::ProcessError;

use common::ErrorLocation;

use std::panic::Location;
use std::process::ExitStatus;
use std::time::Duration;

use log::{debug, info, warn};
use sysinfo::{Pid, Process, ProcessesToUpdate, Signal, System};
use tokio::process::Child as TokioChild;
use tokio::time::timeout;

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// How a teardown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationOutcome {
    /// The server had already exited before teardown started.
    AlreadyExited(ExitStatus),
    /// The server exited within the grace period after the graceful signal.
    Terminated(ExitStatus),
    /// The server outlived the grace period (or could not be signalled) and was killed.
    Killed(ExitStatus),
}

/// Owned handle to the running server child process.
///
/// Dropping the handle without calling [`ServerProcess::terminate`] force-kills the
/// child (the command is built with `kill_on_drop`).
#[derive(Debug)]
pub struct ServerProcess {
    child: TokioChild,
    pid: u32,
    port: u16,
}

impl ServerProcess {
    pub(crate) fn new(child: TokioChild, pid: u32, port: u16) -> Self {
        Self { child, pid, port }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Exit status if the child has already exited, without blocking.
    pub fn exit_status(&mut self) -> Option<ExitStatus> {
        self.child.try_wait().ok().flatten()
    }

    /// Stop the server: graceful signal, bounded wait, then forced kill.
    ///
    /// # Arguments
    ///
    /// * `grace` - How long to wait for a graceful exit before killing
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] if waiting on or killing the child fails at the OS level.
    pub async fn terminate(mut self, grace: Duration) -> Result<TerminationOutcome, ProcessError> {
        let pid = self.pid;

        let already = self.child.try_wait().map_err(|e| ProcessError::Wait {
            message: format!("Failed to poll server PID {pid}: {e}"),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })?;
        if let Some(status) = already {
            info!("Server PID {pid} had already exited: {status}");
            return Ok(TerminationOutcome::AlreadyExited(status));
        }

        if send_graceful_signal(pid) {
            debug!("Sent SIGTERM to server PID {pid}, waiting up to {grace:?}");

            match timeout(grace, self.child.wait()).await {
                Ok(Ok(status)) => {
                    info!("Server PID {pid} exited gracefully: {status}");
                    return Ok(TerminationOutcome::Terminated(status));
                }
                Ok(Err(e)) => {
                    return Err(ProcessError::Wait {
                        message: format!("Failed to wait for server PID {pid}: {e}"),
                        location: ErrorLocation::from(Location::caller()),
                        source: e,
                    });
                }
                Err(_) => {
                    warn!("Server PID {pid} still running after {grace:?}, killing");
                }
            }
        } else {
            warn!("Could not signal server PID {pid} gracefully, killing");
        }

        self.child.kill().await.map_err(|e| ProcessError::Kill {
            message: format!("Failed to kill server PID {pid}: {e}"),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })?;

        let status = self.child.wait().await.map_err(|e| ProcessError::Wait {
            message: format!("Failed to reap server PID {pid}: {e}"),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })?;

        info!("Server PID {pid} killed: {status}");
        Ok(TerminationOutcome::Killed(status))
    }
}

/// Send SIGTERM to `pid`.
///
/// Returns `false` when the process is gone, the platform has no graceful
/// signal, or `pid` is 0/1 (never signalled).
pub(crate) fn send_graceful_signal(pid: u32) -> bool {
    if pid <= 1 {
        warn!("Refusing to signal PID {pid}");
        return false;
    }

    with_process(pid, |p| p.kill_with(Signal::Term))
        .flatten()
        .unwrap_or_else(|| {
            debug!("SIGTERM not delivered to PID {pid}");
            false
        })
}

pub(crate) fn with_process<F, R>(pid: u32, f: F) -> Option<R>
where
    F: FnOnce(&Process) -> R,
{
    let target = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[target]), true);

    sys.process(target).map(f)
}
