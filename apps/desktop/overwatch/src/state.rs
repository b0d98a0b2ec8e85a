use crate::error::OverwatchError;
use crate::lifecycle::LifecyclePhase;

use server_core::error::process::ProcessError;
use server_core::supervisor::{ServerProcess, TerminationOutcome};

use common::ErrorLocation;

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};

/// Commands handled by the lifecycle state actor.
///
/// The actor is the only owner of the server child process; everything that
/// touches it goes through one of these.
#[derive(Debug)]
pub enum StateCommand {
    /// Move to another lifecycle phase. Replies `false` if the move is not allowed.
    Transition {
        to: LifecyclePhase,
        reply: oneshot::Sender<bool>,
    },

    /// Hand a freshly spawned server to the actor. Replies `false` (and drops
    /// the process, killing it) when a server is already attached or the shell
    /// is quitting.
    AttachServer {
        process: ServerProcess,
        reply: oneshot::Sender<bool>,
    },

    /// Enter `Quitting` and stop the server if there is one.
    Teardown {
        grace: Duration,
        reply: oneshot::Sender<Option<Result<TerminationOutcome, ProcessError>>>,
    },
}

/// Shared lifecycle state for the shell.
///
/// Mutations are serialized through the actor; `phase` and `server_pid` are
/// mirrored into `RwLock`s for cheap reads, and the port is set exactly once.
#[derive(Clone)]
pub struct AppState {
    command_tx: Arc<Mutex<Option<mpsc::Sender<StateCommand>>>>,

    phase: Arc<RwLock<LifecyclePhase>>,

    server_pid: Arc<RwLock<Option<u32>>>,

    port: Arc<OnceLock<u16>>,

    actor_init: Arc<Mutex<bool>>,
}

impl AppState {
    /// Create the state. The actor is spawned lazily on first use, from
    /// inside the async runtime.
    pub fn new() -> Self {
        Self {
            command_tx: Arc::new(Mutex::new(None)),
            phase: Arc::new(RwLock::new(LifecyclePhase::Starting)),
            server_pid: Arc::new(RwLock::new(None)),
            port: Arc::new(OnceLock::new()),
            actor_init: Arc::new(Mutex::new(false)),
        }
    }

    pub async fn phase(&self) -> LifecyclePhase {
        *self.phase.read().await
    }

    /// Non-blocking check for the `Running` phase, for toolkit callbacks on the
    /// main thread. Reports `false` while a transition holds the lock.
    pub fn is_running(&self) -> bool {
        self.phase
            .try_read()
            .map(|phase| *phase == LifecyclePhase::Running)
            .unwrap_or(false)
    }

    /// PID of the attached server, if any.
    pub async fn server_pid(&self) -> Option<u32> {
        *self.server_pid.read().await
    }

    /// The port chosen for this run, once allocated.
    pub fn port(&self) -> Option<u16> {
        self.port.get().copied()
    }

    /// Record the port chosen for this run.
    ///
    /// # Errors
    ///
    /// Returns [`OverwatchError::State`] if a different port was already recorded.
    #[track_caller]
    pub fn set_port(&self, port: u16) -> Result<(), OverwatchError> {
        let location = ErrorLocation::caller();

        match self.port.set(port) {
            Ok(()) => Ok(()),
            Err(_) if self.port() == Some(port) => Ok(()),
            Err(_) => Err(OverwatchError::State {
                message: format!(
                    "Port already chosen ({:?}), refusing to switch to {port}",
                    self.port()
                ),
                location,
            }),
        }
    }

    /// Request a phase transition. `Ok(false)` means the transition was rejected.
    pub async fn transition(&self, to: LifecyclePhase) -> Result<bool, OverwatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(StateCommand::Transition { to, reply }).await?;
        receive(rx).await
    }

    /// Give ownership of the spawned server to the actor.
    ///
    /// `Ok(false)` means it was refused and has been killed.
    pub async fn attach_server(&self, process: ServerProcess) -> Result<bool, OverwatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(StateCommand::AttachServer { process, reply }).await?;
        receive(rx).await
    }

    /// Enter `Quitting` and stop the server.
    ///
    /// Returns `Ok(None)` when there was no server to stop, which makes a
    /// second teardown a no-op.
    pub async fn teardown(
        &self,
        grace: Duration,
    ) -> Result<Option<TerminationOutcome>, OverwatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(StateCommand::Teardown { grace, reply }).await?;

        match receive(rx).await? {
            Some(Ok(outcome)) => Ok(Some(outcome)),
            Some(Err(e)) => Err(OverwatchError::core(e)),
            None => Ok(None),
        }
    }

    async fn send(&self, cmd: StateCommand) -> Result<(), OverwatchError> {
        self.ensure_actor().await;

        let tx_guard = self.command_tx.lock().await;
        let tx = tx_guard.as_ref().ok_or_else(|| OverwatchError::State {
            message: String::from("State actor not initialized"),
            location: ErrorLocation::caller(),
        })?;

        tx.send(cmd).await.map_err(|e| OverwatchError::State {
            message: format!("State actor died: {e}"),
            location: ErrorLocation::caller(),
        })
    }

    async fn ensure_actor(&self) {
        let mut init_guard = self.actor_init.lock().await;
        if *init_guard {
            return;
        }

        let (tx, rx) = mpsc::channel(16);
        *self.command_tx.lock().await = Some(tx);

        tokio::spawn(state_actor(
            rx,
            Arc::clone(&self.phase),
            Arc::clone(&self.server_pid),
        ));
        *init_guard = true;
        debug!("State actor spawned");
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

async fn receive<T>(rx: oneshot::Receiver<T>) -> Result<T, OverwatchError> {
    rx.await.map_err(|_| OverwatchError::State {
        message: String::from("State actor dropped the reply"),
        location: ErrorLocation::caller(),
    })
}

async fn state_actor(
    mut command_rx: mpsc::Receiver<StateCommand>,
    phase: Arc<RwLock<LifecyclePhase>>,
    server_pid: Arc<RwLock<Option<u32>>>,
) {
    let mut server: Option<ServerProcess> = None;

    while let Some(cmd) = command_rx.recv().await {
        match cmd {
            StateCommand::Transition { to, reply } => {
                let mut phase_write = phase.write().await;
                let from = *phase_write;
                let allowed = from.can_transition_to(to);

                if allowed {
                    info!("Lifecycle: {from} -> {to}");
                    *phase_write = to;
                } else {
                    warn!("Rejected lifecycle transition {from} -> {to}");
                }

                let _ = reply.send(allowed);
            }
            StateCommand::AttachServer { process, reply } => {
                let quitting = *phase.read().await == LifecyclePhase::Quitting;

                let accepted = match (&server, quitting) {
                    (Some(existing), _) => {
                        warn!(
                            "Server PID {} already attached, killing duplicate PID {}",
                            existing.pid(),
                            process.pid()
                        );
                        false
                    }
                    (None, true) => {
                        warn!("Shell is quitting, killing late server PID {}", process.pid());
                        false
                    }
                    (None, false) => {
                        info!(
                            "Attached server: PID={}, port={}",
                            process.pid(),
                            process.port()
                        );
                        *server_pid.write().await = Some(process.pid());
                        server = Some(process);
                        true
                    }
                };

                let _ = reply.send(accepted);
            }
            StateCommand::Teardown { grace, reply } => {
                {
                    let mut phase_write = phase.write().await;
                    if *phase_write != LifecyclePhase::Quitting {
                        info!("Lifecycle: {} -> {}", *phase_write, LifecyclePhase::Quitting);
                        *phase_write = LifecyclePhase::Quitting;
                    }
                }

                let result = match server.take() {
                    Some(process) => {
                        info!("Stopping server PID {}", process.pid());
                        let outcome = process.terminate(grace).await;
                        if let Err(ref e) = outcome {
                            error!("Server teardown failed: {e}");
                        }
                        Some(outcome)
                    }
                    None => {
                        debug!("Teardown requested with no server attached");
                        None
                    }
                };

                *server_pid.write().await = None;
                let _ = reply.send(result);
            }
        }
    }

    debug!("State actor stopped");
}
