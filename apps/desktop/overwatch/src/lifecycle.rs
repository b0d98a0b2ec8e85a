//! Startup and shutdown sequencing for the shell.
//!
//! `starting → probing → ready → running`, with `quitting` reachable from every
//! phase. Startup allocates a port, spawns the web server, waits for it to
//! accept connections and only then opens the window. Exit tears the server
//! down before the process ends.

use crate::error::OverwatchError;
use crate::state::AppState;
use crate::window::create_main_window;

use server_core::config::ShellConfig;
use server_core::error::spawn::SpawnError;
use server_core::port::find_available_port;
use server_core::readiness::wait_for_server;
use server_core::supervisor::launch::resolve_app_root;
use server_core::supervisor::process::DEFAULT_GRACE_PERIOD;
use server_core::supervisor::{LaunchPlan, RunMode, spawn_server};

use common::ErrorLocation;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use tauri::{AppHandle, Manager, RunEvent, Runtime};

/// Exit code used when the server never becomes ready.
pub const STARTUP_FAILURE_EXIT_CODE: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Starting,
    Probing,
    Ready,
    Running,
    Quitting,
}

impl LifecyclePhase {
    /// Forward-only transitions; `Quitting` is reachable from anywhere and never left.
    pub fn can_transition_to(self, to: LifecyclePhase) -> bool {
        use LifecyclePhase::*;

        matches!(
            (self, to),
            (Starting, Probing) | (Probing, Ready) | (Ready, Running) | (_, Quitting)
        )
    }
}

impl Display for LifecyclePhase {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        let name = match self {
            LifecyclePhase::Starting => "starting",
            LifecyclePhase::Probing => "probing",
            LifecyclePhase::Ready => "ready",
            LifecyclePhase::Running => "running",
            LifecyclePhase::Quitting => "quitting",
        };
        formatter.write_str(name)
    }
}

/// What to do when the last window closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPolicy {
    /// macOS: the app stays alive in the dock with zero windows.
    KeepRunning,
    Quit,
}

impl ExitPolicy {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            ExitPolicy::KeepRunning
        } else {
            ExitPolicy::Quit
        }
    }

    /// An exit request without a code comes from the last window closing;
    /// requests with a code come from an explicit `exit(code)`.
    pub fn should_prevent_exit(self, code: Option<i32>) -> bool {
        self == ExitPolicy::KeepRunning && code.is_none()
    }
}

/// Root of the development tree: the workspace that holds `package.json`.
pub fn dev_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../..")
}

/// Build the launch plan from config, falling back to build-derived defaults.
///
/// Mode comes from config, else from whether the shell is packaged. The app
/// root comes from config, else `<resources>/app` (packaged) or [`dev_root`].
pub fn build_launch_plan(
    config: &ShellConfig,
    port: u16,
    packaged: bool,
    resource_dir: Option<&Path>,
) -> Result<LaunchPlan, SpawnError> {
    let mode = config
        .server
        .mode
        .unwrap_or_else(|| RunMode::from_packaged(packaged));

    let app_root = resolve_app_root(
        mode,
        resource_dir,
        &dev_root(),
        config.server.app_root.as_deref(),
    )?;

    let plan = LaunchPlan::new(port, mode, &app_root);
    Ok(match &config.server.executable {
        Some(program) => plan.with_program(program),
        None => plan,
    })
}

/// What the startup sequence needs from the toolkit.
pub trait StartupHost: Send + Sync + 'static {
    /// Whether this is a bundled build rather than a dev run.
    fn packaged(&self) -> bool;

    fn resource_dir(&self) -> Option<PathBuf>;

    /// Schedule creation of the main window pointed at `port`.
    fn open_window(&self, port: u16) -> Result<(), OverwatchError>;

    fn exit(&self, code: i32);
}

impl<R: Runtime> StartupHost for AppHandle<R> {
    fn packaged(&self) -> bool {
        !tauri::is_dev()
    }

    fn resource_dir(&self) -> Option<PathBuf> {
        self.path().resource_dir().ok()
    }

    fn open_window(&self, port: u16) -> Result<(), OverwatchError> {
        open_window_on_main_thread(self, port)
    }

    fn exit(&self, code: i32) {
        AppHandle::exit(self, code);
    }
}

/// Run the startup sequence. Any failure is fatal: it is logged and the app
/// exits with [`STARTUP_FAILURE_EXIT_CODE`] without ever opening a window.
pub async fn start<H: StartupHost>(host: H, state: AppState, config: ShellConfig) {
    if let Err(e) = run_startup(&host, &state, &config).await {
        error!("Startup failed: {e}");
        host.exit(STARTUP_FAILURE_EXIT_CODE);
    }
}

async fn run_startup<H: StartupHost>(
    host: &H,
    state: &AppState,
    config: &ShellConfig,
) -> Result<(), OverwatchError> {
    let port = find_available_port(
        config.server.preferred_port,
        config.server.port_search_limit,
    )
    .await
    .map_err(|e| OverwatchError::Core {
        message: e.to_string(),
        location: ErrorLocation::from(Location::caller()),
    })?;
    state.set_port(port)?;

    let resource_dir = host.resource_dir();
    let plan = build_launch_plan(config, port, host.packaged(), resource_dir.as_deref())
        .map_err(|e| OverwatchError::Core {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

    // A spawn failure is not fatal here; it surfaces as a readiness timeout.
    match spawn_server(&plan) {
        Ok(process) => {
            if !state.attach_server(process).await? {
                warn!("Server refused by lifecycle state, abandoning startup");
                return Ok(());
            }
        }
        Err(e) => error!("{e}"),
    }

    if !state.transition(LifecyclePhase::Probing).await? {
        return Ok(());
    }

    wait_for_server(port, &config.readiness.policy())
        .await
        .map_err(|e| OverwatchError::Core {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

    if !state.transition(LifecyclePhase::Ready).await? {
        info!("Quit requested during startup, not opening a window");
        return Ok(());
    }

    host.open_window(port)?;
    state.transition(LifecyclePhase::Running).await?;

    Ok(())
}

#[track_caller]
fn open_window_on_main_thread<R: Runtime>(
    app: &AppHandle<R>,
    port: u16,
) -> Result<(), OverwatchError> {
    let location = ErrorLocation::caller();
    let handle = app.clone();

    app.run_on_main_thread(move || {
        if let Err(e) = create_main_window(&handle, port) {
            error!("{e}");
        }
    })
    .map_err(|e| OverwatchError::Window {
        message: format!("Failed to schedule window creation: {e}"),
        location,
    })
}

/// Toolkit run-loop callback.
pub fn handle_run_event<R: Runtime>(app: &AppHandle<R>, event: RunEvent) {
    match event {
        RunEvent::ExitRequested { code, api, .. } => {
            if ExitPolicy::current().should_prevent_exit(code) {
                debug!("Last window closed, staying alive");
                api.prevent_exit();
            } else {
                info!("Exit requested (code {code:?})");
            }
        }
        RunEvent::Exit => shutdown(app),
        #[cfg(target_os = "macos")]
        RunEvent::Reopen { .. } => crate::window::reopen(app),
        _ => {}
    }
}

/// Stop the server, blocking until it is gone or killed.
pub fn shutdown<R: Runtime>(app: &AppHandle<R>) {
    let Some(state) = app.try_state::<AppState>() else {
        return;
    };
    let grace = app
        .try_state::<ShellConfig>()
        .map(|config| config.shutdown.grace_period())
        .unwrap_or(DEFAULT_GRACE_PERIOD);

    let state = state.inner().clone();
    match tauri::async_runtime::block_on(state.teardown(grace)) {
        Ok(Some(outcome)) => info!("Server stopped: {outcome:?}"),
        Ok(None) => debug!("No server to stop"),
        Err(e) => warn!("Teardown incomplete: {e}"),
    }
}
