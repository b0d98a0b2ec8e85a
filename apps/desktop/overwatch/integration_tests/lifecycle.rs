use overwatch::error::OverwatchError;
use overwatch::lifecycle::{LifecyclePhase, STARTUP_FAILURE_EXIT_CODE, StartupHost, start};
use overwatch::state::AppState;

use server_core::config::ShellConfig;
use server_core::supervisor::RunMode;

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::{Instant, sleep};

// ============================================================================
// Integration tests for the startup sequence.
// A recording host stands in for the toolkit so the window and exit decisions
// can be observed without a display.
// ============================================================================

const GRACE: Duration = Duration::from_secs(5);

#[derive(Clone, Default)]
struct RecordingHost {
    packaged: bool,
    opened: Arc<Mutex<Vec<u16>>>,
    exits: Arc<Mutex<Vec<i32>>>,
}

impl RecordingHost {
    fn opened(&self) -> Vec<u16> {
        self.opened.lock().unwrap().clone()
    }

    fn exits(&self) -> Vec<i32> {
        self.exits.lock().unwrap().clone()
    }
}

impl StartupHost for RecordingHost {
    fn packaged(&self) -> bool {
        self.packaged
    }

    fn resource_dir(&self) -> Option<PathBuf> {
        None
    }

    fn open_window(&self, port: u16) -> Result<(), OverwatchError> {
        self.opened.lock().unwrap().push(port);
        Ok(())
    }

    fn exit(&self, code: i32) {
        self.exits.lock().unwrap().push(code);
    }
}

/// Config whose server executable does not exist, so nothing ever listens
/// unless the test binds the port itself.
fn config_without_server(app_root: &Path, preferred_port: u16, max_retries: u32) -> ShellConfig {
    let mut config = ShellConfig::default();
    config.server.preferred_port = preferred_port;
    config.server.app_root = Some(app_root.to_path_buf());
    config.server.executable = Some(app_root.join("missing-server"));
    config.server.mode = Some(RunMode::Development);
    config.readiness.max_retries = max_retries;
    config.readiness.retry_interval_ms = 20;
    config.readiness.connect_timeout_ms = 50;
    config
}

async fn wait_for_phase(state: &AppState, phase: LifecyclePhase) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while state.phase().await != phase {
        assert!(Instant::now() < deadline, "Timed out waiting for {phase}");
        sleep(Duration::from_millis(5)).await;
    }
}

/// **VALUE**: Verifies a server that never starts ends the app with exit code 1 and no window.
///
/// **WHY THIS MATTERS**: A blank window pointed at a dead port looks like a hung app. The
/// shell must give up after the readiness budget and exit with a failure code instead.
///
/// **BUG THIS CATCHES**: Would catch the timeout being logged but swallowed, or the window
/// being opened before readiness is confirmed.
#[tokio::test]
async fn given_server_never_listens_when_starting_then_exits_with_failure_and_no_window() {
    // GIVEN: No server will ever listen, with a tiny readiness budget
    let dir = tempfile::tempdir().unwrap();
    let host = RecordingHost::default();
    let state = AppState::new();
    let config = config_without_server(dir.path(), 43_100, 3);

    // WHEN: Running startup
    start(host.clone(), state.clone(), config).await;

    // THEN: Exit code 1, no window, still probing when the exit was requested
    assert_eq!(host.exits(), vec![STARTUP_FAILURE_EXIT_CODE]);
    assert!(host.opened().is_empty(), "No window may open without a server");
    assert!(state.port().is_some());
    assert_eq!(state.phase().await, LifecyclePhase::Probing);
}

/// **VALUE**: Verifies a packaged build without a resource directory fails fast.
///
/// **BUG THIS CATCHES**: Would catch a launch with an empty app root, which would then sit
/// through the whole readiness budget before failing.
#[tokio::test]
async fn given_packaged_build_without_resources_when_starting_then_exits_before_probing() {
    // GIVEN: A packaged host with no resource directory and no overrides
    let host = RecordingHost {
        packaged: true,
        ..RecordingHost::default()
    };
    let state = AppState::new();
    let mut config = ShellConfig::default();
    config.server.preferred_port = 43_300;

    // WHEN: Running startup
    start(host.clone(), state.clone(), config).await;

    // THEN: Exit code 1 without ever probing
    assert_eq!(host.exits(), vec![STARTUP_FAILURE_EXIT_CODE]);
    assert!(host.opened().is_empty());
    assert_eq!(state.phase().await, LifecyclePhase::Starting);
}

/// **VALUE**: Verifies the window opens on the chosen port once the server accepts connections.
///
/// **WHY THIS MATTERS**: This is the normal launch. The window and the server must agree on
/// the port, and the phase must reach `running` so reopen can recreate the window later.
#[tokio::test]
async fn given_server_listens_while_probing_when_starting_then_opens_window_on_port() {
    // GIVEN: A listener that appears once probing has begun
    let dir = tempfile::tempdir().unwrap();
    let host = RecordingHost::default();
    let state = AppState::new();
    let config = config_without_server(dir.path(), 43_500, 100);

    let watcher_state = state.clone();
    let server = tokio::spawn(async move {
        wait_for_phase(&watcher_state, LifecyclePhase::Probing).await;
        let port = watcher_state.port().unwrap();
        TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await.unwrap()
    });

    // WHEN: Running startup
    start(host.clone(), state.clone(), config).await;

    // THEN: One window on the allocated port, no exit, phase running
    let _listener = server.await.unwrap();
    assert_eq!(host.opened(), vec![state.port().unwrap()]);
    assert!(host.exits().is_empty());
    assert_eq!(state.phase().await, LifecyclePhase::Running);
}

/// **VALUE**: Verifies quitting while probing means no window, even if the server comes up.
///
/// **WHY THIS MATTERS**: The user may quit during a slow first start. A readiness success that
/// lands afterwards must not pop a window onto a shell that is shutting down.
///
/// **BUG THIS CATCHES**: Would catch the coordinator ignoring the rejected `ready` transition.
#[tokio::test]
async fn given_quit_during_probing_when_server_becomes_ready_then_no_window() {
    // GIVEN: Quit is requested while probing, then the server starts listening
    let dir = tempfile::tempdir().unwrap();
    let host = RecordingHost::default();
    let state = AppState::new();
    let config = config_without_server(dir.path(), 43_700, 100);

    let watcher_state = state.clone();
    let server = tokio::spawn(async move {
        wait_for_phase(&watcher_state, LifecyclePhase::Probing).await;
        watcher_state.teardown(GRACE).await.unwrap();
        let port = watcher_state.port().unwrap();
        TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await.unwrap()
    });

    // WHEN: Running startup
    start(host.clone(), state.clone(), config).await;

    // THEN: No window and no failure exit; the shell stays in quitting
    let _listener = server.await.unwrap();
    assert!(host.opened().is_empty(), "Window opened after quit");
    assert!(host.exits().is_empty());
    assert_eq!(state.phase().await, LifecyclePhase::Quitting);
}

/// **VALUE**: Verifies a server spawned after quit is refused and startup stops there.
///
/// **BUG THIS CATCHES**: Would catch startup probing for a server that the state actor has
/// already killed.
#[cfg(unix)]
#[tokio::test]
async fn given_quit_before_spawn_when_starting_then_server_refused_and_no_window() {
    // GIVEN: Quit already requested, and an executable that starts successfully
    let dir = tempfile::tempdir().unwrap();
    let host = RecordingHost::default();
    let state = AppState::new();
    state.teardown(GRACE).await.unwrap();

    let mut config = config_without_server(dir.path(), 43_900, 100);
    config.server.executable = Some(PathBuf::from("/bin/sh"));

    // WHEN: Running startup
    let started = Instant::now();
    start(host.clone(), state.clone(), config).await;

    // THEN: Returned without probing, no window, nothing attached
    assert!(started.elapsed() < Duration::from_secs(1), "Startup should not probe");
    assert!(host.opened().is_empty());
    assert!(host.exits().is_empty());
    assert_eq!(state.server_pid().await, None);
    assert_eq!(state.phase().await, LifecyclePhase::Quitting);
}
