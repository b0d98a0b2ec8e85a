use overwatch::lifecycle::LifecyclePhase;
use overwatch::state::AppState;

use server_core::supervisor::{LaunchPlan, RunMode, ServerProcess, TerminationOutcome, spawn_server};

use std::path::Path;
use std::time::Duration;

// ============================================================================
// Integration tests for the lifecycle state actor.
// `/bin/sh` stands in for the web server so real child processes are owned,
// refused and torn down.
// ============================================================================

const GRACE: Duration = Duration::from_secs(5);

#[cfg(unix)]
fn spawn_sleeper(port: u16, dir: &Path) -> ServerProcess {
    let mut plan = LaunchPlan::new(port, RunMode::Development, dir).with_program("/bin/sh");
    plan.args = vec![String::from("-c"), String::from("exec sleep 30")];
    spawn_server(&plan).unwrap()
}

/// **VALUE**: Verifies the actor walks the startup path and reports each phase.
///
/// **WHY THIS MATTERS**: The coordinator decides whether to open a window from the reply to
/// `transition(Ready)`. The reply and the readable phase must agree.
#[tokio::test]
async fn given_fresh_state_when_walking_startup_then_reaches_running() {
    // GIVEN: Fresh state
    let state = AppState::new();
    assert_eq!(state.phase().await, LifecyclePhase::Starting);

    // WHEN: Walking the happy path
    for next in [
        LifecyclePhase::Probing,
        LifecyclePhase::Ready,
        LifecyclePhase::Running,
    ] {
        assert!(state.transition(next).await.unwrap(), "-> {next} should be accepted");
    }

    // THEN: Running, visible to sync readers too
    assert_eq!(state.phase().await, LifecyclePhase::Running);
    assert!(state.is_running());
}

/// **VALUE**: Verifies skipping readiness is refused and leaves the phase unchanged.
///
/// **BUG THIS CATCHES**: Would catch the actor applying a transition it logged as rejected.
#[tokio::test]
async fn given_starting_when_jumping_to_running_then_rejected() {
    let state = AppState::new();

    let accepted = state.transition(LifecyclePhase::Running).await.unwrap();

    assert!(!accepted);
    assert_eq!(state.phase().await, LifecyclePhase::Starting);
    assert!(!state.is_running());
}

/// **VALUE**: Verifies the port is chosen once per run.
///
/// **WHY THIS MATTERS**: Spawning on one port and probing or reopening on another would
/// leave the window pointed at nothing.
#[test]
fn given_port_set_when_setting_again_then_same_ok_different_rejected() {
    let state = AppState::new();
    assert_eq!(state.port(), None);

    state.set_port(3458).unwrap();

    assert!(state.set_port(3458).is_ok(), "Same port is idempotent");
    assert!(state.set_port(3459).is_err(), "Switching ports must fail");
    assert_eq!(state.port(), Some(3458));
}

/// **VALUE**: Verifies teardown with no server enters `quitting` and is a no-op.
///
/// **WHY THIS MATTERS**: Quitting while the server failed to spawn must still exit cleanly,
/// and exit handlers may call teardown more than once.
#[tokio::test]
async fn given_no_server_when_tearing_down_twice_then_none_and_quitting() {
    let state = AppState::new();

    let first = state.teardown(GRACE).await.unwrap();
    let second = state.teardown(GRACE).await.unwrap();

    assert_eq!(first, None);
    assert_eq!(second, None);
    assert_eq!(state.phase().await, LifecyclePhase::Quitting);
}

/// **VALUE**: Verifies a quitting shell cannot go back to `ready`.
///
/// **BUG THIS CATCHES**: Would catch a readiness success that lands after quit opening a
/// window on a shell that is shutting down.
#[tokio::test]
async fn given_quitting_when_readiness_arrives_then_ready_rejected() {
    let state = AppState::new();
    assert!(state.transition(LifecyclePhase::Probing).await.unwrap());
    state.teardown(GRACE).await.unwrap();

    let accepted = state.transition(LifecyclePhase::Ready).await.unwrap();

    assert!(!accepted);
    assert_eq!(state.phase().await, LifecyclePhase::Quitting);
}

/// **VALUE**: Verifies the attached server is stopped on teardown and forgotten afterwards.
///
/// **WHY THIS MATTERS**: This is the quit path. The child must not outlive the shell, and a
/// second exit callback must not try to stop it again.
#[cfg(unix)]
#[tokio::test]
async fn given_attached_server_when_tearing_down_then_stopped_once() {
    // GIVEN: A running child owned by the actor
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new();
    let process = spawn_sleeper(4301, dir.path());
    let pid = process.pid();
    assert!(state.attach_server(process).await.unwrap());
    assert_eq!(state.server_pid().await, Some(pid));

    // WHEN: Tearing down twice
    let first = state.teardown(GRACE).await.unwrap();
    let second = state.teardown(GRACE).await.unwrap();

    // THEN: Stopped the first time, nothing left the second
    assert!(
        matches!(
            first,
            Some(TerminationOutcome::Terminated(_) | TerminationOutcome::Killed(_))
        ),
        "Expected the server to be stopped, got {first:?}"
    );
    assert_eq!(second, None);
    assert_eq!(state.server_pid().await, None);
}

/// **VALUE**: Verifies a second server is refused while one is attached.
///
/// **WHY THIS MATTERS**: At most one child exists per run; a duplicate would hold a second
/// port and never be torn down.
#[cfg(unix)]
#[tokio::test]
async fn given_attached_server_when_attaching_another_then_refused() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new();
    let first = spawn_sleeper(4302, dir.path());
    let first_pid = first.pid();
    assert!(state.attach_server(first).await.unwrap());

    let accepted = state.attach_server(spawn_sleeper(4303, dir.path())).await.unwrap();

    assert!(!accepted);
    assert_eq!(state.server_pid().await, Some(first_pid));
    state.teardown(GRACE).await.unwrap();
}

/// **VALUE**: Verifies a server spawned after quit began is refused.
#[cfg(unix)]
#[tokio::test]
async fn given_quitting_when_attaching_server_then_refused() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new();
    state.teardown(GRACE).await.unwrap();

    let accepted = state.attach_server(spawn_sleeper(4304, dir.path())).await.unwrap();

    assert!(!accepted);
    assert_eq!(state.server_pid().await, None);
}
