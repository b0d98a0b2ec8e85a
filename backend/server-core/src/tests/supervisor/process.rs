// Unit tests for process module private helpers

use crate::supervisor::process::{send_graceful_signal, with_process};

/// **VALUE**: Prevents signalling PID 0 or 1 during teardown.
///
/// **WHY THIS MATTERS**: A zeroed PID (child reaped before `id()` was read) must not turn
/// into a SIGTERM for the whole process group or for init.
///
/// **BUG THIS CATCHES**: Would catch removal of the `pid <= 1` guard.
#[test]
fn given_pid_0_or_1_when_signalled_then_refuses() {
    assert!(!send_graceful_signal(0), "PID 0 must never be signalled");
    assert!(!send_graceful_signal(1), "PID 1 must never be signalled");
}

/// **VALUE**: Verifies signalling a PID that does not exist reports failure instead of panicking.
///
/// **WHY THIS MATTERS**: The server can die on its own between readiness and quit. Teardown
/// then falls through to the forced kill path, which expects `false` here.
#[test]
fn given_nonexistent_pid_when_signalled_then_returns_false() {
    assert!(!send_graceful_signal(u32::MAX));
}

/// **VALUE**: Verifies `with_process()` finds a live process and runs the closure on it.
///
/// **BUG THIS CATCHES**: Would catch a refresh that never loads the targeted PID.
#[test]
fn given_own_pid_when_with_process_called_then_executes_closure() {
    // GIVEN: Our own PID
    let own_pid = std::process::id();

    // WHEN: Looking the process up
    let found = with_process(own_pid, |p| p.pid().as_u32());

    // THEN: The closure saw our process
    assert_eq!(found, Some(own_pid));
}
