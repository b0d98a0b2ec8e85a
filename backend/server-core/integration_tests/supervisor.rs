use server_core::content_url;
use server_core::error::spawn::SpawnError;
use server_core::port::find_available_port;
use server_core::readiness::{ReadinessPolicy, wait_for_server};
use server_core::supervisor::launch::{MODE_ENV, PORT_ENV};
use server_core::supervisor::{LaunchPlan, RunMode, TerminationOutcome, spawn_server};

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::{Instant, sleep};

// ============================================================================
// Integration tests for spawning and tearing down real child processes.
// `/bin/sh` stands in for the web server executable.
// ============================================================================

const SHORT_GRACE: Duration = Duration::from_millis(300);

fn shell_plan(port: u16, cwd: &Path, script: &str) -> LaunchPlan {
    let mut plan = LaunchPlan::new(port, RunMode::Development, cwd).with_program("/bin/sh");
    plan.args = vec![String::from("-c"), script.to_string()];
    plan
}

async fn wait_for_file(path: &Path) -> String {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if let Ok(contents) = std::fs::read_to_string(path)
            && !contents.is_empty()
        {
            return contents;
        }
        sleep(Duration::from_millis(20)).await;
    }
    panic!("Timed out waiting for {}", path.display());
}

/// **VALUE**: Verifies a missing server executable surfaces as a spawn error.
///
/// **WHY THIS MATTERS**: An app bundle without `node_modules/.bin/next` must produce a clear
/// error in the log rather than a panic.
///
/// **BUG THIS CATCHES**: Would catch a spawn path that unwraps the OS error.
#[tokio::test]
async fn given_missing_executable_when_spawning_then_returns_spawn_error() {
    // GIVEN: A plan whose executable does not exist
    let dir = tempfile::tempdir().unwrap();
    let plan = LaunchPlan::new(3457, RunMode::Production, dir.path());
    assert!(!plan.program.exists());

    // WHEN: Spawning
    let result = spawn_server(&plan);

    // THEN: A Spawn error naming the executable
    match result {
        Err(SpawnError::Spawn { message, .. }) => {
            assert!(message.contains("next"), "Message should name the binary: {message}");
        }
        other => panic!("Expected Spawn error, got {other:?}"),
    }
}

/// **VALUE**: Verifies the child sees `PORT` and `NODE_ENV` and runs in the app root.
///
/// **WHY THIS MATTERS**: The web server reads `PORT` to decide where to listen. If it is lost
/// the server binds its own default and the prober waits on the wrong port.
#[cfg(unix)]
#[tokio::test]
async fn given_launch_plan_when_spawning_then_child_sees_port_mode_and_cwd() {
    // GIVEN: A plan that records its environment and working directory
    let dir = tempfile::tempdir().unwrap();
    let out: PathBuf = dir.path().join("env.txt");
    let script = format!(
        "printf '%s %s %s' \"${PORT_ENV}\" \"${MODE_ENV}\" \"$(pwd -P)\" > '{}'",
        out.display()
    );
    let plan = shell_plan(4123, dir.path(), &script);

    // WHEN: Spawning and waiting for the output
    let process = spawn_server(&plan).unwrap();
    let contents = wait_for_file(&out).await;

    // THEN: Port, mode and cwd all reached the child
    let cwd = dir.path().canonicalize().unwrap();
    assert_eq!(contents, format!("4123 development {}", cwd.display()));
    assert_eq!(process.port(), 4123);

    process.terminate(SHORT_GRACE).await.unwrap();
}

/// **VALUE**: Verifies a child that honours SIGTERM is reported as terminated.
///
/// **WHY THIS MATTERS**: Next.js flushes and closes cleanly on SIGTERM; it should get that
/// chance before anything harsher happens.
#[cfg(unix)]
#[tokio::test]
async fn given_cooperative_child_when_terminating_then_exits_gracefully() {
    // GIVEN: A long-running child with default signal handling
    let dir = tempfile::tempdir().unwrap();
    let process = spawn_server(&shell_plan(4124, dir.path(), "exec sleep 30")).unwrap();
    assert!(process.pid() > 1);

    // WHEN: Terminating with a generous grace period
    let outcome = process.terminate(Duration::from_secs(5)).await.unwrap();

    // THEN: Terminated, not killed
    assert!(
        matches!(outcome, TerminationOutcome::Terminated(_)),
        "Expected graceful termination, got {outcome:?}"
    );
}

/// **VALUE**: Verifies a child that prints bytes that are not UTF-8 keeps running.
///
/// **WHY THIS MATTERS**: If forwarding stops on a decode error the pipe reader is dropped,
/// and the server's next write dies with SIGPIPE. One stray byte in a log line would take
/// the whole app down.
///
/// **BUG THIS CATCHES**: Would catch a forwarder that gives up on the first invalid line.
#[cfg(unix)]
#[tokio::test]
async fn given_non_utf8_output_when_child_keeps_writing_then_child_survives() {
    // GIVEN: A child that writes an invalid byte, then more output, then a marker file
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("marker.txt");
    let script = format!(
        "printf 'bad \\377 byte\\n'; sleep 0.3; echo still-alive; echo done > '{}'; exec sleep 30",
        marker.display()
    );
    let mut process = spawn_server(&shell_plan(4127, dir.path(), &script)).unwrap();

    // WHEN: The child writes after the invalid line
    let contents = wait_for_file(&marker).await;
    sleep(Duration::from_millis(100)).await;

    // THEN: The later write succeeded and the child is still running
    assert_eq!(contents.trim(), "done");
    assert!(process.exit_status().is_none(), "Child died after invalid output");

    let outcome = process.terminate(Duration::from_secs(5)).await.unwrap();
    assert!(matches!(outcome, TerminationOutcome::Terminated(_)));
}

/// **VALUE**: Verifies a child that ignores SIGTERM is killed after the grace period.
///
/// **WHY THIS MATTERS**: A hung server must never outlive the shell. Quitting the app has to
/// finish even when the child refuses to stop.
///
/// **BUG THIS CATCHES**: Would catch teardown waiting forever on a stubborn child.
#[cfg(unix)]
#[tokio::test]
async fn given_child_ignoring_sigterm_when_terminating_then_killed_after_grace() {
    // GIVEN: A child that ignores SIGTERM
    let dir = tempfile::tempdir().unwrap();
    let mut process =
        spawn_server(&shell_plan(4125, dir.path(), "trap '' TERM; exec sleep 30")).unwrap();
    sleep(Duration::from_millis(200)).await;
    assert!(process.exit_status().is_none(), "Child should still be running");

    // WHEN: Terminating with a short grace period
    let started = Instant::now();
    let outcome = process.terminate(SHORT_GRACE).await.unwrap();

    // THEN: Killed once the grace period ran out
    assert!(
        matches!(outcome, TerminationOutcome::Killed(_)),
        "Expected kill, got {outcome:?}"
    );
    assert!(started.elapsed() >= SHORT_GRACE);
}

/// **VALUE**: Verifies teardown of a child that already exited does not signal anything.
///
/// **WHY THIS MATTERS**: The server may crash before the user quits. Its PID could be reused
/// by then, so signalling it would hit an unrelated process.
#[cfg(unix)]
#[tokio::test]
async fn given_exited_child_when_terminating_then_reports_already_exited() {
    // GIVEN: A child that exits straight away with code 3
    let dir = tempfile::tempdir().unwrap();
    let process = spawn_server(&shell_plan(4126, dir.path(), "exit 3")).unwrap();
    sleep(Duration::from_millis(300)).await;

    // WHEN: Terminating
    let outcome = process.terminate(SHORT_GRACE).await.unwrap();

    // THEN: Already exited with its own status
    match outcome {
        TerminationOutcome::AlreadyExited(status) => assert_eq!(status.code(), Some(3)),
        other => panic!("Expected AlreadyExited, got {other:?}"),
    }
}

/// **VALUE**: Walks the launch sequence end to end: allocate, spawn, probe, content URL, teardown.
///
/// **WHY THIS MATTERS**: This is what the desktop shell does on every start. The pieces must
/// agree on the port they pass between each other.
#[cfg(unix)]
#[tokio::test]
async fn given_allocated_port_when_server_listens_then_probe_succeeds_and_url_matches() {
    // GIVEN: A freshly allocated port and a running child
    let port = find_available_port(41_000, 200).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let process = spawn_server(&shell_plan(port, dir.path(), "exec sleep 30")).unwrap();

    // AND: Something listening on that port in place of the web server
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await.unwrap();

    // WHEN: Waiting for readiness
    let policy = ReadinessPolicy {
        max_retries: 10,
        retry_interval: Duration::from_millis(20),
        connect_timeout: Duration::from_millis(200),
    };
    let report = wait_for_server(port, &policy).await.unwrap();

    // THEN: Ready on the first attempt, and the window URL targets the same port
    assert_eq!(report.attempts, 1);
    assert_eq!(content_url(port), format!("http://localhost:{port}/"));

    drop(listener);
    let outcome = process.terminate(Duration::from_secs(5)).await.unwrap();
    assert!(!matches!(outcome, TerminationOutcome::AlreadyExited(_)));
}
