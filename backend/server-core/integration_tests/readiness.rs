use server_core::error::readiness::ReadinessError;
use server_core::readiness::{ReadinessPolicy, probe_port, wait_for_server};

use std::net::{Ipv4Addr, TcpListener as StdTcpListener};
use std::time::{Duration, Instant};

use tokio::net::TcpListener;
use tokio::time::sleep;

// ============================================================================
// Public API tests for readiness probing against real sockets
// ============================================================================

fn fast_policy(max_retries: u32) -> ReadinessPolicy {
    ReadinessPolicy {
        max_retries,
        retry_interval: Duration::from_millis(20),
        connect_timeout: Duration::from_millis(200),
    }
}

fn released_port() -> u16 {
    let listener = StdTcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    listener.local_addr().unwrap().port()
}

/// **VALUE**: Verifies a listening server is detected on the first attempt.
///
/// **WHY THIS MATTERS**: This is the happy path of every launch: the window opens as soon as
/// the prober connects.
#[tokio::test]
async fn given_listening_server_when_waiting_then_ready_on_first_attempt() {
    // GIVEN: A listener standing in for the web server
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();

    // WHEN: Waiting for readiness
    let report = wait_for_server(port, &fast_policy(5)).await.unwrap();

    // THEN: Ready immediately
    assert_eq!(report.port, port);
    assert_eq!(report.attempts, 1);
}

/// **VALUE**: Verifies the prober times out after `retries` attempts against a dead port.
///
/// **WHY THIS MATTERS**: When the server never starts, the shell must give up and quit
/// instead of hanging without a window.
///
/// **BUG THIS CATCHES**: Would catch a prober that never fails, or fails before spending
/// its retry budget.
#[tokio::test]
async fn given_closed_port_when_waiting_then_times_out_after_all_retries() {
    // GIVEN: A port nobody listens on
    let port = released_port();
    let started = Instant::now();

    // WHEN: Waiting with 4 retries at 20 ms
    let result = wait_for_server(port, &fast_policy(4)).await;

    // THEN: Timeout after exactly 4 attempts and at least 4 × 20 ms
    match result {
        Err(ReadinessError::Timeout {
            attempts, message, ..
        }) => {
            assert_eq!(attempts, 4);
            assert!(message.contains("did not start in time"));
        }
        other => panic!("Expected timeout, got {other:?}"),
    }
    assert!(started.elapsed() >= Duration::from_millis(80));
}

/// **VALUE**: Verifies a server that starts late is picked up on a later attempt.
///
/// **WHY THIS MATTERS**: `next start` takes a few seconds to bind; the prober must keep
/// trying rather than fail on the first refused connection.
#[tokio::test]
async fn given_server_starting_late_when_waiting_then_ready_on_later_attempt() {
    // GIVEN: A port that starts listening after ~100 ms
    let port = released_port();
    let server = tokio::spawn(async move {
        sleep(Duration::from_millis(100)).await;
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await.unwrap();
        sleep(Duration::from_secs(2)).await;
        drop(listener);
    });

    // WHEN: Waiting with a generous budget
    let report = wait_for_server(port, &fast_policy(100)).await.unwrap();

    // THEN: Needed more than one attempt, but not the whole budget
    assert!(report.attempts > 1, "Should need retries");
    assert!(report.attempts < 100, "Should not exhaust retries");

    server.abort();
}

/// **VALUE**: Verifies the single-shot probe reports open and closed ports correctly.
#[tokio::test]
async fn given_open_and_closed_ports_when_probed_then_reports_each() {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let open = listener.local_addr().unwrap().port();
    let closed = released_port();

    assert!(probe_port(open, Duration::from_millis(200)).await);
    assert!(!probe_port(closed, Duration::from_millis(200)).await);
}
