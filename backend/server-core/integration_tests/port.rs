use server_core::error::port::PortError;
use server_core::port::find_available_port;

use std::net::{Ipv4Addr, Ipv6Addr, TcpListener};

// ============================================================================
// Public API tests for port allocation
// ============================================================================

/// Reserve an OS-assigned port and keep it bound.
fn hold_port() -> (TcpListener, u16) {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// **VALUE**: Verifies a free preferred port is returned as-is.
///
/// **WHY THIS MATTERS**: The web app's links, cookies and local storage are keyed by origin.
/// Staying on the preferred port (3457 by default) keeps that origin stable across launches.
///
/// **BUG THIS CATCHES**: Would catch an allocator that always skips the first candidate.
#[tokio::test]
async fn given_free_preferred_port_when_allocating_then_returns_it() {
    // GIVEN: A port that was just released
    let (listener, port) = hold_port();
    drop(listener);

    // WHEN: Allocating from that port
    let result = find_available_port(port, 10).await;

    // THEN: The preferred port is returned
    assert_eq!(result.unwrap(), port);
}

/// **VALUE**: Verifies a busy preferred port is skipped for a higher free port.
///
/// **WHY THIS MATTERS**: A stray dev server on 3457 must not stop the shell from starting;
/// the allocator moves up to 3458 (or the next free port) instead.
///
/// **BUG THIS CATCHES**: Would catch the allocator returning a bound port, or searching downwards.
#[tokio::test]
async fn given_bound_preferred_port_when_allocating_then_returns_higher_free_port() {
    // GIVEN: The preferred port is held by another listener
    let (_held, port) = hold_port();

    // WHEN: Allocating from that port
    let allocated = find_available_port(port, 50).await.unwrap();

    // THEN: A higher port that can actually be bound
    assert!(allocated > port, "Expected a port above {port}, got {allocated}");
    assert!(
        TcpListener::bind((Ipv4Addr::LOCALHOST, allocated)).is_ok(),
        "Allocated port {allocated} should be bindable"
    );
}

/// **VALUE**: Verifies a port held only on IPv6 loopback is treated as busy.
///
/// **WHY THIS MATTERS**: Node dev servers bound to `localhost` often listen on `[::1]` only.
/// The web server listens dual-stack on `::`, so handing it that port fails with
/// `EADDRINUSE`, and `http://localhost:<port>/` may load the other app instead.
///
/// **BUG THIS CATCHES**: Would catch an allocator that only checks `0.0.0.0`.
#[tokio::test]
async fn given_port_held_on_ipv6_loopback_when_allocating_then_returns_higher_port() {
    // GIVEN: A listener on [::1] only (skipped on hosts without IPv6)
    let Ok(held) = TcpListener::bind((Ipv6Addr::LOCALHOST, 0)) else {
        return;
    };
    let port = held.local_addr().unwrap().port();

    // WHEN: Allocating from that port
    let allocated = find_available_port(port, 10).await.unwrap();

    // THEN: The IPv6 listener's port is skipped
    assert!(allocated > port, "Held [::1]:{port}, allocator returned {allocated}");
}

/// **VALUE**: Verifies the search gives up with a definite error once its limit is hit.
///
/// **WHY THIS MATTERS**: An unbounded search can spin forever on a host with exhausted ports.
///
/// **BUG THIS CATCHES**: Would catch the attempt limit being ignored.
#[tokio::test]
async fn given_single_attempt_on_bound_port_when_allocating_then_returns_exhausted() {
    // GIVEN: The only allowed candidate is busy
    let (_held, port) = hold_port();

    // WHEN: Allocating with a limit of one attempt
    let result = find_available_port(port, 1).await;

    // THEN: Exhausted after exactly one attempt
    match result {
        Err(PortError::Exhausted { attempts, .. }) => assert_eq!(attempts, 1),
        other => panic!("Expected Exhausted, got {other:?}"),
    }
}

/// **VALUE**: Verifies port 0 is rejected as a starting point.
///
/// **WHY THIS MATTERS**: Binding port 0 always "succeeds" with an OS-chosen port, which would
/// make the allocator return 0 and the server and prober disagree on the port.
#[tokio::test]
async fn given_port_zero_when_allocating_then_returns_invalid_port() {
    let result = find_available_port(0, 10).await;

    assert!(matches!(result, Err(PortError::InvalidPort { .. })));
}

/// **VALUE**: Verifies a zero attempt limit fails without touching the network.
#[tokio::test]
async fn given_zero_attempts_when_allocating_then_returns_exhausted() {
    let result = find_available_port(3457, 0).await;

    match result {
        Err(PortError::Exhausted { attempts, .. }) => assert_eq!(attempts, 0),
        other => panic!("Expected Exhausted, got {other:?}"),
    }
}
