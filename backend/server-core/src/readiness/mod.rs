//! Readiness probing for the supervised server.
//!
//! The prober polls `127.0.0.1:<port>` with plain TCP connects at a fixed
//! interval. No payload is exchanged; a successful connect is closed at once.

use crate::SERVER_PROBE_HOSTNAME;
use crate::error::readiness::ReadinessError;

use common::ErrorLocation;

use std::future::Future;
use std::panic::Location;
use std::time::Duration;

use backoff::backoff::{Backoff, Constant};
use log::{debug, info, trace};
use tokio::net::TcpStream;
use tokio::time::{Instant, sleep, timeout};

pub const DEFAULT_MAX_RETRIES: u32 = 60;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(1000);

/// How long and how often to probe before declaring the server dead.
///
/// Worst-case wait is `max_retries * retry_interval` plus connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub max_retries: u32,
    pub retry_interval: Duration,
    pub connect_timeout: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Result of a successful readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessReport {
    pub port: u16,
    /// 1-based attempt on which the connection succeeded.
    pub attempts: u32,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PollOutcome {
    pub ready: bool,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Wait until the server on `port` accepts TCP connections.
///
/// Each failed attempt is followed by a fixed `retry_interval` delay and consumes one retry.
/// A policy with zero retries fails immediately without probing.
///
/// # Errors
///
/// Returns [`ReadinessError::Timeout`] once all retries are spent.
pub async fn wait_for_server(
    port: u16,
    policy: &ReadinessPolicy,
) -> Result<ReadinessReport, ReadinessError> {
    debug!(
        "Waiting for server on {SERVER_PROBE_HOSTNAME}:{port} ({} retries every {:?})",
        policy.max_retries, policy.retry_interval
    );

    let connect_timeout = policy.connect_timeout;
    let outcome = poll_until_ready(policy, || probe_port(port, connect_timeout)).await;

    if outcome.ready {
        info!(
            "Server on port {port} is ready after {} attempt(s) in {:?}",
            outcome.attempts, outcome.elapsed
        );
        return Ok(ReadinessReport {
            port,
            attempts: outcome.attempts,
            elapsed: outcome.elapsed,
        });
    }

    Err(ReadinessError::Timeout {
        message: format!(
            "Server on port {port} did not start in time ({} attempts over {:?})",
            outcome.attempts, outcome.elapsed
        ),
        location: ErrorLocation::from(Location::caller()),
        attempts: outcome.attempts,
        elapsed: outcome.elapsed,
    })
}

/// Single TCP connect to `127.0.0.1:<port>`, bounded by `connect_timeout`.
pub async fn probe_port(port: u16, connect_timeout: Duration) -> bool {
    match timeout(
        connect_timeout,
        TcpStream::connect((SERVER_PROBE_HOSTNAME, port)),
    )
    .await
    {
        Ok(Ok(stream)) => {
            drop(stream);
            true
        }
        Ok(Err(e)) => {
            trace!("Probe of port {port} failed: {e}");
            false
        }
        Err(_) => {
            trace!("Probe of port {port} timed out after {connect_timeout:?}");
            false
        }
    }
}

/// Fixed-interval polling loop shared by [`wait_for_server`] and its tests.
pub(crate) async fn poll_until_ready<F, Fut>(policy: &ReadinessPolicy, mut probe: F) -> PollOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let started = Instant::now();
    let mut backoff = Constant::new(policy.retry_interval);
    let mut remaining = policy.max_retries;
    let mut attempts = 0;

    while remaining > 0 {
        attempts += 1;

        if probe().await {
            return PollOutcome {
                ready: true,
                attempts,
                elapsed: started.elapsed(),
            };
        }

        remaining -= 1;

        if let Some(delay) = backoff.next_backoff() {
            trace!("Server not ready ({remaining} retries left), retrying after {delay:?}");
            sleep(delay).await;
        }
    }

    PollOutcome {
        ready: false,
        attempts,
        elapsed: started.elapsed(),
    }
}
