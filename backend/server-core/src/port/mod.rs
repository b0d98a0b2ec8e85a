//! Free-port selection for the supervised server.
//!
//! A candidate is tested by binding a listener on all IPv4 interfaces and then
//! on the IPv6 wildcard (the server itself listens dual-stack on `::`), releasing
//! each immediately. A listener on either family makes the port busy. Busy
//! candidates are skipped in ascending order until the search limit is reached.

use crate::error::port::PortError;

use common::ErrorLocation;

use std::io::{ErrorKind, Result as IoResult};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::panic::Location;

use log::{debug, info, trace};
use netstat2::{
    AddressFamilyFlags, ProtocolFlags, ProtocolSocketInfo, TcpState, get_sockets_info,
};
use tokio::net::TcpSocket;

pub const DEFAULT_PORT_SEARCH_LIMIT: u16 = 100;

/// Find a port that can currently be bound on this host, starting at `preferred`.
///
/// Tries `preferred`, `preferred + 1`, ... and returns the first candidate that binds.
///
/// # Arguments
///
/// * `preferred` - First port to try (must be non-zero)
/// * `max_attempts` - How many consecutive candidates to test before giving up
///
/// # Errors
///
/// * [`PortError::InvalidPort`] - `preferred` is 0
/// * [`PortError::Exhausted`] - every candidate was busy, or the search ran past 65535
pub async fn find_available_port(preferred: u16, max_attempts: u16) -> Result<u16, PortError> {
    if preferred == 0 {
        return Err(PortError::InvalidPort {
            message: String::from("Preferred port must be between 1 and 65535"),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    debug!("Searching for a free port from {preferred} (limit {max_attempts})");

    let mut candidate = preferred;
    let mut attempts: u32 = 0;

    while attempts < u32::from(max_attempts) {
        attempts += 1;

        match try_bind(candidate).await {
            Ok(()) => {
                if candidate == preferred {
                    debug!("Preferred port {preferred} is free");
                } else {
                    info!("Port {preferred} is busy, using {candidate} instead");
                }
                return Ok(candidate);
            }
            Err(e) => {
                debug!(
                    "Port {candidate} unavailable: {e}{}",
                    describe_listeners(candidate)
                );
            }
        }

        candidate = match candidate.checked_add(1) {
            Some(next) => next,
            None => {
                return Err(PortError::Exhausted {
                    message: format!("Port search from {preferred} ran past 65535"),
                    location: ErrorLocation::from(Location::caller()),
                    attempts,
                });
            }
        };
    }

    Err(PortError::Exhausted {
        message: format!(
            "No free port found in {attempts} attempts starting at {preferred}"
        ),
        location: ErrorLocation::from(Location::caller()),
        attempts,
    })
}

/// Bind and immediately release listeners on `0.0.0.0:<port>` and `[::]:<port>`.
///
/// A host without IPv6 only gets the IPv4 check; `AddrInUse` on the IPv6 side
/// always counts as busy.
async fn try_bind(port: u16) -> IoResult<()> {
    let socket = TcpSocket::new_v4()?;
    socket.bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))?;
    drop(socket.listen(1)?);

    match try_bind_v6(port) {
        Err(e) if e.kind() != ErrorKind::AddrInUse => {
            trace!("IPv6 check skipped for port {port}: {e}");
            Ok(())
        }
        result => result,
    }
}

fn try_bind_v6(port: u16) -> IoResult<()> {
    let socket = TcpSocket::new_v6()?;
    socket.bind(SocketAddr::from((Ipv6Addr::UNSPECIFIED, port)))?;
    drop(socket.listen(1)?);
    Ok(())
}

/// PIDs of processes listening on `port`, as reported by the OS socket table.
///
/// Diagnostic only: query failures yield an empty list.
pub(crate) fn listening_pids(port: u16) -> Vec<u32> {
    let sockets = match get_sockets_info(
        AddressFamilyFlags::IPV4 | AddressFamilyFlags::IPV6,
        ProtocolFlags::TCP,
    ) {
        Ok(sockets) => sockets,
        Err(e) => {
            trace!("Socket table query failed: {e}");
            return Vec::new();
        }
    };

    let mut pids = Vec::new();
    for s in sockets {
        if let ProtocolSocketInfo::Tcp(tcp) = s.protocol_socket_info
            && tcp.state == TcpState::Listen
            && tcp.local_port == port
        {
            for pid in s.associated_pids {
                if !pids.contains(&pid) {
                    pids.push(pid);
                }
            }
        }
    }
    pids
}

fn describe_listeners(port: u16) -> String {
    let pids = listening_pids(port);
    if pids.is_empty() {
        String::new()
    } else {
        let joined = pids
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!(" (held by PID {joined})")
    }
}
