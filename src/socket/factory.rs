//! Factory for creating probe sockets

use super::icmp::DgramIcmpSocket;
use super::{IpVersion, ProbeError, ProbeSocket};
use std::net::IpAddr;

/// Create an unprivileged ICMP probe socket matching `target`'s family.
///
/// # Platform notes
///
/// - **macOS**: datagram ICMP sockets work without root and deliver Time
///   Exceeded errors, so both ping and traceroute work.
/// - **Linux**: requires the caller's group to be inside
///   `net.ipv4.ping_group_range`. Time Exceeded and Destination Unreachable
///   arrive on the socket error queue (`IP_RECVERR`), which the socket
///   drains while waiting for a reply.
pub fn create_probe_socket(target: IpAddr) -> Result<Box<dyn ProbeSocket>, ProbeError> {
    let version = IpVersion::of(target);
    let socket = DgramIcmpSocket::new(version)?;
    tracing::debug!(mode = version.description(), %target, "created datagram probe socket");
    Ok(Box::new(socket))
}
