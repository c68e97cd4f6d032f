//! Socket abstraction layer for ICMP echo probing
//!
//! Ping and traceroute both talk to the network through [`ProbeSocket`], so
//! the engines can be driven by a scripted socket in tests.

use serde::{Deserialize, Serialize};
use std::io;
use std::net::IpAddr;
use std::time::{Duration, Instant};

#[cfg(target_os = "linux")]
mod errqueue;
pub mod factory;
pub mod icmp;

/// IP version of a probe socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IpVersion {
    /// IPv4 addressing
    V4,
    /// IPv6 addressing
    V6,
}

impl IpVersion {
    /// Version matching the given address
    pub fn of(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            IpVersion::V4 => "ICMP IPv4",
            IpVersion::V6 => "ICMPv6 IPv6",
        }
    }
}

/// Errors raised by the probe socket layer
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Socket creation failed
    #[error("Failed to create socket: {0}")]
    Socket(#[source] io::Error),

    /// Setting a socket option (TTL, hop limit, timeout) failed
    #[error("Failed to set {option}: {source}")]
    SetOption {
        /// Name of the option being set
        option: &'static str,
        /// Underlying OS error
        source: io::Error,
    },

    /// Sending the echo request failed
    #[error("Failed to send probe: {0}")]
    Send(#[source] io::Error),

    /// Receiving failed for a reason other than timeout
    #[error("Failed to receive reply: {0}")]
    Receive(#[source] io::Error),

    /// Target address family differs from the socket's
    #[error("{target} cannot be probed from a {socket:?} socket")]
    AddressFamilyMismatch {
        /// Address that was probed
        target: IpAddr,
        /// Family of the socket
        socket: IpVersion,
    },
}

/// Information about a sent probe
#[derive(Debug, Clone)]
pub struct ProbeInfo {
    /// Address the echo request was sent to
    pub target: IpAddr,
    /// ICMP sequence number written into the request
    pub sequence: u16,
    /// When the probe left the socket
    pub sent_at: Instant,
}

/// Type of response received
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseType {
    /// Echo Reply from the probed host
    EchoReply,
    /// Time Exceeded (TTL expired in transit)
    TimeExceeded,
    /// Destination Unreachable, with ICMP code
    DestinationUnreachable(u8),
}

/// Response matched to a sent probe
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    /// Address that sent the response
    pub from_addr: IpAddr,
    /// Type of response
    pub response_type: ResponseType,
    /// Sequence number of the probe that triggered this response
    pub sequence: u16,
    /// Round-trip time
    pub rtt: Duration,
}

/// Trait for ICMP probe sockets
pub trait ProbeSocket: Send + Sync {
    /// IP version this socket speaks
    fn ip_version(&self) -> IpVersion;

    /// Set the TTL (IPv4) or unicast hop limit (IPv6) for outgoing packets
    fn set_ttl(&self, ttl: u8) -> Result<(), ProbeError>;

    /// Send one echo request carrying `sequence` to `target`
    fn send_probe(&self, target: IpAddr, sequence: u16) -> Result<ProbeInfo, ProbeError>;

    /// Block until a reply matching `probe` arrives or `timeout` elapses.
    ///
    /// Returns `Ok(None)` on timeout.
    fn recv_response(
        &self,
        probe: &ProbeInfo,
        timeout: Duration,
    ) -> Result<Option<ProbeResponse>, ProbeError>;
}
