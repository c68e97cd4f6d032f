//! ICMP echo probing (ping)
//!
//! One call sends one echo request and waits for the matching reply. There
//! are no retries: callers that want a series call [`ping`] repeatedly and
//! summarise the samples with [`PingStats`].

use crate::resolve::{resolve_target, ResolveError};
use crate::socket::factory::create_probe_socket;
use crate::socket::{ProbeError, ProbeSocket};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Error type for a single echo probe
#[derive(Debug, thiserror::Error)]
pub enum PingError {
    /// Target could not be resolved
    #[error(transparent)]
    Resolution(#[from] ResolveError),

    /// Socket creation, send or receive failed
    #[error(transparent)]
    Socket(#[from] ProbeError),

    /// No matching reply arrived in time
    #[error("No reply from {0} within the timeout")]
    Timeout(IpAddr),
}

/// Outcome of one echo probe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EchoResult {
    /// Address that was probed, if the target resolved
    pub target: Option<IpAddr>,
    /// Round-trip time in milliseconds, absent on timeout or error
    pub rtt_ms: Option<f64>,
}

impl EchoResult {
    /// Result carrying no reply
    pub fn lost(target: Option<IpAddr>) -> Self {
        Self {
            target,
            rtt_ms: None,
        }
    }

    /// Whether a reply was received
    pub fn is_reply(&self) -> bool {
        self.rtt_ms.is_some()
    }
}

/// Probe `target` once, collapsing every failure into an absent RTT.
pub fn ping(target: &str, timeout: Duration) -> EchoResult {
    let ip = match resolve_target(target) {
        Ok(ip) => ip,
        Err(e) => {
            tracing::debug!(target, error = %e, "ping target did not resolve");
            return EchoResult::lost(None);
        }
    };

    match try_ping_ip(ip, timeout) {
        Ok(rtt) => EchoResult {
            target: Some(ip),
            rtt_ms: Some(duration_ms(rtt)),
        },
        Err(e) => {
            tracing::debug!(%ip, error = %e, "ping failed");
            EchoResult::lost(Some(ip))
        }
    }
}

/// Probe `target` once, reporting why no reply was obtained.
pub fn try_ping(target: &str, timeout: Duration) -> Result<Duration, PingError> {
    try_ping_ip(resolve_target(target)?, timeout)
}

fn try_ping_ip(ip: IpAddr, timeout: Duration) -> Result<Duration, PingError> {
    let socket = create_probe_socket(ip)?;
    ping_with_socket(socket.as_ref(), ip, rand::random::<u16>(), timeout)
}

/// Send one echo request on an existing socket and wait for its reply
pub fn ping_with_socket(
    socket: &dyn ProbeSocket,
    target: IpAddr,
    sequence: u16,
    timeout: Duration,
) -> Result<Duration, PingError> {
    let probe = socket.send_probe(target, sequence)?;
    match socket.recv_response(&probe, timeout)? {
        Some(response) => Ok(response.rtt),
        None => Err(PingError::Timeout(target)),
    }
}

/// Summary of a series of echo probes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingStats {
    /// Probes sent
    pub sent: usize,
    /// Replies received
    pub received: usize,
    /// Lost probes as a percentage of sent
    pub loss_percent: f64,
    /// Fastest reply in milliseconds
    pub min_ms: Option<f64>,
    /// Mean reply time in milliseconds
    pub avg_ms: Option<f64>,
    /// Slowest reply in milliseconds
    pub max_ms: Option<f64>,
}

impl PingStats {
    /// Summarise a series of results
    pub fn from_results(results: &[EchoResult]) -> Self {
        let samples: Vec<f64> = results.iter().filter_map(|r| r.rtt_ms).collect();
        let sent = results.len();
        let received = samples.len();

        let loss_percent = if sent == 0 {
            0.0
        } else {
            (sent - received) as f64 * 100.0 / sent as f64
        };

        let (min_ms, avg_ms, max_ms) = if samples.is_empty() {
            (None, None, None)
        } else {
            let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
            let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let avg = samples.iter().sum::<f64>() / received as f64;
            (Some(min), Some(avg), Some(max))
        };

        Self {
            sent,
            received,
            loss_percent,
            min_ms,
            avg_ms,
            max_ms,
        }
    }
}

pub(crate) fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
