//! DNS query orchestration
//!
//! With an explicit server a single UDP round trip is made using the raw
//! codec: no retries, no TCP fallback, no TC-bit handling. Without one the
//! system resolver answers within a fixed window.

use super::codec::{decode_response, encode_query, transaction_id, Header};
use super::record::{DnsRecord, RecordType};
use super::system::SystemResolver;
use super::DnsError;
use crate::config::timing;
use crate::resolve::resolve_target;
use once_cell::sync::OnceCell;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

/// Standard DNS port
pub const DNS_PORT: u16 = 53;
/// Largest UDP response read without EDNS
const MAX_UDP_RESPONSE: usize = 4096;

/// Anything that can answer a single-type query
pub trait RecordLookup {
    /// Records of `record_type` for `domain`, optionally from `server`
    fn query(
        &self,
        domain: &str,
        record_type: RecordType,
        server: Option<&str>,
    ) -> Result<Vec<DnsRecord>, DnsError>;
}

/// Resolver for single-type queries
pub struct DnsResolver {
    timeout: Duration,
    system_window: Duration,
    system: OnceCell<SystemResolver>,
}

impl Default for DnsResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DnsResolver {
    /// Resolver with the configured default timeouts
    pub fn new() -> Self {
        Self::with_timeouts(timing::dns_timeout(), timing::dns_system_window())
    }

    /// Resolver with explicit UDP timeout and system-resolver window
    pub fn with_timeouts(timeout: Duration, system_window: Duration) -> Self {
        Self {
            timeout,
            system_window,
            system: OnceCell::new(),
        }
    }

    /// UDP receive timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn system(&self) -> Result<&SystemResolver, DnsError> {
        self.system.get_or_try_init(SystemResolver::new)
    }

    /// Query `server` directly over UDP
    pub fn query_server(
        &self,
        domain: &str,
        record_type: RecordType,
        server: SocketAddr,
    ) -> Result<Vec<DnsRecord>, DnsError> {
        let id = rand::random::<u16>();
        let query = encode_query(domain, record_type, id)?;

        let bind_addr = match server {
            SocketAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            SocketAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };
        let socket = UdpSocket::bind(bind_addr)?;
        socket.send_to(&query, server)?;
        tracing::debug!(%server, domain, %record_type, id, "sent DNS query");

        let deadline = Instant::now() + self.timeout;
        let mut buf = vec![0u8; MAX_UDP_RESPONSE];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(DnsError::Timeout(server.to_string()));
            }
            socket.set_read_timeout(Some(remaining))?;

            let (len, from) = match socket.recv_from(&mut buf) {
                Ok(received) => received,
                Err(e)
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    return Err(DnsError::Timeout(server.to_string()));
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            let response = &buf[..len];
            if from != server {
                tracing::trace!(%from, "ignoring datagram from unexpected source");
                continue;
            }
            if transaction_id(response) != Some(id) {
                tracing::trace!(?from, "ignoring response with foreign transaction ID");
                continue;
            }

            let records = decode_response(response, domain);
            let announced = Header::parse(response).map_or(0, |header| header.ancount);
            if records.is_empty() && announced > 0 {
                return Err(DnsError::Decode(format!(
                    "{announced} answers announced by {server}, none decodable"
                )));
            }
            tracing::debug!(%server, count = records.len(), "decoded DNS response");
            return Ok(records);
        }
    }
}

impl RecordLookup for DnsResolver {
    fn query(
        &self,
        domain: &str,
        record_type: RecordType,
        server: Option<&str>,
    ) -> Result<Vec<DnsRecord>, DnsError> {
        match server.map(str::trim).filter(|s| !s.is_empty()) {
            Some(server) => self.query_server(domain, record_type, parse_server(server)?),
            None => self.system()?.lookup(domain, record_type, self.system_window),
        }
    }
}

/// Parse an explicit server: `IP`, `IP:port`, `[IPv6]:port` or a hostname.
pub fn parse_server(server: &str) -> Result<SocketAddr, DnsError> {
    let server = server.trim();
    if let Ok(addr) = server.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = server
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
    {
        return Ok(SocketAddr::new(ip, DNS_PORT));
    }

    let (host, port) = match server.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => (
            host,
            port.parse::<u16>()
                .map_err(|_| DnsError::InvalidServer(server.to_string()))?,
        ),
        _ => (server, DNS_PORT),
    };
    let ip = resolve_target(host).map_err(|e| {
        tracing::debug!(error = %e, "DNS server name did not resolve");
        DnsError::InvalidServer(server.to_string())
    })?;
    Ok(SocketAddr::new(ip, port))
}
