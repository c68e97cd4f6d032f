//! WHOIS client with referral following

use super::referral::find_referral;
use super::servers::{format_query, initial_server};
use super::WhoisError;
use crate::config::timing;
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// Well-known WHOIS port
pub const WHOIS_PORT: u16 = 43;
/// Referrals followed after the first server
pub const DEFAULT_MAX_REFERRALS: usize = 5;

/// One request/response exchange with a WHOIS server
pub trait WhoisTransport {
    /// Send `query` to `server` and return every byte it sends back
    fn exchange(&self, server: &str, query: &str) -> Result<Vec<u8>, WhoisError>;
}

/// TCP transport: connect, send, read until the server closes
#[derive(Debug, Clone)]
pub struct TcpTransport {
    port: u16,
    timeout: Duration,
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(WHOIS_PORT, timing::whois_timeout())
    }
}

impl TcpTransport {
    /// Transport on `port` with an overall `timeout` per exchange
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    /// Resolve `server` on a helper thread, giving up at `deadline`
    fn resolve(&self, server: &str, deadline: Instant) -> Result<Vec<SocketAddr>, WhoisError> {
        let left = remaining(deadline).ok_or_else(|| WhoisError::Timeout(server.to_string()))?;
        let (tx, rx) = mpsc::channel();
        let host = server.to_string();
        let port = self.port;
        thread::spawn(move || {
            let addrs = (host.as_str(), port)
                .to_socket_addrs()
                .map(|addrs| addrs.collect::<Vec<SocketAddr>>());
            // The receiver is gone once the deadline passed
            let _ = tx.send(addrs);
        });

        match rx.recv_timeout(left) {
            Ok(Ok(addrs)) => Ok(addrs),
            Ok(Err(e)) => Err(WhoisError::Connect {
                server: server.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => {
                tracing::debug!(server, "WHOIS server name lookup outlasted the deadline");
                Err(WhoisError::Timeout(server.to_string()))
            }
        }
    }

    fn connect(&self, server: &str, deadline: Instant) -> Result<TcpStream, WhoisError> {
        let addrs = self.resolve(server, deadline)?;

        let mut last_error = format!("no address for {server}");
        for addr in addrs {
            let remaining = remaining(deadline).ok_or_else(|| WhoisError::Timeout(server.to_string()))?;
            match TcpStream::connect_timeout(&addr, remaining) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    tracing::debug!(%addr, error = %e, "WHOIS connect attempt failed");
                    last_error = e.to_string();
                }
            }
        }
        Err(WhoisError::Connect {
            server: server.to_string(),
            reason: last_error,
        })
    }
}

impl WhoisTransport for TcpTransport {
    fn exchange(&self, server: &str, query: &str) -> Result<Vec<u8>, WhoisError> {
        let deadline = Instant::now() + self.timeout;
        let mut stream = self.connect(server, deadline)?;

        stream.set_write_timeout(remaining(deadline))?;
        stream.write_all(query.as_bytes())?;

        let mut response = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let Some(left) = remaining(deadline) else {
                break;
            };
            stream.set_read_timeout(Some(left))?;
            match stream.read(&mut chunk) {
                Ok(0) => return Ok(response),
                Ok(n) => response.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => break,
                Err(e) => return Err(e.into()),
            }
        }

        if response.is_empty() {
            Err(WhoisError::Timeout(server.to_string()))
        } else {
            tracing::debug!(server, bytes = response.len(), "WHOIS deadline hit, keeping partial response");
            Ok(response)
        }
    }
}

fn remaining(deadline: Instant) -> Option<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    (!left.is_zero()).then_some(left)
}

/// Decode a response as UTF-8, falling back to Latin-1
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        // Latin-1: each byte is its own code point
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Final answer of a WHOIS query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhoisResponse {
    /// Server that produced `text`
    pub server: String,
    /// Response text of the last server in the chain
    pub text: String,
    /// Number of lines in `text`
    pub line_count: usize,
    /// Every server queried, in order
    pub chain: Vec<String>,
}

/// WHOIS client
pub struct WhoisClient<T: WhoisTransport = TcpTransport> {
    transport: T,
    max_referrals: usize,
}

impl WhoisClient<TcpTransport> {
    /// Client over TCP port 43 with the configured timeout
    pub fn new() -> Self {
        Self::with_transport(TcpTransport::default())
    }
}

impl Default for WhoisClient<TcpTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: WhoisTransport> WhoisClient<T> {
    /// Client over a specific transport
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            max_referrals: DEFAULT_MAX_REFERRALS,
        }
    }

    /// Change the referral cap
    pub fn max_referrals(mut self, max_referrals: usize) -> Self {
        self.max_referrals = max_referrals;
        self
    }

    /// Query the server responsible for `target`, following referrals
    pub fn query(&self, target: &str) -> Result<WhoisResponse, WhoisError> {
        self.query_server(initial_server(target), target)
    }

    /// Query starting at a specific server.
    ///
    /// Referrals to a different server are followed up to the referral
    /// cap. If a referral server fails, the previous answer is returned.
    pub fn query_server(&self, server: &str, target: &str) -> Result<WhoisResponse, WhoisError> {
        let mut server = server.to_string();
        let mut chain = Vec::new();
        let mut last_good: Option<(String, String)> = None;

        loop {
            chain.push(server.clone());
            let text = match self.exchange_text(&server, target) {
                Ok(text) => text,
                Err(e) if last_good.is_some() => {
                    tracing::warn!(server = %server, error = %e, "WHOIS referral failed, keeping previous answer");
                    break;
                }
                Err(e) => return Err(e),
            };

            let referral = find_referral(&text).filter(|next| !next.eq_ignore_ascii_case(&server));
            last_good = Some((server.clone(), text));

            match referral {
                Some(next) if chain.len() <= self.max_referrals => {
                    tracing::debug!(from = %server, to = %next, "following WHOIS referral");
                    server = next;
                }
                Some(next) => {
                    tracing::warn!(
                        skipped = %next,
                        max = self.max_referrals,
                        "WHOIS referral limit reached"
                    );
                    break;
                }
                None => break,
            }
        }

        let (server, text) = last_good.ok_or(WhoisError::EmptyResponse(server))?;
        Ok(WhoisResponse {
            line_count: text.lines().count(),
            server,
            text,
            chain,
        })
    }

    fn exchange_text(&self, server: &str, target: &str) -> Result<String, WhoisError> {
        let query = format_query(server, target);
        tracing::debug!(server, query = query.trim_end(), "WHOIS query");
        let bytes = self.transport.exchange(server, &query)?;
        if bytes.is_empty() {
            return Err(WhoisError::EmptyResponse(server.to_string()));
        }
        Ok(decode_text(&bytes))
    }
}
