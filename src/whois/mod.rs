//! WHOIS over TCP port 43
//!
//! The first server is chosen from the target (IP registry for addresses,
//! a TLD table for names, IANA otherwise). Referrals in a response are
//! followed to a different server, at most [`DEFAULT_MAX_REFERRALS`] times.

pub mod client;
pub mod referral;
pub mod servers;

pub use client::{
    decode_text, TcpTransport, WhoisClient, WhoisResponse, WhoisTransport, DEFAULT_MAX_REFERRALS,
    WHOIS_PORT,
};
pub use referral::find_referral;
pub use servers::{format_query, initial_server};

/// Error type for WHOIS queries
#[derive(Debug, thiserror::Error)]
pub enum WhoisError {
    /// Server name did not resolve or no address accepted the connection
    #[error("Failed to connect to {server}: {reason}")]
    Connect {
        /// Server that was tried
        server: String,
        /// Last failure seen
        reason: String,
    },

    /// Sending or receiving failed
    #[error("WHOIS I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Nothing arrived before the deadline
    #[error("No response from {0} within the timeout")]
    Timeout(String),

    /// The server closed the connection without sending anything
    #[error("Empty response from {0}")]
    EmptyResponse(String),
}
