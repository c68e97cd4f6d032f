//! Reverse DNS lookup functionality

use crate::dns::SystemResolver;
use std::net::IpAddr;
use std::time::Duration;

/// Error type for reverse DNS operations
#[derive(Debug, thiserror::Error)]
pub enum ReverseDnsError {
    /// DNS resolution failed
    #[error("DNS resolution failed: {0}")]
    ResolutionError(String),

    /// No PTR record found
    #[error("No PTR record found")]
    NotFound,
}

/// Perform reverse DNS lookup for an IP address.
///
/// A PTR name that merely repeats the address is treated as no name.
pub fn reverse_dns_lookup(
    resolver: &SystemResolver,
    ip: IpAddr,
    window: Duration,
) -> Result<String, ReverseDnsError> {
    let name = resolver
        .reverse(ip, window)
        .map_err(|e| ReverseDnsError::ResolutionError(e.to_string()))?
        .ok_or(ReverseDnsError::NotFound)?;

    useful_hostname(ip, name).ok_or(ReverseDnsError::NotFound)
}

/// Drop empty names and names equal to the address text
pub(crate) fn useful_hostname(ip: IpAddr, name: String) -> Option<String> {
    let name = name.trim().trim_end_matches('.').to_string();
    if name.is_empty() || name == ip.to_string() {
        None
    } else {
        Some(name)
    }
}
