//! Target resolution shared by ping, traceroute and the DNS server argument

use std::net::{IpAddr, ToSocketAddrs};

/// Error type for target resolution
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The lookup succeeded but yielded no address
    #[error("No address found for {0}")]
    NoAddress(String),

    /// The platform resolver failed
    #[error("Failed to resolve {host}: {source}")]
    Lookup {
        /// Host that was looked up
        host: String,
        /// Underlying resolver error
        source: std::io::Error,
    },
}

/// Resolve a hostname or IP literal to a single address.
///
/// Literals (including bracketed IPv6) are returned as-is. Hostnames go
/// through the platform resolver and the first IPv4 address wins; IPv6 is
/// used only when no IPv4 address exists.
pub fn resolve_target(target: &str) -> Result<IpAddr, ResolveError> {
    let trimmed = target.trim().trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = trimmed.parse::<IpAddr>() {
        return Ok(ip);
    }

    let addrs: Vec<IpAddr> = (trimmed, 0)
        .to_socket_addrs()
        .map_err(|source| ResolveError::Lookup {
            host: trimmed.to_string(),
            source,
        })?
        .map(|addr| addr.ip())
        .collect();

    pick_preferred(&addrs).ok_or_else(|| ResolveError::NoAddress(trimmed.to_string()))
}

/// First IPv4 address, else the first address of any family
pub fn pick_preferred(addrs: &[IpAddr]) -> Option<IpAddr> {
    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_literals_pass_through() {
        assert_eq!(
            resolve_target("192.0.2.7").unwrap(),
            IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7))
        );
        assert_eq!(resolve_target("::1").unwrap(), IpAddr::V6(Ipv6Addr::LOCALHOST));
        assert_eq!(resolve_target("[::1]").unwrap(), IpAddr::V6(Ipv6Addr::LOCALHOST));
        assert_eq!(
            resolve_target("  10.0.0.1 ").unwrap(),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))
        );
    }

    #[test]
    fn test_ipv4_preferred() {
        let addrs = vec![
            IpAddr::V6(Ipv6Addr::LOCALHOST),
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
        ];
        assert_eq!(pick_preferred(&addrs), Some(IpAddr::V4(Ipv4Addr::LOCALHOST)));
    }

    #[test]
    fn test_ipv6_only() {
        let addrs = vec![IpAddr::V6(Ipv6Addr::LOCALHOST)];
        assert_eq!(pick_preferred(&addrs), Some(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert_eq!(pick_preferred(&[]), None);
    }

    #[test]
    fn test_invalid_host_fails() {
        assert!(resolve_target("no-such-host.invalid").is_err());
    }
}
