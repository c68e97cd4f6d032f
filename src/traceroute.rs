//! Core traceroute functionality and utilities

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod result;
pub mod types;

use ipnet::{Ipv4Net, Ipv6Net};
use once_cell::sync::Lazy;
use std::net::{IpAddr, Ipv4Addr};

// Re-export commonly used types
pub use api::{trace, trace_hops, trace_with_enricher};
pub use config::{TracerouteConfig, TracerouteConfigBuilder};
pub use engine::TracerouteEngine;
pub use error::TracerouteError;
pub use result::TracerouteResult;
pub use types::{Hop, LOCAL_NETWORK};

/// IPv4 ranges that never leave the local network or are reserved for
/// documentation
static NON_PUBLIC_V4: Lazy<Vec<Ipv4Net>> = Lazy::new(|| {
    [
        "192.0.2.0/24",
        "198.51.100.0/24",
        "203.0.113.0/24",
        "0.0.0.0/8",
    ]
    .iter()
    .filter_map(|cidr| cidr.parse().ok())
    .collect()
});

/// IPv6 unique-local, link-local and documentation ranges
static NON_PUBLIC_V6: Lazy<Vec<Ipv6Net>> = Lazy::new(|| {
    ["fc00::/7", "fe80::/10", "2001:db8::/32"]
        .iter()
        .filter_map(|cidr| cidr.parse().ok())
        .collect()
});

/// Checks if an IP address is within private/internal ranges.
pub fn is_internal_ip(ip: &Ipv4Addr) -> bool {
    ip.is_private() || ip.is_loopback() || ip.is_link_local()
}

/// Checks if an IP is in the CGNAT range (100.64.0.0/10).
pub fn is_cgnat(ip: &Ipv4Addr) -> bool {
    let octets = ip.octets();
    octets[0] == 100 && (64..=127).contains(&octets[1])
}

/// Whether `ip` is worth geolocating
pub fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(is_internal_ip(&v4)
                || is_cgnat(&v4)
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_multicast()
                || NON_PUBLIC_V4.iter().any(|net| net.contains(&v4)))
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_public_ip(IpAddr::V4(mapped));
            }
            !(v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_multicast()
                || NON_PUBLIC_V6.iter().any(|net| net.contains(&v6)))
        }
    }
}
