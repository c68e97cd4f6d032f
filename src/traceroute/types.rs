//! Core types for traceroute operations

use crate::enrichment::GeoLocation;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Location shown for hops that are not publicly routable
pub const LOCAL_NETWORK: &str = "local network";
/// Responder shown for hops where nothing answered
pub const TIMEOUT_SENTINEL: &str = "timeout";

/// One TTL step of a trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hop {
    index: u8,
    /// Address that answered, absent on timeout
    pub addr: Option<IpAddr>,
    /// Average round-trip time over the replies at this TTL
    pub rtt: Option<Duration>,
    /// Probes that got a reply
    pub replies: u8,
    /// Probes sent
    pub probes: u8,
    /// Reverse DNS name
    pub hostname: Option<String>,
    /// Place description ("City, Country" or "local network")
    pub location: Option<String>,
    /// Geolocation details for public hops
    pub geo: Option<GeoLocation>,
}

impl Hop {
    /// Hop with nothing but its index
    pub fn new(index: u8, probes: u8) -> Self {
        Self {
            index,
            addr: None,
            rtt: None,
            replies: 0,
            probes,
            hostname: None,
            location: None,
            geo: None,
        }
    }

    /// Hop index (the TTL it was probed with)
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Whether nothing answered at this TTL
    pub fn is_timeout(&self) -> bool {
        self.addr.is_none()
    }

    /// Responder address, or "timeout"
    pub fn address_string(&self) -> String {
        self.addr
            .map_or_else(|| TIMEOUT_SENTINEL.to_string(), |ip| ip.to_string())
    }

    /// Average RTT in milliseconds
    pub fn rtt_ms(&self) -> Option<f64> {
        self.rtt.map(crate::ping::duration_ms)
    }

    /// Check if this hop reached the destination
    pub fn is_destination(&self, target: IpAddr) -> bool {
        self.addr == Some(target)
    }
}

/// Mean of the samples, absent when there are none
pub(crate) fn average(samples: &[Duration]) -> Option<Duration> {
    if samples.is_empty() {
        return None;
    }
    let total: Duration = samples.iter().sum();
    Some(total / samples.len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_timeout_hop() {
        let hop = Hop::new(7, 2);
        assert_eq!(hop.index(), 7);
        assert!(hop.is_timeout());
        assert_eq!(hop.address_string(), "timeout");
        assert_eq!(hop.rtt_ms(), None);
    }

    #[test]
    fn test_responding_hop() {
        let target = IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8));
        let mut hop = Hop::new(10, 2);
        hop.addr = Some(target);
        hop.rtt = Some(Duration::from_millis(25));

        assert_eq!(hop.address_string(), "8.8.8.8");
        assert_eq!(hop.rtt_ms(), Some(25.0));
        assert!(hop.is_destination(target));
        assert!(!hop.is_destination(IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1))));
    }

    #[test]
    fn test_average() {
        assert_eq!(average(&[]), None);
        assert_eq!(
            average(&[Duration::from_millis(10), Duration::from_millis(30)]),
            Some(Duration::from_millis(20))
        );
    }
}
