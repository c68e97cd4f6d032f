//! Result types for traceroute operations

use crate::enrichment::GeoLocation;
use crate::traceroute::types::Hop;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Result of a traceroute operation
///
/// # Examples
///
/// ```no_run
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = netdiag::TracerouteConfig::default();
/// let result = netdiag::trace("example.com", &config, |_| {}, |_| {})?;
///
/// println!("Reached destination: {}", result.destination_reached);
/// for hop in &result.hops {
///     println!("{:>2} {}", hop.index(), hop.address_string());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracerouteResult {
    /// Target as provided
    pub target: String,
    /// Resolved target IP address
    pub target_ip: IpAddr,
    /// Hops in TTL order
    pub hops: Vec<Hop>,
    /// Whether the destination answered
    pub destination_reached: bool,
    /// Location of the tracing host, when geolocation is enabled
    pub origin: Option<GeoLocation>,
    /// Total duration of the traceroute operation
    pub total_duration: std::time::Duration,
}

impl TracerouteResult {
    /// Get the number of hops discovered
    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }

    /// The hop at which the destination answered, if any
    pub fn destination_hop(&self) -> Option<&Hop> {
        self.hops.iter().find(|hop| hop.is_destination(self.target_ip))
    }

    /// Hops with a geolocation
    pub fn located_hops(&self) -> Vec<&Hop> {
        self.hops.iter().filter(|h| h.geo.is_some()).collect()
    }

    /// Calculate average RTT across all responding hops
    pub fn average_rtt_ms(&self) -> Option<f64> {
        let rtts: Vec<f64> = self.hops.iter().filter_map(Hop::rtt_ms).collect();

        if rtts.is_empty() {
            None
        } else {
            Some(rtts.iter().sum::<f64>() / rtts.len() as f64)
        }
    }
}
