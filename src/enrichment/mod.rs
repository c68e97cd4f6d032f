//! Enrichment services for traceroute hops
//!
//! Reverse DNS and geolocation sit behind [`HopEnricher`] so the engine can
//! be driven by scripted enrichers in tests.

pub mod geo;
pub mod rdns;

pub use geo::{GeoError, GeoLocation, Geolocator};
pub use rdns::{reverse_dns_lookup, ReverseDnsError};

use crate::config::timing;
use crate::dns::SystemResolver;
use std::net::IpAddr;
use std::time::Duration;

/// Best-effort per-hop lookups. Failures are `None`.
pub trait HopEnricher: Send {
    /// Hostname for `ip`
    fn reverse_dns(&self, ip: IpAddr) -> Option<String>;

    /// Location of `ip`
    fn geolocate(&self, ip: IpAddr) -> Option<GeoLocation>;
}

/// Enricher that never finds anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEnrichment;

impl HopEnricher for NoEnrichment {
    fn reverse_dns(&self, _ip: IpAddr) -> Option<String> {
        None
    }

    fn geolocate(&self, _ip: IpAddr) -> Option<GeoLocation> {
        None
    }
}

/// Enricher backed by the system resolver and the geolocation service
pub struct NetworkEnricher {
    resolver: Option<SystemResolver>,
    geolocator: Option<Geolocator>,
    rdns_window: Duration,
}

impl NetworkEnricher {
    /// Build the enabled lookups. A lookup whose client cannot be
    /// constructed is disabled rather than failing the trace.
    pub fn new(enable_rdns: bool, enable_geolocation: bool) -> Self {
        let resolver = if enable_rdns {
            SystemResolver::new()
                .inspect_err(|e| tracing::warn!(error = %e, "reverse DNS disabled"))
                .ok()
        } else {
            None
        };
        let geolocator = if enable_geolocation {
            Geolocator::new()
                .inspect_err(|e| tracing::warn!(error = %e, "geolocation disabled"))
                .ok()
        } else {
            None
        };

        Self {
            resolver,
            geolocator,
            rdns_window: timing::dns_system_window(),
        }
    }
}

impl HopEnricher for NetworkEnricher {
    fn reverse_dns(&self, ip: IpAddr) -> Option<String> {
        let resolver = self.resolver.as_ref()?;
        reverse_dns_lookup(resolver, ip, self.rdns_window)
            .inspect_err(|e| tracing::debug!(%ip, error = %e, "reverse DNS failed"))
            .ok()
    }

    fn geolocate(&self, ip: IpAddr) -> Option<GeoLocation> {
        let geolocator = self.geolocator.as_ref()?;
        geolocator
            .locate(ip)
            .inspect_err(|e| tracing::debug!(%ip, error = %e, "geolocation failed"))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_disabled_enricher_finds_nothing() {
        let enricher = NetworkEnricher::new(false, false);
        let ip = IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8));
        assert_eq!(enricher.reverse_dns(ip), None);
        assert_eq!(enricher.geolocate(ip), None);
        assert_eq!(NoEnrichment.reverse_dns(ip), None);
        assert_eq!(NoEnrichment.geolocate(ip), None);
    }
}
