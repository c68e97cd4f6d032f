//! Core traceroute engine implementation
//!
//! Hops are probed strictly in order. Each TTL gets `probes_per_hop` echo
//! requests, each waited for before the next is sent; the hop is then
//! reported, enriched and reported again before the next TTL starts.

use crate::enrichment::HopEnricher;
use crate::socket::ProbeSocket;
use crate::traceroute::types::{average, Hop, LOCAL_NETWORK};
use crate::traceroute::{is_public_ip, TracerouteConfig, TracerouteError};
use std::net::IpAddr;
use std::time::Duration;

/// Sequential TTL-stepping traceroute engine
pub struct TracerouteEngine {
    config: TracerouteConfig,
    socket: Box<dyn ProbeSocket>,
    enricher: Box<dyn HopEnricher>,
}

impl TracerouteEngine {
    /// Create an engine, validating the configuration
    pub fn new(
        config: TracerouteConfig,
        socket: Box<dyn ProbeSocket>,
        enricher: Box<dyn HopEnricher>,
    ) -> Result<Self, TracerouteError> {
        config.validate().map_err(TracerouteError::ConfigError)?;
        Ok(Self {
            config,
            socket,
            enricher,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &TracerouteConfig {
        &self.config
    }

    /// Trace the path to `target`.
    ///
    /// `progress` receives every hop as soon as its probes finish. `geo`
    /// receives each responding hop again once reverse DNS and geolocation
    /// have been applied. Both are called in increasing hop order.
    ///
    /// Stops after the hop whose responder is `target`, or after
    /// `max_hops`.
    pub fn run<P, G>(
        &self,
        target: IpAddr,
        mut progress: P,
        mut geo: G,
    ) -> Result<Vec<Hop>, TracerouteError>
    where
        P: FnMut(&Hop),
        G: FnMut(&Hop),
    {
        if self.socket.ip_version() != crate::socket::IpVersion::of(target) {
            return Err(TracerouteError::SocketError(format!(
                "{target} does not match the {:?} probe socket",
                self.socket.ip_version()
            )));
        }

        let mut hops = Vec::new();
        for ttl in self.config.start_ttl..=self.config.max_hops {
            let mut hop = self.probe_hop(target, ttl)?;
            progress(&hop);

            if let Some(addr) = hop.addr {
                self.enrich(&mut hop, addr);
                geo(&hop);
            }

            let reached = hop.is_destination(target);
            hops.push(hop);
            if reached {
                tracing::debug!(ttl, %target, "destination reached");
                break;
            }
        }
        Ok(hops)
    }

    /// Send every probe for one TTL and collect the replies
    fn probe_hop(&self, target: IpAddr, ttl: u8) -> Result<Hop, TracerouteError> {
        self.socket.set_ttl(ttl)?;

        let probes = self.config.probes_per_hop;
        let mut hop = Hop::new(ttl, probes);
        let mut samples: Vec<Duration> = Vec::with_capacity(usize::from(probes));

        for index in 0..probes {
            let sequence = probe_sequence(ttl, probes, index);
            let probe = match self.socket.send_probe(target, sequence) {
                Ok(probe) => probe,
                Err(e) => {
                    tracing::debug!(ttl, sequence, error = %e, "probe send failed");
                    continue;
                }
            };

            match self.socket.recv_response(&probe, self.config.probe_timeout) {
                Ok(Some(response)) => {
                    tracing::trace!(
                        ttl,
                        sequence,
                        from = %response.from_addr,
                        kind = ?response.response_type,
                        "probe answered"
                    );
                    // The destination wins over a router answering at the same TTL
                    if hop.addr.is_none() || response.from_addr == target {
                        hop.addr = Some(response.from_addr);
                    }
                    samples.push(response.rtt);
                }
                Ok(None) => tracing::trace!(ttl, sequence, "probe timed out"),
                Err(e) => tracing::debug!(ttl, sequence, error = %e, "probe receive failed"),
            }
        }

        hop.replies = samples.len() as u8;
        hop.rtt = average(&samples);
        Ok(hop)
    }

    fn enrich(&self, hop: &mut Hop, addr: IpAddr) {
        if self.config.enable_rdns {
            hop.hostname = self
                .enricher
                .reverse_dns(addr)
                .filter(|name| *name != addr.to_string());
        }

        if !is_public_ip(addr) {
            hop.location = Some(LOCAL_NETWORK.to_string());
        } else if self.config.enable_geolocation {
            hop.geo = self.enricher.geolocate(addr);
            hop.location = hop.geo.as_ref().map(|g| g.location_string());
        }
    }
}

/// Sequence number for probe `index` at `ttl`
pub(crate) fn probe_sequence(ttl: u8, probes_per_hop: u8, index: u8) -> u16 {
    u16::from(ttl) * u16::from(probes_per_hop) + u16::from(index)
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod engine_tests;
