//! Tests for the traceroute engine

use super::*;
use crate::enrichment::GeoLocation;
use crate::socket::{IpVersion, ProbeError, ProbeInfo, ProbeResponse, ResponseType};
use crate::traceroute::TracerouteConfigBuilder;
use std::cell::RefCell;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use std::time::Instant;

const TARGET: IpAddr = IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34));

/// Mock socket answering by sequence number
#[derive(Default)]
struct MockSocket {
    replies: HashMap<u16, (IpAddr, Duration)>,
    ttls: Arc<Mutex<Vec<u8>>>,
    sequences: Arc<Mutex<Vec<u16>>>,
}

impl MockSocket {
    fn reply(mut self, ttl: u8, index: u8, from: IpAddr, rtt_ms: u64) -> Self {
        self.replies.insert(
            probe_sequence(ttl, 2, index),
            (from, Duration::from_millis(rtt_ms)),
        );
        self
    }
}

impl ProbeSocket for MockSocket {
    fn ip_version(&self) -> IpVersion {
        IpVersion::V4
    }

    fn set_ttl(&self, ttl: u8) -> Result<(), ProbeError> {
        self.ttls.lock().unwrap().push(ttl);
        Ok(())
    }

    fn send_probe(&self, target: IpAddr, sequence: u16) -> Result<ProbeInfo, ProbeError> {
        self.sequences.lock().unwrap().push(sequence);
        Ok(ProbeInfo {
            target,
            sequence,
            sent_at: Instant::now(),
        })
    }

    fn recv_response(
        &self,
        probe: &ProbeInfo,
        _timeout: Duration,
    ) -> Result<Option<ProbeResponse>, ProbeError> {
        Ok(self
            .replies
            .get(&probe.sequence)
            .map(|&(from_addr, rtt)| ProbeResponse {
                from_addr,
                response_type: if from_addr == probe.target {
                    ResponseType::EchoReply
                } else {
                    ResponseType::TimeExceeded
                },
                sequence: probe.sequence,
                rtt,
            }))
    }
}

/// Mock enricher recording what it was asked
#[derive(Default)]
struct MockEnricher {
    names: HashMap<IpAddr, String>,
    rdns_calls: Arc<Mutex<Vec<IpAddr>>>,
    geo_calls: Arc<Mutex<Vec<IpAddr>>>,
}

impl HopEnricher for MockEnricher {
    fn reverse_dns(&self, ip: IpAddr) -> Option<String> {
        self.rdns_calls.lock().unwrap().push(ip);
        self.names.get(&ip).cloned()
    }

    fn geolocate(&self, ip: IpAddr) -> Option<GeoLocation> {
        self.geo_calls.lock().unwrap().push(ip);
        Some(GeoLocation {
            ip: Some(ip),
            latitude: 51.5,
            longitude: -0.1,
            city: Some("London".to_string()),
            country: Some("United Kingdom".to_string()),
            asn: Some(64500),
            isp: Some("Example Transit".to_string()),
        })
    }
}

fn ip(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(a, b, c, d))
}

fn config(max_hops: u8) -> TracerouteConfig {
    TracerouteConfigBuilder::new()
        .max_hops(max_hops)
        .probes_per_hop(2)
        .probe_timeout(Duration::from_millis(10))
        .build()
        .unwrap()
}

fn engine(socket: MockSocket, enricher: MockEnricher, max_hops: u8) -> TracerouteEngine {
    TracerouteEngine::new(config(max_hops), Box::new(socket), Box::new(enricher)).unwrap()
}

#[test]
fn test_all_timeouts_yield_max_hops_entries() {
    let engine = engine(MockSocket::default(), MockEnricher::default(), 7);
    let progress_count = RefCell::new(0);
    let geo_count = RefCell::new(0);

    let hops = engine
        .run(
            TARGET,
            |_| *progress_count.borrow_mut() += 1,
            |_| *geo_count.borrow_mut() += 1,
        )
        .unwrap();

    assert_eq!(hops.len(), 7);
    for (i, hop) in hops.iter().enumerate() {
        assert_eq!(usize::from(hop.index()), i + 1);
        assert!(hop.is_timeout());
        assert_eq!(hop.rtt, None);
        assert_eq!(hop.address_string(), "timeout");
        assert_eq!(hop.replies, 0);
    }
    assert_eq!(*progress_count.borrow(), 7);
    assert_eq!(*geo_count.borrow(), 0);
}

#[test]
fn test_stops_at_destination_after_timeouts() {
    let socket = MockSocket::default().reply(4, 0, TARGET, 12);
    let sequences = Arc::clone(&socket.sequences);
    let engine = engine(socket, MockEnricher::default(), 30);

    let hops = engine.run(TARGET, |_| {}, |_| {}).unwrap();

    assert_eq!(hops.len(), 4);
    assert!(hops[..3].iter().all(Hop::is_timeout));
    assert_eq!(hops[3].addr, Some(TARGET));
    assert_eq!(hops[3].index(), 4);
    // No probes beyond TTL 4
    assert_eq!(sequences.lock().unwrap().len(), 8);
}

#[test]
fn test_rtt_is_averaged_over_replies() {
    let router = ip(198, 51, 100, 1);
    let socket = MockSocket::default()
        .reply(1, 0, router, 10)
        .reply(1, 1, router, 30)
        .reply(2, 1, TARGET, 8);
    let engine = engine(socket, MockEnricher::default(), 30);

    let hops = engine.run(TARGET, |_| {}, |_| {}).unwrap();

    assert_eq!(hops.len(), 2);
    assert_eq!(hops[0].rtt, Some(Duration::from_millis(20)));
    assert_eq!(hops[0].replies, 2);
    assert_eq!(hops[0].probes, 2);
    assert_eq!(hops[1].rtt, Some(Duration::from_millis(8)));
    assert_eq!(hops[1].replies, 1);
}

#[test]
fn test_destination_reply_wins_over_router_at_same_ttl() {
    let router = ip(198, 51, 100, 9);
    let socket = MockSocket::default()
        .reply(1, 0, ip(192, 168, 1, 1), 1)
        .reply(2, 0, router, 12)
        .reply(2, 1, TARGET, 14);
    let sequences = Arc::clone(&socket.sequences);
    let engine = engine(socket, MockEnricher::default(), 30);

    let hops = engine.run(TARGET, |_| {}, |_| {}).unwrap();

    assert_eq!(hops.len(), 2);
    assert_eq!(hops[1].addr, Some(TARGET));
    assert!(hops[1].is_destination(TARGET));
    assert_eq!(hops[1].replies, 2);
    assert_eq!(sequences.lock().unwrap().len(), 4);
}

#[test]
fn test_sequences_and_ttls_are_deterministic() {
    let socket = MockSocket::default();
    let ttls = Arc::clone(&socket.ttls);
    let sequences = Arc::clone(&socket.sequences);
    let engine = engine(socket, MockEnricher::default(), 3);

    engine.run(TARGET, |_| {}, |_| {}).unwrap();

    assert_eq!(*ttls.lock().unwrap(), vec![1, 2, 3]);
    assert_eq!(*sequences.lock().unwrap(), vec![2, 3, 4, 5, 6, 7]);
}

#[test]
fn test_callbacks_fire_in_hop_order() {
    let gateway = ip(192, 168, 1, 1);
    let socket = MockSocket::default()
        .reply(1, 0, gateway, 1)
        .reply(3, 0, TARGET, 20);
    let mut enricher = MockEnricher::default();
    enricher
        .names
        .insert(TARGET, "www.example.com".to_string());
    let engine = engine(socket, enricher, 30);

    let events = RefCell::new(Vec::new());
    engine
        .run(
            TARGET,
            |hop| {
                assert!(hop.hostname.is_none());
                events.borrow_mut().push(("progress", hop.index()));
            },
            |hop| events.borrow_mut().push(("geo", hop.index())),
        )
        .unwrap();

    assert_eq!(
        events.into_inner(),
        vec![
            ("progress", 1),
            ("geo", 1),
            ("progress", 2),
            ("progress", 3),
            ("geo", 3),
        ]
    );
}

#[test]
fn test_enrichment_rules() {
    let gateway = ip(10, 0, 0, 1);
    let transit = ip(203, 0, 113, 9);
    let public_router = ip(4, 69, 0, 1);
    let socket = MockSocket::default()
        .reply(1, 0, gateway, 1)
        .reply(2, 0, transit, 3)
        .reply(3, 0, public_router, 5)
        .reply(4, 0, TARGET, 9);

    let mut enricher = MockEnricher::default();
    enricher.names.insert(gateway, "gw.lan".to_string());
    // A PTR that just repeats the address is dropped
    enricher.names.insert(public_router, public_router.to_string());
    let geo_calls = Arc::clone(&enricher.geo_calls);
    let engine = engine(socket, enricher, 30);

    let hops = engine.run(TARGET, |_| {}, |_| {}).unwrap();

    assert_eq!(hops[0].hostname.as_deref(), Some("gw.lan"));
    assert_eq!(hops[0].location.as_deref(), Some(LOCAL_NETWORK));
    assert!(hops[0].geo.is_none());

    // 203.0.113.0/24 is documentation space, not public
    assert_eq!(hops[1].location.as_deref(), Some(LOCAL_NETWORK));

    assert_eq!(hops[2].hostname, None);
    assert_eq!(hops[2].location.as_deref(), Some("London, United Kingdom"));
    assert_eq!(hops[2].geo.as_ref().and_then(|g| g.asn), Some(64500));

    assert_eq!(*geo_calls.lock().unwrap(), vec![public_router, TARGET]);
}

#[test]
fn test_disabled_enrichment_skips_lookups() {
    let socket = MockSocket::default().reply(1, 0, TARGET, 4);
    let enricher = MockEnricher::default();
    let rdns_calls = Arc::clone(&enricher.rdns_calls);
    let geo_calls = Arc::clone(&enricher.geo_calls);

    let config = TracerouteConfigBuilder::new()
        .probe_timeout(Duration::from_millis(10))
        .enable_rdns(false)
        .enable_geolocation(false)
        .build()
        .unwrap();
    let engine = TracerouteEngine::new(config, Box::new(socket), Box::new(enricher)).unwrap();

    let geo_hops = RefCell::new(0);
    let hops = engine
        .run(TARGET, |_| {}, |_| *geo_hops.borrow_mut() += 1)
        .unwrap();

    assert_eq!(hops.len(), 1);
    assert_eq!(hops[0].location, None);
    assert!(rdns_calls.lock().unwrap().is_empty());
    assert!(geo_calls.lock().unwrap().is_empty());
    assert_eq!(*geo_hops.borrow(), 1);
}

#[test]
fn test_invalid_config_rejected() {
    let mut config = config(5);
    config.probes_per_hop = 0;
    let result = TracerouteEngine::new(
        config,
        Box::new(MockSocket::default()),
        Box::new(MockEnricher::default()),
    );
    assert!(matches!(result, Err(TracerouteError::ConfigError(_))));
}

#[test]
fn test_family_mismatch_rejected() {
    let engine = engine(MockSocket::default(), MockEnricher::default(), 5);
    let result = engine.run("2001:db8::1".parse().unwrap(), |_| {}, |_| {});
    assert!(matches!(result, Err(TracerouteError::SocketError(_))));
}
