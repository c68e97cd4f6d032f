//! netdiag - network diagnostics protocol engine
//!
//! ICMP ping and traceroute over unprivileged datagram sockets, a raw DNS
//! wire codec and resolver, and a WHOIS client that follows referrals.
//! Every operation is blocking and handles one target per call.

pub mod checksum;
pub mod config;
pub mod dns;
pub mod enrichment;
pub mod ping;
pub mod resolve;
pub mod socket;
pub mod traceroute;
pub mod whois;

// Re-export core types for library users
pub use config::TimingConfig;
pub use dns::{DnsError, DnsRecord, DnsResolver, RecordLookup, RecordType};
pub use enrichment::{GeoLocation, Geolocator, HopEnricher};
pub use ping::{ping, try_ping, EchoResult, PingError, PingStats};
pub use resolve::{resolve_target, ResolveError};
pub use socket::factory::create_probe_socket;
pub use socket::{IpVersion, ProbeError, ProbeSocket};
pub use traceroute::{
    trace, Hop, TracerouteConfig, TracerouteConfigBuilder, TracerouteEngine, TracerouteError,
    TracerouteResult,
};
pub use whois::{WhoisClient, WhoisError, WhoisResponse};
