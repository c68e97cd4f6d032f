//! Runtime configuration shared by all probes

pub mod timing;

use std::time::Duration;

/// Timeout overrides installed once at program startup.
///
/// Any probe constructed after [`timing::set_config`] picks these values up
/// as its defaults. Values passed explicitly to a probe still win.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingConfig {
    /// Receive timeout for a single ICMP echo
    pub ping_timeout: Duration,
    /// Receive timeout for each traceroute probe
    pub trace_probe_timeout: Duration,
    /// Receive timeout for a raw UDP DNS query
    pub dns_timeout: Duration,
    /// Wait window when delegating to the system resolver
    pub dns_system_window: Duration,
    /// Wall-clock deadline for one WHOIS exchange
    pub whois_timeout: Duration,
    /// HTTP timeout for geolocation requests
    pub geo_timeout: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            ping_timeout: Duration::from_millis(timing::DEFAULT_PING_TIMEOUT_MS),
            trace_probe_timeout: Duration::from_millis(timing::DEFAULT_TRACE_PROBE_TIMEOUT_MS),
            dns_timeout: Duration::from_millis(timing::DEFAULT_DNS_TIMEOUT_MS),
            dns_system_window: Duration::from_millis(timing::DEFAULT_DNS_SYSTEM_WINDOW_MS),
            whois_timeout: Duration::from_millis(timing::DEFAULT_WHOIS_TIMEOUT_MS),
            geo_timeout: Duration::from_millis(timing::DEFAULT_GEO_TIMEOUT_MS),
        }
    }
}
