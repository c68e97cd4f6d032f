//! Global timing configuration with compile-time defaults and runtime overrides
//!
//! Default values are defined as compile-time constants, but can be overridden
//! once at runtime via CLI arguments or library API.

use crate::config::TimingConfig;
use once_cell::sync::OnceCell;
use std::time::Duration;

/// Default ICMP echo receive timeout in milliseconds
pub const DEFAULT_PING_TIMEOUT_MS: u64 = 1000;
/// Default per-probe traceroute timeout in milliseconds
pub const DEFAULT_TRACE_PROBE_TIMEOUT_MS: u64 = 3000;
/// Default raw UDP DNS receive timeout in milliseconds
pub const DEFAULT_DNS_TIMEOUT_MS: u64 = 3000;
/// Default wait window for the system resolver in milliseconds
pub const DEFAULT_DNS_SYSTEM_WINDOW_MS: u64 = 3000;
/// Default WHOIS connect+send+receive deadline in milliseconds
pub const DEFAULT_WHOIS_TIMEOUT_MS: u64 = 15000;
/// Default geolocation HTTP timeout in milliseconds
pub const DEFAULT_GEO_TIMEOUT_MS: u64 = 5000;

// Runtime override storage - set once at program startup
static OVERRIDE_CONFIG: OnceCell<TimingConfig> = OnceCell::new();

/// Get the ICMP echo receive timeout
pub fn ping_timeout() -> Duration {
    OVERRIDE_CONFIG
        .get()
        .map(|c| c.ping_timeout)
        .unwrap_or_else(|| Duration::from_millis(DEFAULT_PING_TIMEOUT_MS))
}

/// Get the per-probe traceroute timeout
pub fn trace_probe_timeout() -> Duration {
    OVERRIDE_CONFIG
        .get()
        .map(|c| c.trace_probe_timeout)
        .unwrap_or_else(|| Duration::from_millis(DEFAULT_TRACE_PROBE_TIMEOUT_MS))
}

/// Get the raw UDP DNS receive timeout
pub fn dns_timeout() -> Duration {
    OVERRIDE_CONFIG
        .get()
        .map(|c| c.dns_timeout)
        .unwrap_or_else(|| Duration::from_millis(DEFAULT_DNS_TIMEOUT_MS))
}

/// Get the system resolver wait window
pub fn dns_system_window() -> Duration {
    OVERRIDE_CONFIG
        .get()
        .map(|c| c.dns_system_window)
        .unwrap_or_else(|| Duration::from_millis(DEFAULT_DNS_SYSTEM_WINDOW_MS))
}

/// Get the WHOIS exchange deadline
pub fn whois_timeout() -> Duration {
    OVERRIDE_CONFIG
        .get()
        .map(|c| c.whois_timeout)
        .unwrap_or_else(|| Duration::from_millis(DEFAULT_WHOIS_TIMEOUT_MS))
}

/// Get the geolocation HTTP timeout
pub fn geo_timeout() -> Duration {
    OVERRIDE_CONFIG
        .get()
        .map(|c| c.geo_timeout)
        .unwrap_or_else(|| Duration::from_millis(DEFAULT_GEO_TIMEOUT_MS))
}

/// Set the global timing configuration
///
/// This should be called once at program startup if custom timing is needed.
/// Returns the rejected configuration if one has already been set.
pub fn set_config(config: TimingConfig) -> Result<(), TimingConfig> {
    OVERRIDE_CONFIG.set(config)
}

/// Check if custom timing configuration has been set
pub fn is_custom_config_set() -> bool {
    OVERRIDE_CONFIG.get().is_some()
}
