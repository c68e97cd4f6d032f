//! Configuration types for traceroute operations

use crate::config::timing;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default maximum number of hops
pub const DEFAULT_MAX_HOPS: u8 = 30;
/// Default number of echo requests per TTL
pub const DEFAULT_PROBES_PER_HOP: u8 = 2;

/// Configuration for a traceroute operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracerouteConfig {
    /// Starting TTL value (default: 1)
    pub start_ttl: u8,
    /// Maximum number of hops (default: 30)
    pub max_hops: u8,
    /// Echo requests sent per TTL (default: 2)
    pub probes_per_hop: u8,
    /// Timeout for each probe (default: 3000ms)
    pub probe_timeout: Duration,
    /// Enable reverse DNS lookups (default: true)
    pub enable_rdns: bool,
    /// Enable geolocation of public hops (default: true)
    pub enable_geolocation: bool,
}

impl Default for TracerouteConfig {
    fn default() -> Self {
        Self {
            start_ttl: 1,
            max_hops: DEFAULT_MAX_HOPS,
            probes_per_hop: DEFAULT_PROBES_PER_HOP,
            probe_timeout: timing::trace_probe_timeout(),
            enable_rdns: true,
            enable_geolocation: true,
        }
    }
}

impl TracerouteConfig {
    /// Create a new TracerouteConfig builder
    pub fn builder() -> TracerouteConfigBuilder {
        TracerouteConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.start_ttl < 1 {
            return Err("start_ttl must be at least 1".to_string());
        }
        if self.max_hops < self.start_ttl {
            return Err("max_hops must be greater than or equal to start_ttl".to_string());
        }
        if self.probe_timeout.is_zero() {
            return Err("probe_timeout must be greater than 0".to_string());
        }
        if self.probes_per_hop < 1 {
            return Err("probes_per_hop must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Builder for TracerouteConfig
pub struct TracerouteConfigBuilder {
    config: TracerouteConfig,
}

impl TracerouteConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            config: TracerouteConfig::default(),
        }
    }

    /// Set the starting TTL value
    pub fn start_ttl(mut self, ttl: u8) -> Self {
        self.config.start_ttl = ttl;
        self
    }

    /// Set the maximum number of hops
    pub fn max_hops(mut self, hops: u8) -> Self {
        self.config.max_hops = hops;
        self
    }

    /// Set the number of probes per hop
    pub fn probes_per_hop(mut self, probes: u8) -> Self {
        self.config.probes_per_hop = probes;
        self
    }

    /// Set the probe timeout
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    /// Enable or disable reverse DNS lookups
    pub fn enable_rdns(mut self, enable: bool) -> Self {
        self.config.enable_rdns = enable;
        self
    }

    /// Enable or disable geolocation
    pub fn enable_geolocation(mut self, enable: bool) -> Self {
        self.config.enable_geolocation = enable;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<TracerouteConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for TracerouteConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
