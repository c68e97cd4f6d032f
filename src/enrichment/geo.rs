//! IP geolocation over HTTPS
//!
//! Uses the ipwho.is JSON API. A lookup for a specific address feeds the
//! traceroute hop enrichment; a lookup without an address geolocates the
//! caller's own public IP (the trace's vantage point).

use crate::config::timing;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Default geolocation endpoint
pub const DEFAULT_GEO_URL: &str = "https://ipwho.is";

/// Error type for geolocation lookups
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The service answered but could not locate the address
    #[error("Geolocation lookup failed: {0}")]
    Lookup(String),
}

/// Where an address is, as reported by the geolocation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Address the service located
    pub ip: Option<IpAddr>,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// City name
    pub city: Option<String>,
    /// Country name
    pub country: Option<String>,
    /// Autonomous system number
    pub asn: Option<u32>,
    /// Network operator (ISP, or organisation when no ISP is given)
    pub isp: Option<String>,
}

impl GeoLocation {
    /// Human-readable place, e.g. "Mountain View, United States"
    pub fn location_string(&self) -> String {
        match (&self.city, &self.country) {
            (Some(city), Some(country)) if !city.is_empty() => format!("{city}, {country}"),
            (_, Some(country)) => country.clone(),
            (Some(city), None) => city.clone(),
            (None, None) => format!("{:.2}, {:.2}", self.latitude, self.longitude),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default = "default_success")]
    success: bool,
    message: Option<String>,
    ip: Option<IpAddr>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
    country: Option<String>,
    connection: Option<WireConnection>,
}

#[derive(Debug, Deserialize)]
struct WireConnection {
    asn: Option<u32>,
    isp: Option<String>,
    org: Option<String>,
}

fn default_success() -> bool {
    true
}

/// Parse a service response body
pub fn parse_response(body: &str) -> Result<GeoLocation, GeoError> {
    let wire: WireResponse =
        serde_json::from_str(body).map_err(|e| GeoError::Lookup(format!("invalid JSON: {e}")))?;

    if !wire.success {
        return Err(GeoError::Lookup(
            wire.message.unwrap_or_else(|| "unsuccessful lookup".to_string()),
        ));
    }
    let (Some(latitude), Some(longitude)) = (wire.latitude, wire.longitude) else {
        return Err(GeoError::Lookup("response has no coordinates".to_string()));
    };

    let (asn, isp) = match wire.connection {
        Some(conn) => (conn.asn, conn.isp.filter(|s| !s.is_empty()).or(conn.org)),
        None => (None, None),
    };

    Ok(GeoLocation {
        ip: wire.ip,
        latitude,
        longitude,
        city: wire.city.filter(|s| !s.is_empty()),
        country: wire.country.filter(|s| !s.is_empty()),
        asn,
        isp,
    })
}

/// Blocking geolocation client
pub struct Geolocator {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl Geolocator {
    /// Client for the default endpoint with the configured timeout
    pub fn new() -> Result<Self, GeoError> {
        Self::with_endpoint(DEFAULT_GEO_URL, timing::geo_timeout())
    }

    /// Client for a specific endpoint
    pub fn with_endpoint(base_url: &str, timeout: Duration) -> Result<Self, GeoError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("netdiag/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GeoError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Locate `ip`
    pub fn locate(&self, ip: IpAddr) -> Result<GeoLocation, GeoError> {
        self.fetch(&format!("{}/{ip}", self.base_url))
    }

    /// Locate the caller's own public address
    pub fn locate_origin(&self) -> Result<GeoLocation, GeoError> {
        self.fetch(&format!("{}/", self.base_url))
    }

    fn fetch(&self, url: &str) -> Result<GeoLocation, GeoError> {
        let response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                GeoError::Http("request timed out".to_string())
            } else {
                GeoError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::Http(format!("status {status}")));
        }
        let body = response.text().map_err(|e| GeoError::Http(e.to_string()))?;
        parse_response(&body)
    }
}
