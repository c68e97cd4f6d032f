//! Error types for traceroute operations

use thiserror::Error;

/// Errors that can occur during traceroute operations
#[derive(Debug, Error)]
pub enum TracerouteError {
    /// DNS resolution failed
    ///
    /// The target hostname could not be resolved to an IP address.
    #[error("Failed to resolve host: {0}")]
    ResolutionError(String),

    /// Socket creation or TTL option setting failed
    #[error("Socket error: {0}")]
    SocketError(String),

    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl From<crate::socket::ProbeError> for TracerouteError {
    fn from(e: crate::socket::ProbeError) -> Self {
        TracerouteError::SocketError(e.to_string())
    }
}

impl From<crate::resolve::ResolveError> for TracerouteError {
    fn from(e: crate::resolve::ResolveError) -> Self {
        TracerouteError::ResolutionError(e.to_string())
    }
}
