//! DNS queries: raw wire codec, explicit-server UDP path and system resolver

pub mod all;
pub mod codec;
pub mod record;
pub mod resolver;
pub mod system;

#[cfg(test)]
pub mod test_utils;

pub use all::{format_sections, query_all, RecordSection, ALL_RECORD_TYPES};
pub use codec::{decode_response, encode_query, transaction_id};
pub use record::{reverse_name, DnsRecord, RecordType};
pub use resolver::{parse_server, DnsResolver, RecordLookup};
pub use system::SystemResolver;

/// Error type for DNS operations
#[derive(Debug, thiserror::Error)]
pub enum DnsError {
    /// Domain cannot be encoded as a query name
    #[error("Invalid domain name: {0}")]
    InvalidName(String),

    /// Explicit server string could not be turned into an address
    #[error("Invalid DNS server '{0}'")]
    InvalidServer(String),

    /// UDP socket setup or I/O failed
    #[error("DNS socket error: {0}")]
    Socket(#[from] std::io::Error),

    /// No matching response before the deadline
    #[error("No response from {0} within the timeout")]
    Timeout(String),

    /// Response could not be decoded
    #[error("Malformed DNS response: {0}")]
    Decode(String),

    /// System resolver failed
    #[error("System resolver error: {0}")]
    System(String),
}
