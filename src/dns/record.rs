//! DNS record types and decoded resource records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Resource record type
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 host address
    A,
    /// Authoritative name server
    NS,
    /// Canonical name
    CNAME,
    /// Start of authority
    SOA,
    /// Domain name pointer
    PTR,
    /// Mail exchange
    MX,
    /// Text strings
    TXT,
    /// IPv6 host address
    AAAA,
    /// Any other type, by wire code
    Other(u16),
}

/// Named record types and their wire codes
const RECORD_TYPES: &[(RecordType, &str, u16)] = &[
    (RecordType::A, "A", 1),
    (RecordType::NS, "NS", 2),
    (RecordType::CNAME, "CNAME", 5),
    (RecordType::SOA, "SOA", 6),
    (RecordType::PTR, "PTR", 12),
    (RecordType::MX, "MX", 15),
    (RecordType::TXT, "TXT", 16),
    (RecordType::AAAA, "AAAA", 28),
];

impl RecordType {
    /// Wire code of this type
    pub fn code(self) -> u16 {
        match self {
            RecordType::Other(code) => code,
            named => RECORD_TYPES
                .iter()
                .find(|(t, _, _)| *t == named)
                .map_or(0, |(_, _, code)| *code),
        }
    }

    /// Type for a wire code
    pub fn from_code(code: u16) -> Self {
        RECORD_TYPES
            .iter()
            .find(|(_, _, c)| *c == code)
            .map_or(RecordType::Other(code), |(t, _, _)| *t)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::Other(code) => write!(f, "TYPE{code}"),
            named => {
                let name = RECORD_TYPES
                    .iter()
                    .find(|(t, _, _)| t == named)
                    .map_or("?", |(_, name, _)| *name);
                f.write_str(name)
            }
        }
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if let Some((t, _, _)) = RECORD_TYPES.iter().find(|(_, name, _)| *name == upper) {
            return Ok(*t);
        }
        upper
            .strip_prefix("TYPE")
            .and_then(|code| code.parse::<u16>().ok())
            .map(RecordType::from_code)
            .ok_or_else(|| format!("unknown record type: {s}"))
    }
}

/// One decoded resource record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Owner name, without the trailing dot
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// Time to live in seconds
    pub ttl: u32,
    /// Presentation form of the RDATA
    pub value: String,
}

impl fmt::Display for DnsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\tIN\t{}\t{}",
            self.name, self.ttl, self.record_type, self.value
        )
    }
}

/// Eight colon-separated hex groups, no zero compression
pub(crate) fn format_ipv6_groups(bytes: &[u8]) -> String {
    bytes
        .chunks_exact(2)
        .map(|pair| format!("{:x}", u16::from_be_bytes([pair[0], pair[1]])))
        .collect::<Vec<_>>()
        .join(":")
}

/// Character strings joined by a space inside one pair of quotes
pub(crate) fn format_txt<'a>(strings: impl IntoIterator<Item = &'a [u8]>) -> String {
    let parts: Vec<String> = strings
        .into_iter()
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect();
    format!("\"{}\"", parts.join(" "))
}

/// Drop the trailing root dot of a fully-qualified name
pub(crate) fn trim_root(name: &str) -> String {
    name.strip_suffix('.').unwrap_or(name).to_string()
}

/// PTR query name for an address (`in-addr.arpa` / `ip6.arpa`)
pub fn reverse_name(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            format!("{}.{}.{}.{}.in-addr.arpa", o[3], o[2], o[1], o[0])
        }
        IpAddr::V6(v6) => {
            let mut labels: Vec<String> = v6
                .octets()
                .iter()
                .rev()
                .flat_map(|byte| [byte & 0x0f, byte >> 4])
                .map(|nibble| format!("{nibble:x}"))
                .collect();
            labels.push("ip6.arpa".to_string());
            labels.join(".")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_through_table() {
        for (t, _, code) in RECORD_TYPES {
            assert_eq!(t.code(), *code);
            assert_eq!(RecordType::from_code(*code), *t);
        }
        assert_eq!(RecordType::from_code(65), RecordType::Other(65));
        assert_eq!(RecordType::Other(65).code(), 65);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("mx".parse::<RecordType>().unwrap(), RecordType::MX);
        assert_eq!(" AAAA ".parse::<RecordType>().unwrap(), RecordType::AAAA);
        assert_eq!("TYPE65".parse::<RecordType>().unwrap(), RecordType::Other(65));
        assert_eq!("type16".parse::<RecordType>().unwrap(), RecordType::TXT);
        assert!("BOGUS".parse::<RecordType>().is_err());
        assert_eq!(RecordType::CNAME.to_string(), "CNAME");
        assert_eq!(RecordType::Other(99).to_string(), "TYPE99");
    }

    #[test]
    fn test_ipv6_groups_are_not_compressed() {
        let mut bytes = [0u8; 16];
        bytes[0] = 0x20;
        bytes[1] = 0x01;
        bytes[2] = 0x0d;
        bytes[3] = 0xb8;
        bytes[15] = 1;
        assert_eq!(format_ipv6_groups(&bytes), "2001:db8:0:0:0:0:0:1");
    }

    #[test]
    fn test_txt_formatting() {
        assert_eq!(format_txt([b"v=spf1 -all".as_slice()]), "\"v=spf1 -all\"");
        assert_eq!(
            format_txt([b"part one".as_slice(), b"two".as_slice()]),
            "\"part one two\""
        );
    }

    #[test]
    fn test_reverse_names() {
        assert_eq!(
            reverse_name("192.0.2.10".parse().unwrap()),
            "10.2.0.192.in-addr.arpa"
        );
        let v6 = reverse_name("2001:db8::1".parse().unwrap());
        assert!(v6.starts_with("1.0.0.0.0.0.0.0"));
        assert!(v6.ends_with("8.b.d.0.1.0.0.2.ip6.arpa"));
        assert_eq!(v6.split('.').count(), 34);
    }

    #[test]
    fn test_record_display() {
        let record = DnsRecord {
            name: "example.com".to_string(),
            record_type: RecordType::A,
            ttl: 300,
            value: "93.184.216.34".to_string(),
        };
        assert_eq!(record.to_string(), "example.com\t300\tIN\tA\t93.184.216.34");
        assert_eq!(trim_root("example.com."), "example.com");
        assert_eq!(trim_root("example.com"), "example.com");
    }
}
