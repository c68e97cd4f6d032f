//! Platform resolver path
//!
//! Queries without an explicit server go through hickory's resolver
//! configured from the system (`/etc/resolv.conf` and friends). The
//! resolver is async; a private current-thread runtime drives it so the
//! rest of the crate stays blocking.

use super::record::{format_ipv6_groups, format_txt, trim_root, DnsRecord, RecordType};
use super::DnsError;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::rr::{RData, Record, RecordType as WireType};
use hickory_resolver::TokioResolver;
use std::net::IpAddr;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};

/// Blocking facade over the system-configured resolver
pub struct SystemResolver {
    runtime: Runtime,
    resolver: TokioResolver,
}

impl SystemResolver {
    /// Build a resolver from the system configuration, falling back to
    /// Cloudflare when none can be read.
    pub fn new() -> Result<Self, DnsError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DnsError::System(format!("failed to start runtime: {e}")))?;

        let resolver = match TokioResolver::builder_tokio() {
            Ok(builder) => builder.build(),
            Err(e) => {
                tracing::warn!(error = %e, "no usable system DNS configuration, using Cloudflare");
                TokioResolver::builder_with_config(
                    ResolverConfig::cloudflare(),
                    TokioConnectionProvider::default(),
                )
                .build()
            }
        };

        Ok(Self { runtime, resolver })
    }

    /// Look up `domain`, waiting at most `window` for the answer.
    ///
    /// A name without records of the requested type is an empty list, not
    /// an error.
    pub fn lookup(
        &self,
        domain: &str,
        record_type: RecordType,
        window: Duration,
    ) -> Result<Vec<DnsRecord>, DnsError> {
        let query = self
            .resolver
            .lookup(domain, WireType::from(record_type.code()));

        let outcome = self
            .runtime
            .block_on(async { tokio::time::timeout(window, query).await });

        match outcome {
            Err(_) => Err(DnsError::Timeout("system resolver".to_string())),
            Ok(Err(e)) if e.is_no_records_found() => {
                tracing::debug!(domain, %record_type, "system resolver found no records");
                Ok(Vec::new())
            }
            Ok(Err(e)) => Err(DnsError::System(e.to_string())),
            Ok(Ok(lookup)) => Ok(lookup
                .record_iter()
                .filter(|record| record.record_type() == WireType::from(record_type.code()))
                .map(convert_record)
                .collect()),
        }
    }

    /// First PTR name for `ip`, if any, within `window`
    pub fn reverse(&self, ip: IpAddr, window: Duration) -> Result<Option<String>, DnsError> {
        let query = self.resolver.reverse_lookup(ip);
        let outcome = self
            .runtime
            .block_on(async { tokio::time::timeout(window, query).await });

        match outcome {
            Err(_) => Err(DnsError::Timeout("system resolver".to_string())),
            Ok(Err(e)) if e.is_no_records_found() => Ok(None),
            Ok(Err(e)) => Err(DnsError::System(e.to_string())),
            Ok(Ok(lookup)) => Ok(lookup.iter().next().map(|name| trim_root(&name.to_string()))),
        }
    }
}

fn convert_record(record: &Record) -> DnsRecord {
    let record_type = RecordType::from_code(u16::from(record.record_type()));
    let value = match record.data() {
        RData::A(a) => a.0.to_string(),
        RData::AAAA(aaaa) => format_ipv6_groups(&aaaa.0.octets()),
        RData::MX(mx) => format!(
            "{} {}",
            mx.preference(),
            trim_root(&mx.exchange().to_string())
        ),
        RData::NS(ns) => trim_root(&ns.0.to_string()),
        RData::CNAME(cname) => trim_root(&cname.0.to_string()),
        RData::PTR(ptr) => trim_root(&ptr.0.to_string()),
        RData::TXT(txt) => format_txt(txt.txt_data().iter().map(|s| &s[..])),
        RData::SOA(soa) => format!(
            "{} {}",
            trim_root(&soa.mname().to_string()),
            trim_root(&soa.rname().to_string())
        ),
        other => other.to_string(),
    };

    DnsRecord {
        name: trim_root(&record.name().to_string()),
        record_type,
        ttl: record.ttl(),
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_resolver::proto::rr::rdata::{A, MX, TXT};
    use hickory_resolver::proto::rr::Name;
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    fn name(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    #[test]
    fn test_convert_a_record() {
        let record = Record::from_rdata(
            name("example.com."),
            300,
            RData::A(A(Ipv4Addr::new(93, 184, 216, 34))),
        );
        let converted = convert_record(&record);
        assert_eq!(converted.name, "example.com");
        assert_eq!(converted.record_type, RecordType::A);
        assert_eq!(converted.ttl, 300);
        assert_eq!(converted.value, "93.184.216.34");
    }

    #[test]
    fn test_convert_mx_and_txt_match_wire_format() {
        let mx = Record::from_rdata(
            name("example.com."),
            60,
            RData::MX(MX::new(10, name("mail.example.com."))),
        );
        assert_eq!(convert_record(&mx).value, "10 mail.example.com");

        let txt = Record::from_rdata(
            name("example.com."),
            60,
            RData::TXT(TXT::new(vec!["a".to_string(), "b c".to_string()])),
        );
        assert_eq!(convert_record(&txt).value, "\"a b c\"");
    }
}
