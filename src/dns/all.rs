//! "ALL" queries: one lookup per common record type

use super::record::{DnsRecord, RecordType};
use super::resolver::RecordLookup;
use serde::Serialize;
use std::fmt::Write as _;

/// Types queried for "ALL", in output order
pub const ALL_RECORD_TYPES: [RecordType; 7] = [
    RecordType::A,
    RecordType::AAAA,
    RecordType::MX,
    RecordType::NS,
    RecordType::TXT,
    RecordType::CNAME,
    RecordType::SOA,
];

/// Records for one type of an "ALL" query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSection {
    /// Type that was queried
    pub record_type: RecordType,
    /// Records found; empty on failure
    pub records: Vec<DnsRecord>,
    /// Why the lookup failed, if it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Query every type in [`ALL_RECORD_TYPES`], continuing past failures
pub fn query_all(
    resolver: &dyn RecordLookup,
    domain: &str,
    server: Option<&str>,
) -> Vec<RecordSection> {
    ALL_RECORD_TYPES
        .iter()
        .map(|&record_type| match resolver.query(domain, record_type, server) {
            Ok(records) => RecordSection {
                record_type,
                records,
                error: None,
            },
            Err(e) => {
                tracing::debug!(domain, %record_type, error = %e, "lookup failed, leaving section empty");
                RecordSection {
                    record_type,
                    records: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        })
        .collect()
}

/// Render sections as text with a `;; TYPE` header per type
pub fn format_sections(sections: &[RecordSection]) -> String {
    let mut out = String::new();
    for section in sections {
        let _ = writeln!(out, ";; {} records", section.record_type);
        if section.records.is_empty() {
            let _ = writeln!(out, ";; (none)");
        }
        for record in &section.records {
            let _ = writeln!(out, "{record}");
        }
        out.push('\n');
    }
    out
}
