//! DNS wire format: query encoding and response decoding
//!
//! Only what a stub resolver needs: one question out, the answer section
//! back. Decoding is bounds-checked throughout and stops at the first
//! malformed record, keeping everything decoded before it.

use super::record::{format_ipv6_groups, format_txt, DnsRecord, RecordType};
use super::DnsError;

/// Fixed header length
pub const HEADER_LEN: usize = 12;
/// Standard query, recursion desired
const FLAGS_STANDARD_QUERY_RD: u16 = 0x0100;
const CLASS_IN: u16 = 1;
const MAX_LABEL_LEN: usize = 63;
const MAX_NAME_LEN: usize = 255;
/// Bound on pointer hops while decoding one name
const MAX_POINTER_JUMPS: usize = 128;
const POINTER_MASK: u8 = 0xC0;

/// Parsed message header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Transaction ID
    pub id: u16,
    /// Flags word (QR, opcode, AA, TC, RD, RA, RCODE)
    pub flags: u16,
    /// Question count
    pub qdcount: u16,
    /// Answer count
    pub ancount: u16,
    /// Authority count
    pub nscount: u16,
    /// Additional count
    pub arcount: u16,
}

impl Header {
    /// Parse the first 12 bytes of a message
    pub fn parse(message: &[u8]) -> Option<Self> {
        Some(Self {
            id: read_u16(message, 0)?,
            flags: read_u16(message, 2)?,
            qdcount: read_u16(message, 4)?,
            ancount: read_u16(message, 6)?,
            nscount: read_u16(message, 8)?,
            arcount: read_u16(message, 10)?,
        })
    }

    /// Response code (low four bits of the flags)
    pub fn rcode(&self) -> u8 {
        (self.flags & 0x000f) as u8
    }

    fn write(&self, out: &mut Vec<u8>) {
        for field in [
            self.id,
            self.flags,
            self.qdcount,
            self.ancount,
            self.nscount,
            self.arcount,
        ] {
            out.extend_from_slice(&field.to_be_bytes());
        }
    }
}

/// Encode a single-question recursive query for `domain`.
pub fn encode_query(
    domain: &str,
    record_type: RecordType,
    transaction_id: u16,
) -> Result<Vec<u8>, DnsError> {
    let mut message = Vec::with_capacity(HEADER_LEN + domain.len() + 6);
    Header {
        id: transaction_id,
        flags: FLAGS_STANDARD_QUERY_RD,
        qdcount: 1,
        ancount: 0,
        nscount: 0,
        arcount: 0,
    }
    .write(&mut message);

    encode_name(domain, &mut message)?;
    message.extend_from_slice(&record_type.code().to_be_bytes());
    message.extend_from_slice(&CLASS_IN.to_be_bytes());
    Ok(message)
}

fn encode_name(domain: &str, out: &mut Vec<u8>) -> Result<(), DnsError> {
    let start = out.len();
    for label in domain.split('.').filter(|label| !label.is_empty()) {
        if label.len() > MAX_LABEL_LEN {
            return Err(DnsError::InvalidName(format!(
                "label '{label}' exceeds {MAX_LABEL_LEN} bytes"
            )));
        }
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);

    if out.len() - start > MAX_NAME_LEN {
        return Err(DnsError::InvalidName(format!(
            "'{domain}' exceeds {MAX_NAME_LEN} bytes on the wire"
        )));
    }
    Ok(())
}

/// Transaction ID of a message, if it is long enough to carry one
pub fn transaction_id(message: &[u8]) -> Option<u16> {
    read_u16(message, 0)
}

/// Decode the answer section of a response.
///
/// Returns an empty list for messages of 12 bytes or fewer and for
/// responses without answers. Records decoded before a truncated or
/// malformed record are kept; that record and everything after it are
/// dropped.
pub fn decode_response(message: &[u8], query_domain: &str) -> Vec<DnsRecord> {
    let mut records = Vec::new();
    if message.len() <= HEADER_LEN {
        tracing::debug!(len = message.len(), "DNS response shorter than a header");
        return records;
    }
    let Some(header) = Header::parse(message) else {
        return records;
    };
    if header.rcode() != 0 {
        tracing::debug!(rcode = header.rcode(), query_domain, "DNS server returned an error");
    }
    if header.ancount == 0 {
        return records;
    }

    let mut offset = HEADER_LEN;
    for _ in 0..header.qdcount {
        match skip_name(message, offset) {
            Some(end) if end + 4 <= message.len() => offset = end + 4,
            _ => {
                tracing::debug!(offset, "truncated question section");
                return records;
            }
        }
    }

    for index in 0..header.ancount {
        match decode_record(message, offset, query_domain) {
            Some((record, next)) => {
                records.push(record);
                offset = next;
            }
            None => {
                tracing::debug!(
                    index,
                    announced = header.ancount,
                    offset,
                    "truncated or malformed answer record"
                );
                break;
            }
        }
    }
    records
}

/// Decode one resource record at `offset`, returning it and the next offset
fn decode_record(message: &[u8], offset: usize, query_domain: &str) -> Option<(DnsRecord, usize)> {
    let (name, offset) = read_name(message, offset)?;
    let type_code = read_u16(message, offset)?;
    // CLASS at offset + 2 is ignored
    let ttl = read_u32(message, offset + 4)?;
    let rdlength = usize::from(read_u16(message, offset + 8)?);
    let rdata_start = offset + 10;
    let rdata_end = rdata_start.checked_add(rdlength)?;
    if rdata_end > message.len() {
        return None;
    }

    let record_type = RecordType::from_code(type_code);
    let value = decode_rdata(message, record_type, rdata_start, rdlength)?;
    let name = if name.is_empty() {
        query_domain.trim_end_matches('.').to_string()
    } else {
        name
    };

    Some((
        DnsRecord {
            name,
            record_type,
            ttl,
            value,
        },
        rdata_end,
    ))
}

fn decode_rdata(
    message: &[u8],
    record_type: RecordType,
    start: usize,
    len: usize,
) -> Option<String> {
    let rdata = &message[start..start + len];
    let value = match record_type {
        RecordType::A if len == 4 => {
            format!("{}.{}.{}.{}", rdata[0], rdata[1], rdata[2], rdata[3])
        }
        RecordType::AAAA if len == 16 => format_ipv6_groups(rdata),
        RecordType::MX if len >= 3 => {
            let preference = read_u16(message, start)?;
            let (exchange, _) = read_name(message, start + 2)?;
            format!("{preference} {exchange}")
        }
        RecordType::NS | RecordType::CNAME | RecordType::PTR => read_name(message, start)?.0,
        RecordType::TXT => {
            let mut strings = Vec::new();
            let mut pos = 0;
            while pos < len {
                let string_len = usize::from(rdata[pos]);
                let end = pos + 1 + string_len;
                strings.push(rdata.get(pos + 1..end)?);
                pos = end;
            }
            format_txt(strings)
        }
        RecordType::SOA => {
            let (mname, next) = read_name(message, start)?;
            let (rname, _) = read_name(message, next)?;
            format!("{mname} {rname}")
        }
        other => format!("TYPE{} ({len} bytes)", other.code()),
    };
    Some(value)
}

/// Decode a possibly-compressed name starting at `offset`.
///
/// Returns the dotted name (no trailing dot, empty for the root) and the
/// offset just past the name as it appears at `offset`: past the first
/// pointer if one was followed, never past the jumped-to labels.
pub(crate) fn read_name(message: &[u8], offset: usize) -> Option<(String, usize)> {
    let mut labels: Vec<String> = Vec::new();
    let mut pos = offset;
    let mut resume_at = None;
    let mut jumps = 0;

    loop {
        let len = *message.get(pos)?;
        if len & POINTER_MASK == POINTER_MASK {
            let low = *message.get(pos + 1)?;
            if resume_at.is_none() {
                resume_at = Some(pos + 2);
            }
            jumps += 1;
            if jumps > MAX_POINTER_JUMPS {
                return None;
            }
            pos = (usize::from(len & !POINTER_MASK) << 8) | usize::from(low);
        } else if len & POINTER_MASK != 0 {
            // 0x40 and 0x80 label types are reserved
            return None;
        } else if len == 0 {
            let end = resume_at.unwrap_or(pos + 1);
            return Some((labels.join("."), end));
        } else {
            let label = message.get(pos + 1..pos + 1 + usize::from(len))?;
            labels.push(String::from_utf8_lossy(label).into_owned());
            pos += 1 + usize::from(len);
        }
    }
}

/// Offset just past a name, without decoding it
fn skip_name(message: &[u8], mut offset: usize) -> Option<usize> {
    loop {
        let len = *message.get(offset)?;
        if len & POINTER_MASK == POINTER_MASK {
            return (offset + 2 <= message.len()).then_some(offset + 2);
        }
        if len == 0 {
            return Some(offset + 1);
        }
        offset += 1 + usize::from(len);
    }
}

fn read_u16(message: &[u8], offset: usize) -> Option<u16> {
    let bytes = message.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn read_u32(message: &[u8], offset: usize) -> Option<u32> {
    let bytes = message.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
