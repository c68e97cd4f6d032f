//! Test utilities for DNS module

/// Offset of the question name in any message with a standard header
pub const QUESTION_NAME_OFFSET: u16 = 12;

/// Uncompressed wire form of a dotted name
pub fn encode_name(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for label in name.split('.').filter(|l| !l.is_empty()) {
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    out
}

/// Builds a synthetic response echoing a query's header and question
pub struct ResponseBuilder {
    message: Vec<u8>,
    answers: u16,
}

impl ResponseBuilder {
    /// Start from an encoded query: QR and RA are set, the question is kept
    pub fn for_query(query: &[u8]) -> Self {
        let mut message = query.to_vec();
        message[2] |= 0x80;
        message[3] |= 0x80;
        Self {
            message,
            answers: 0,
        }
    }

    /// Append an answer whose owner is a compression pointer to `target`
    pub fn answer_with_pointer(self, target: u16, rtype: u16, ttl: u32, rdata: &[u8]) -> Self {
        let owner = (0xC000 | target).to_be_bytes().to_vec();
        self.answer(&owner, rtype, ttl, rdata)
    }

    /// Append an answer with an uncompressed owner name
    pub fn answer_with_name(self, name: &str, rtype: u16, ttl: u32, rdata: &[u8]) -> Self {
        self.answer(&encode_name(name), rtype, ttl, rdata)
    }

    fn answer(mut self, owner: &[u8], rtype: u16, ttl: u32, rdata: &[u8]) -> Self {
        self.message.extend_from_slice(owner);
        self.message.extend_from_slice(&rtype.to_be_bytes());
        self.message.extend_from_slice(&1u16.to_be_bytes());
        self.message.extend_from_slice(&ttl.to_be_bytes());
        self.message
            .extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        self.message.extend_from_slice(rdata);
        self.answers += 1;
        self
    }

    /// Finish the message, filling in ANCOUNT
    pub fn build(mut self) -> Vec<u8> {
        self.message[6..8].copy_from_slice(&self.answers.to_be_bytes());
        self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_counts_and_flags() {
        let query = crate::dns::encode_query("a.example", crate::dns::RecordType::A, 1).unwrap();
        let response = ResponseBuilder::for_query(&query)
            .answer_with_pointer(QUESTION_NAME_OFFSET, 1, 5, &[1, 2, 3, 4])
            .build();
        assert_eq!(response[2] & 0x80, 0x80);
        assert_eq!(&response[6..8], &[0, 1]);
        assert_eq!(response.len(), query.len() + 2 + 10 + 4);
        assert_eq!(encode_name("a.b"), vec![1, b'a', 1, b'b', 0]);
    }
}
