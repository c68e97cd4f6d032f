//! Internet checksum (RFC 1071)

/// Compute the 16-bit one's-complement checksum of `data`.
///
/// Odd-length input is padded with a trailing zero byte. The caller is
/// expected to have zeroed the checksum field before calling this.
pub fn internet_checksum(data: &[u8]) -> u16 {
    !fold(ones_complement_sum(data))
}

/// Check that `data`, including its stored checksum, sums to `0xFFFF`.
pub fn verify(data: &[u8]) -> bool {
    fold(ones_complement_sum(data)) == 0xFFFF
}

fn ones_complement_sum(data: &[u8]) -> u32 {
    let mut chunks = data.chunks_exact(2);
    let mut sum: u32 = chunks
        .by_ref()
        .map(|pair| u32::from(u16::from_be_bytes([pair[0], pair[1]])))
        .sum();
    if let [last] = chunks.remainder() {
        sum += u32::from(*last) << 8;
    }
    sum
}

fn fold(mut sum: u32) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    sum as u16
}
