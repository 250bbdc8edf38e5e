/// Checksum stored at bytes 1-2 of every report: the byte sum, truncated to 16 bits
pub fn checksum(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |acc, byte| acc.wrapping_add(*byte as u16))
}
