//! CRC32 checksums for framed payloads
//!
//! CRC32 with the IEEE polynomial. Deterministic: the same input always
//! yields the same checksum.

use crc32fast::Hasher;

/// Computes the CRC32 of `data`
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}
