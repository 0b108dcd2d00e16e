//! Packed-bit arrays
//!
//! Layout: varint bit count, then `ceil(count / 8)` bytes. Bit `i` lives in
//! byte `i / 8` at position `i % 8`, counted from the least significant bit.
//! Padding bits in the last byte are written as zero and must read as zero.

use super::buffer::{ByteReader, ByteWriter};
use super::errors::{CodecError, CodecResult};
use crate::record::FieldBits;

/// Writes a bitset as a packed-bit array
pub fn write_bits(writer: &mut ByteWriter, bits: &FieldBits) {
    writer.write_len(bits.len());
    let mut packed = vec![0u8; bits.len().div_ceil(8)];
    for i in bits.iter_ones() {
        packed[i / 8] |= 1 << (i % 8);
    }
    writer.write_raw(&packed);
}

/// Reads a packed-bit array
pub fn read_bits(reader: &mut ByteReader<'_>) -> CodecResult<FieldBits> {
    let len = reader.read_count()?;
    read_packed_bits(reader, len)
}

/// Reads the packed bytes of an array whose bit count is already known
pub fn read_packed_bits(reader: &mut ByteReader<'_>, len: usize) -> CodecResult<FieldBits> {
    let start = reader.position();
    let packed = reader.read_exact(len.div_ceil(8))?;

    let mut bits = FieldBits::new(len);
    for (byte_index, byte) in packed.iter().enumerate() {
        for bit in 0..8 {
            if byte & (1 << bit) == 0 {
                continue;
            }
            let index = byte_index * 8 + bit;
            if index >= len {
                return Err(CodecError::malformed(start, "padding bit set in packed-bit array"));
            }
            bits.set(index);
        }
    }
    Ok(bits)
}
