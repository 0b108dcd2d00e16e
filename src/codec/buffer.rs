//! Byte-level reader and writer
//!
//! Wire primitives:
//! - varint: unsigned LEB128, at most 10 bytes, used for counts, lengths,
//!   enum ordinals and union branch indices
//! - int / long / float / double: fixed width, little-endian
//! - boolean: one byte, 0 or 1
//! - string / bytes: varint length followed by the raw bytes
//!
//! The reader works on an in-memory slice and reports every failure with
//! the byte offset at which it was detected.

use super::config::CodecConfig;
use super::errors::{CodecError, CodecResult};

/// Longest valid LEB128 encoding of a u64
const MAX_VARINT_LEN: usize = 10;

/// Append-only encoder over a byte vector
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_varint(&mut self, mut value: u64) {
        while value >= 0x80 {
            self.buf.push((value as u8 & 0x7F) | 0x80);
            value >>= 7;
        }
        self.buf.push(value as u8);
    }

    pub fn write_len(&mut self, len: usize) {
        self.write_varint(len as u64);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Length-prefixed byte string
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_len(bytes.len());
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_str(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }

    /// Raw bytes without a length prefix
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }
}

/// Bounded decoder over an input slice
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    max_collection_len: usize,
    max_bytes_len: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader with the limits of `config`
    pub fn new(data: &'a [u8], config: &CodecConfig) -> Self {
        Self {
            data,
            pos: 0,
            max_collection_len: config.max_collection_len,
            max_bytes_len: config.max_bytes_len,
        }
    }

    /// Current byte offset
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos == self.data.len()
    }

    /// Consumes exactly `n` bytes
    pub fn read_exact(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(CodecError::truncated(self.pos, n - self.remaining()));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_exact(N)?);
        Ok(out)
    }

    pub fn read_varint(&mut self) -> CodecResult<u64> {
        let start = self.pos;
        let mut value: u64 = 0;
        for i in 0..MAX_VARINT_LEN {
            let [byte] = self.read_array::<1>()?;
            let payload = u64::from(byte & 0x7F);
            if i == MAX_VARINT_LEN - 1 && payload > 1 {
                return Err(CodecError::malformed(start, "varint overflows 64 bits"));
            }
            value |= payload << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(CodecError::malformed(start, "varint longer than 10 bytes"))
    }

    /// Reads a varint that must fit `usize`
    pub fn read_usize(&mut self) -> CodecResult<usize> {
        let start = self.pos;
        let value = self.read_varint()?;
        usize::try_from(value).map_err(|_| CodecError::malformed(start, format!("value {} does not fit usize", value)))
    }

    /// Reads an element count bounded by the collection limit
    pub fn read_count(&mut self) -> CodecResult<usize> {
        let start = self.pos;
        let count = self.read_usize()?;
        if count > self.max_collection_len {
            return Err(CodecError::malformed(
                start,
                format!("count {} exceeds limit {}", count, self.max_collection_len),
            ));
        }
        Ok(count)
    }

    pub fn read_bool(&mut self) -> CodecResult<bool> {
        let start = self.pos;
        match self.read_array::<1>()? {
            [0] => Ok(false),
            [1] => Ok(true),
            [other] => Err(CodecError::malformed(start, format!("invalid boolean byte {:#04x}", other))),
        }
    }

    pub fn read_u8(&mut self) -> CodecResult<u8> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    pub fn read_i32(&mut self) -> CodecResult<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> CodecResult<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> CodecResult<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> CodecResult<f64> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Length-prefixed byte string, bounded by the byte-length limit
    pub fn read_bytes(&mut self) -> CodecResult<&'a [u8]> {
        let start = self.pos;
        let len = self.read_usize()?;
        if len > self.max_bytes_len {
            return Err(CodecError::malformed(
                start,
                format!("length {} exceeds limit {}", len, self.max_bytes_len),
            ));
        }
        self.read_exact(len)
    }

    pub fn read_string(&mut self) -> CodecResult<String> {
        let start = self.pos;
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::malformed(start, "string is not valid UTF-8"))
    }
}
