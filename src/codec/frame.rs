//! Checksummed record frames
//!
//! Frame layout:
//!
//! ```text
//! +------------------+
//! | Frame Length     | (u32 LE, includes itself and the checksum)
//! +------------------+
//! | Type Name        | (u32 LE length + UTF-8 bytes)
//! +------------------+
//! | Payload          | (u32 LE length + stateful encoding)
//! +------------------+
//! | Checksum         | (u32 LE CRC32)
//! +------------------+
//! ```
//!
//! The checksum covers every byte before it, the length field included.

use super::checksum::compute_checksum;
use super::config::CodecConfig;
use super::errors::{CodecError, CodecResult};
use crate::observability::{log_event_with_fields, Event};

/// length + name length + payload length + checksum
const MIN_FRAME_SIZE: usize = 4 + 4 + 4 + 4;

/// A stateful payload tagged with its record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFrame {
    pub type_name: String,
    pub payload: Vec<u8>,
}

impl RecordFrame {
    pub fn new(type_name: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            type_name: type_name.into(),
            payload,
        }
    }

    /// Serializes the frame and appends the checksum
    pub fn seal(&self) -> Vec<u8> {
        let frame_length = (MIN_FRAME_SIZE + self.type_name.len() + self.payload.len()) as u32;

        let mut frame = Vec::with_capacity(frame_length as usize);
        frame.extend_from_slice(&frame_length.to_le_bytes());
        frame.extend_from_slice(&(self.type_name.len() as u32).to_le_bytes());
        frame.extend_from_slice(self.type_name.as_bytes());
        frame.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&self.payload);

        let checksum = compute_checksum(&frame);
        frame.extend_from_slice(&checksum.to_le_bytes());
        frame
    }

    /// Parses one frame from the front of `data`.
    ///
    /// Returns the frame and the number of bytes consumed. The checksum is
    /// verified when `config.verify_frames` is set.
    pub fn open(data: &[u8], config: &CodecConfig) -> CodecResult<(Self, usize)> {
        if data.len() < MIN_FRAME_SIZE {
            return Err(CodecError::truncated(data.len(), MIN_FRAME_SIZE - data.len()));
        }

        let frame_length = read_u32(data, 0) as usize;
        if frame_length < MIN_FRAME_SIZE {
            return Err(CodecError::malformed(0, format!("invalid frame length: {}", frame_length)));
        }
        if data.len() < frame_length {
            return Err(CodecError::truncated(data.len(), frame_length - data.len()));
        }

        let checksum_offset = frame_length - 4;
        if config.verify_frames {
            let stored = read_u32(data, checksum_offset);
            let computed = compute_checksum(&data[..checksum_offset]);
            if computed != stored {
                log_event_with_fields(
                    Event::FrameCorrupt,
                    &[
                        ("computed", &format!("{:08x}", computed)),
                        ("stored", &format!("{:08x}", stored)),
                    ],
                );
                return Err(CodecError::corruption(format!(
                    "checksum mismatch: computed {:08x}, stored {:08x}",
                    computed, stored
                )));
            }
        }

        let body = &data[..checksum_offset];
        let mut pos = 4;
        let name = read_section(body, &mut pos, config)?;
        let type_name = String::from_utf8(name.to_vec())
            .map_err(|_| CodecError::malformed(8, "type name is not valid UTF-8"))?;
        let payload = read_section(body, &mut pos, config)?.to_vec();
        if pos != checksum_offset {
            return Err(CodecError::malformed(
                pos,
                format!("{} unexpected bytes before checksum", checksum_offset - pos),
            ));
        }

        Ok((Self { type_name, payload }, frame_length))
    }
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

/// Reads one u32-length-prefixed section of the frame body
fn read_section<'a>(body: &'a [u8], pos: &mut usize, config: &CodecConfig) -> CodecResult<&'a [u8]> {
    let start = *pos;
    if body.len() < start + 4 {
        return Err(CodecError::truncated(body.len(), start + 4 - body.len()));
    }
    let len = read_u32(body, start) as usize;
    if len > config.max_bytes_len {
        return Err(CodecError::malformed(
            start,
            format!("section length {} exceeds limit {}", len, config.max_bytes_len),
        ));
    }
    let end = start + 4 + len;
    if body.len() < end {
        return Err(CodecError::malformed(start, "section overruns frame"));
    }
    *pos = end;
    Ok(&body[start + 4..end])
}
