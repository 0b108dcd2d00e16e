//! Binary record codec
//!
//! Two layers:
//!
//! 1. Structural: schema-directed encoding of plain values
//! 2. Stateful: dirty and readable bitmaps, readable field payloads and map
//!    entry-state side tables on top of the structural layer
//!
//! Payloads may be wrapped in a checksummed frame for transport.
//!
//! # Design Principles
//!
//! - Decoding is bounded: every count and length is checked against limits
//! - Every decode failure is fatal for that call; no partial record escapes
//! - The codec never mutates shared descriptors
//! - Output is deterministic for a given record and state

mod bits;
mod buffer;
mod checksum;
mod config;
mod errors;
mod frame;
mod stateful;
mod structural;

pub use bits::{read_bits, read_packed_bits, write_bits};
pub use buffer::{ByteReader, ByteWriter};
pub use checksum::{compute_checksum, verify_checksum};
pub use config::CodecConfig;
pub use errors::{CodecError, CodecErrorCode, CodecResult};
pub use frame::RecordFrame;
pub use stateful::StatefulCodec;
pub use structural::StructuralCodec;
