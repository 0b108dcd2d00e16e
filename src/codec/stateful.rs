//! Stateful record codec
//!
//! Payload layout:
//!
//! ```text
//! +--------------------+
//! | dirty bitmap       | (packed bits, one per field)
//! +--------------------+
//! | readable bitmap    | (packed bits, one per field)
//! +--------------------+
//! | field payloads     | (readable fields only, ordinal order)
//! +--------------------+
//! ```
//!
//! A map field payload is preceded by its entry-state side table:
//! varint count, then `(key, tag)` pairs with `Unchanged=0`, `Updated=1`,
//! `Deleted=2`. Keys absent from the table decode as `Unchanged`.
//!
//! Unreadable fields contribute zero bytes. Nested records use the plain
//! structural encoding.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::sync::{Arc, OnceLock};

use super::bits::{read_packed_bits, write_bits};
use super::buffer::{ByteReader, ByteWriter};
use super::config::CodecConfig;
use super::errors::{CodecError, CodecResult};
use super::frame::RecordFrame;
use super::structural::StructuralCodec;
use crate::compiler::{CompiledTypes, FieldKind, RecordTypeDescriptor};
use crate::observability::{log_event_with_fields, Event, Logger, Severity};
use crate::record::{EntryState, FieldBits, Record, Value};

/// Codec for one record type
#[derive(Debug)]
pub struct StatefulCodec {
    types: Arc<CompiledTypes>,
    descriptor: Arc<RecordTypeDescriptor>,
    config: CodecConfig,
    /// Zero-state instance copied for each decode target
    prototype: OnceLock<Record>,
}

impl StatefulCodec {
    /// Creates a codec for the record type `type_name`.
    ///
    /// # Errors
    ///
    /// - `REC_CODEC_SCHEMA_MISMATCH` if the type is not in the registry
    /// - `REC_CODEC_INVALID_CONFIG` if the configuration is rejected
    pub fn new(types: Arc<CompiledTypes>, type_name: &str, config: CodecConfig) -> CodecResult<Self> {
        config.validate()?;
        let descriptor = types
            .get(type_name)
            .cloned()
            .ok_or_else(|| CodecError::schema_mismatch(format!("record type {} is not compiled", type_name)))?;
        Ok(Self {
            types,
            descriptor,
            config,
            prototype: OnceLock::new(),
        })
    }

    pub fn descriptor(&self) -> &Arc<RecordTypeDescriptor> {
        &self.descriptor
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Creates a zero-state decode target
    fn new_target(&self) -> Record {
        if self.config.cache_prototypes {
            let prototype = self.prototype.get_or_init(|| self.descriptor.new_instance());
            Record::from_prototype(prototype)
        } else {
            self.descriptor.new_instance()
        }
    }

    fn check_type(&self, record: &Record) -> CodecResult<()> {
        if record.type_name() != self.descriptor.full_name() {
            return Err(CodecError::schema_mismatch(format!(
                "codec for {} cannot process {}",
                self.descriptor.full_name(),
                record.type_name()
            )));
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Encode
    // ---------------------------------------------------------------------

    /// Encodes the record's state bits and readable fields.
    ///
    /// # Errors
    ///
    /// - `REC_CODEC_SCHEMA_MISMATCH` if the record is of another type
    /// - `REC_CODEC_VALUE_MISMATCH` if a readable slot does not fit its schema
    pub fn encode(&self, record: &Record) -> CodecResult<Vec<u8>> {
        self.check_type(record)?;
        let structural = StructuralCodec::new(&self.types).with_max_depth(self.config.max_depth);
        let mut writer = ByteWriter::with_capacity(64);

        write_bits(&mut writer, record.dirty_bits());
        write_bits(&mut writer, record.readable_bits());

        for index in record.readable_fields() {
            let field = &self.descriptor.fields()[index];
            let value = &record.slots()[index];
            if field.kind() == FieldKind::Map {
                write_side_table(&mut writer, value);
            }
            structural
                .encode(&mut writer, field.schema(), value)
                .map_err(|e| e.within(&format!("{}.{}", self.descriptor.name(), field.name())))?;
        }

        let bytes = writer.into_bytes();
        if Logger::enabled(Severity::Trace) {
            log_event_with_fields(
                Event::RecordEncoded,
                &[
                    ("type", self.descriptor.full_name()),
                    ("bytes", &bytes.len().to_string()),
                    ("readable", &record.readable_bits().count().to_string()),
                ],
            );
        }
        Ok(bytes)
    }

    /// Encodes the record into a caller-supplied sink
    pub fn encode_to<W: Write>(&self, record: &Record, sink: &mut W) -> CodecResult<()> {
        let bytes = self.encode(record)?;
        sink.write_all(&bytes)
            .map_err(|e| CodecError::io("cannot write encoded record", e))
    }

    /// Encodes the record inside a checksummed frame
    pub fn encode_framed(&self, record: &Record) -> CodecResult<Vec<u8>> {
        let payload = self.encode(record)?;
        Ok(RecordFrame::new(self.descriptor.full_name(), payload).seal())
    }

    // ---------------------------------------------------------------------
    // Decode
    // ---------------------------------------------------------------------

    /// Decodes a payload into `reuse` or into a fresh instance.
    ///
    /// The returned record's dirty and readable bits and map entry states
    /// are exactly those carried by the stream. In reuse mode, fields not
    /// present in the stream keep their previous slot values but are
    /// unreadable.
    ///
    /// # Errors
    ///
    /// - `REC_CODEC_SCHEMA_MISMATCH` for a bitmap length other than the field
    ///   count, or a reuse record of another type
    /// - `REC_CODEC_TRUNCATED_STREAM` if the input ends early
    /// - `REC_CODEC_MALFORMED_PAYLOAD` for invalid encodings or trailing bytes
    pub fn decode(&self, bytes: &[u8], reuse: Option<Record>) -> CodecResult<Record> {
        let mut reader = ByteReader::new(bytes, &self.config);
        match self.decode_record(&mut reader, reuse) {
            Ok(record) => {
                if Logger::enabled(Severity::Trace) {
                    log_event_with_fields(
                        Event::RecordDecoded,
                        &[
                            ("type", self.descriptor.full_name()),
                            ("bytes", &bytes.len().to_string()),
                            ("readable", &record.readable_bits().count().to_string()),
                        ],
                    );
                }
                Ok(record)
            }
            Err(err) => {
                log_event_with_fields(
                    Event::DecodeFailed,
                    &[
                        ("type", self.descriptor.full_name()),
                        ("code", err.code().code()),
                        ("offset", &err.offset().map(|o| o.to_string()).unwrap_or_default()),
                    ],
                );
                Err(err)
            }
        }
    }

    /// Reads a whole payload from a caller-supplied source and decodes it
    pub fn decode_from<R: Read>(&self, source: &mut R, reuse: Option<Record>) -> CodecResult<Record> {
        let mut bytes = Vec::new();
        source
            .read_to_end(&mut bytes)
            .map_err(|e| CodecError::io("cannot read encoded record", e))?;
        self.decode(&bytes, reuse)
    }

    /// Opens one frame from the front of `data` and decodes its payload.
    ///
    /// Returns the record and the number of bytes consumed.
    pub fn decode_framed(&self, data: &[u8], reuse: Option<Record>) -> CodecResult<(Record, usize)> {
        let (frame, consumed) = RecordFrame::open(data, &self.config)?;
        if frame.type_name != self.descriptor.full_name() {
            return Err(CodecError::schema_mismatch(format!(
                "frame holds {}, expected {}",
                frame.type_name,
                self.descriptor.full_name()
            )));
        }
        let record = self.decode(&frame.payload, reuse)?;
        Ok((record, consumed))
    }

    fn decode_record(&self, reader: &mut ByteReader<'_>, reuse: Option<Record>) -> CodecResult<Record> {
        let mut target = match reuse {
            Some(record) => {
                self.check_type(&record)?;
                record
            }
            None => self.new_target(),
        };
        target.clear_state();

        let dirty = self.read_bitmap(reader, "dirty")?;
        let readable = self.read_bitmap(reader, "readable")?;

        let structural = StructuralCodec::new(&self.types).with_max_depth(self.config.max_depth);
        for index in readable.iter_ones() {
            let field = &self.descriptor.fields()[index];
            let path = format!("{}.{}", self.descriptor.name(), field.name());

            let states = if field.kind() == FieldKind::Map {
                read_side_table(reader).map_err(|e| e.within(&path))?
            } else {
                BTreeMap::new()
            };

            let start = reader.position();
            let previous = target.take_slot(index);
            let mut value = structural
                .decode(reader, field.schema(), Some(previous))
                .map_err(|e| e.within(&path))?;

            match &mut value {
                Value::Map(map) => {
                    for (key, state) in states {
                        map.set_state(key, state);
                    }
                }
                _ if !states.is_empty() => {
                    return Err(CodecError::malformed(start, "entry states present for a null map").within(&path));
                }
                _ => {}
            }
            target.put_slot(index, value);
        }

        if !reader.is_at_end() {
            return Err(CodecError::malformed(
                reader.position(),
                format!("{} trailing bytes after record", reader.remaining()),
            ));
        }

        target.set_bits(dirty, readable);
        Ok(target)
    }

    fn read_bitmap(&self, reader: &mut ByteReader<'_>, which: &str) -> CodecResult<FieldBits> {
        let start = reader.position();
        let len = reader.read_usize()?;
        if len != self.descriptor.field_count() {
            return Err(CodecError::schema_mismatch(format!(
                "{} bitmap has {} bits, {} has {} fields",
                which,
                len,
                self.descriptor.full_name(),
                self.descriptor.field_count()
            ))
            .at(start));
        }
        read_packed_bits(reader, len)
    }
}

/// Writes the explicit entry states of a map slot; a null slot has none
fn write_side_table(writer: &mut ByteWriter, value: &Value) {
    match value {
        Value::Map(map) => {
            writer.write_len(map.state_count());
            for (key, state) in map.states() {
                writer.write_str(key);
                writer.write_u8(state.tag());
            }
        }
        _ => writer.write_len(0),
    }
}

fn read_side_table(reader: &mut ByteReader<'_>) -> CodecResult<BTreeMap<String, EntryState>> {
    let count = reader.read_count()?;
    let mut states = BTreeMap::new();
    for _ in 0..count {
        let start = reader.position();
        let key = reader.read_string()?;
        let tag_offset = reader.position();
        let tag = reader.read_u8()?;
        let state = EntryState::from_tag(tag)
            .ok_or_else(|| CodecError::malformed(tag_offset, format!("invalid entry state tag {}", tag)))?;
        if states.insert(key, state).is_some() {
            return Err(CodecError::malformed(start, "duplicate key in entry state table"));
        }
    }
    Ok(states)
}
