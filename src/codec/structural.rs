//! Schema-directed structural encoding
//!
//! Plain encoding of one value against its schema, with no change-tracking
//! information:
//! - null: zero bytes
//! - boolean / int / long / float / double: fixed width
//! - bytes / string: varint length + raw bytes
//! - enum: symbol ordinal as varint
//! - fixed: exactly `size` raw bytes
//! - array: varint count + elements
//! - map: varint count + (key, value) pairs in key order
//! - union: branch index as varint + branch value
//! - record: every field in ordinal order, no bitmaps
//!
//! Decoding accepts the previous value of the slot. Records of the same type
//! are refilled in place and array elements are decoded against the previous
//! element at the same position.
//!
//! Records nested deeper than `max_depth` below the starting point are
//! rejected on both paths, so recursive schemas cannot exhaust the stack.

use std::sync::Arc;

use super::buffer::{ByteReader, ByteWriter};
use super::errors::{CodecError, CodecResult};
use crate::compiler::{CompiledTypes, RecordTypeDescriptor};
use crate::record::{FieldBits, Record, StateMap, Value};
use crate::schema::{PrimitiveKind, SchemaType};

/// Record nesting allowed when no limit is configured
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Structural encoder and decoder over a compiled type registry
#[derive(Debug, Clone, Copy)]
pub struct StructuralCodec<'a> {
    types: &'a CompiledTypes,
    max_depth: usize,
}

impl<'a> StructuralCodec<'a> {
    pub fn new(types: &'a CompiledTypes) -> Self {
        Self {
            types,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Limits how many records may nest below the value being coded
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn descriptor(&self, full_name: &str) -> CodecResult<&'a Arc<RecordTypeDescriptor>> {
        self.types
            .get(full_name)
            .ok_or_else(|| CodecError::schema_mismatch(format!("record type {} is not compiled", full_name)))
    }

    // ---------------------------------------------------------------------
    // Encode
    // ---------------------------------------------------------------------

    /// Encodes `value` against `schema`.
    ///
    /// # Errors
    ///
    /// - `REC_CODEC_VALUE_MISMATCH` if the value does not have the shape of the schema
    /// - `REC_CODEC_SCHEMA_MISMATCH` if a nested record type is not compiled
    pub fn encode(&self, writer: &mut ByteWriter, schema: &SchemaType, value: &Value) -> CodecResult<()> {
        self.encode_value(writer, schema, value, 0)
    }

    /// Encodes every field of a record in ordinal order, ignoring its state
    pub fn encode_record(&self, writer: &mut ByteWriter, record: &Record) -> CodecResult<()> {
        self.encode_fields(writer, record, 0)
    }

    fn encode_value(&self, writer: &mut ByteWriter, schema: &SchemaType, value: &Value, depth: usize) -> CodecResult<()> {
        match (schema, value) {
            (SchemaType::Primitive(kind), value) => encode_primitive(writer, *kind, value),
            (SchemaType::Enum(e), Value::Enum(ordinal)) => {
                if *ordinal >= e.symbols.len() {
                    return Err(CodecError::value_mismatch(format!(
                        "enum ordinal {} out of range for {}",
                        ordinal,
                        e.full_name()
                    )));
                }
                writer.write_len(*ordinal);
                Ok(())
            }
            (SchemaType::Fixed(f), Value::Fixed(bytes)) => {
                if bytes.len() != f.size {
                    return Err(CodecError::value_mismatch(format!(
                        "{} expects {} bytes, got {}",
                        f.full_name(),
                        f.size,
                        bytes.len()
                    )));
                }
                writer.write_raw(bytes);
                Ok(())
            }
            (SchemaType::Record(r), Value::Record(record)) => {
                let full_name = r.full_name();
                if record.type_name() != full_name {
                    return Err(CodecError::value_mismatch(format!(
                        "expected record {}, found {}",
                        full_name,
                        record.type_name()
                    )));
                }
                if depth >= self.max_depth {
                    return Err(CodecError::value_mismatch(format!(
                        "nesting exceeds max_depth {}",
                        self.max_depth
                    )));
                }
                self.encode_fields(writer, record, depth + 1)
            }
            (SchemaType::Array(element), Value::Array(items)) => {
                writer.write_len(items.len());
                for (i, item) in items.iter().enumerate() {
                    self.encode_value(writer, element, item, depth)
                        .map_err(|e| e.within(&format!("[{}]", i)))?;
                }
                Ok(())
            }
            (SchemaType::Map(value_schema), Value::Map(map)) => self.encode_map(writer, value_schema, map, depth),
            (SchemaType::Union(branches), value) => match schema.nullable_inner() {
                Some(inner) => {
                    let null_branch = if branches[0].is_null() { 0 } else { 1 };
                    if value.is_null() {
                        writer.write_len(null_branch);
                        Ok(())
                    } else {
                        writer.write_len(1 - null_branch);
                        self.encode_value(writer, inner, value, depth)
                    }
                }
                None => match value {
                    Value::Union { branch, value } => {
                        let branch_schema = branches.get(*branch).ok_or_else(|| {
                            CodecError::value_mismatch(format!(
                                "union branch {} out of range for {}",
                                branch, schema
                            ))
                        })?;
                        writer.write_len(*branch);
                        self.encode_value(writer, branch_schema, value, depth)
                    }
                    other => Err(mismatch(schema, other)),
                },
            },
            (schema, value) => Err(mismatch(schema, value)),
        }
    }

    fn encode_fields(&self, writer: &mut ByteWriter, record: &Record, depth: usize) -> CodecResult<()> {
        let descriptor = record.descriptor();
        for (field, value) in descriptor.fields().iter().zip(record.slots()) {
            self.encode_value(writer, field.schema(), value, depth)
                .map_err(|e| e.within(&format!("{}.{}", descriptor.name(), field.name())))?;
        }
        Ok(())
    }

    fn encode_map(&self, writer: &mut ByteWriter, value_schema: &SchemaType, map: &StateMap, depth: usize) -> CodecResult<()> {
        writer.write_len(map.len());
        for (key, value) in map.iter() {
            writer.write_str(key);
            self.encode_value(writer, value_schema, value, depth)
                .map_err(|e| e.within(&format!("[{:?}]", key)))?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Decode
    // ---------------------------------------------------------------------

    /// Decodes one value of `schema`, refilling `reuse` where the shapes agree.
    ///
    /// # Errors
    ///
    /// - `REC_CODEC_TRUNCATED_STREAM` if the input ends inside the value
    /// - `REC_CODEC_MALFORMED_PAYLOAD` for out-of-range ordinals, branch
    ///   indices, duplicate map keys, exceeded limits or nesting deeper than
    ///   `max_depth`
    pub fn decode(&self, reader: &mut ByteReader<'_>, schema: &SchemaType, reuse: Option<Value>) -> CodecResult<Value> {
        self.decode_value(reader, schema, reuse, 0)
    }

    /// Refills every field of `target` from the stream.
    ///
    /// The result has every field readable, no field dirty and every map
    /// entry `Unchanged`.
    pub fn decode_record(&self, reader: &mut ByteReader<'_>, target: Record) -> CodecResult<Record> {
        self.decode_fields(reader, target, 0)
    }

    /// Decodes the entries of a map; every key is loaded as `Unchanged`
    pub fn decode_map(
        &self,
        reader: &mut ByteReader<'_>,
        value_schema: &SchemaType,
        previous: Option<StateMap>,
    ) -> CodecResult<StateMap> {
        self.decode_entries(reader, value_schema, previous, 0)
    }

    fn decode_value(
        &self,
        reader: &mut ByteReader<'_>,
        schema: &SchemaType,
        reuse: Option<Value>,
        depth: usize,
    ) -> CodecResult<Value> {
        match schema {
            SchemaType::Primitive(kind) => decode_primitive(reader, *kind),
            SchemaType::Enum(e) => {
                let start = reader.position();
                let ordinal = reader.read_usize()?;
                if ordinal >= e.symbols.len() {
                    return Err(CodecError::malformed(
                        start,
                        format!("enum ordinal {} out of range for {}", ordinal, e.full_name()),
                    ));
                }
                Ok(Value::Enum(ordinal))
            }
            SchemaType::Fixed(f) => Ok(Value::Fixed(reader.read_exact(f.size)?.to_vec())),
            SchemaType::Record(r) => {
                if depth >= self.max_depth {
                    return Err(CodecError::malformed(
                        reader.position(),
                        format!("nesting exceeds max_depth {}", self.max_depth),
                    ));
                }
                let descriptor = self.descriptor(&r.full_name())?;
                let target = match reuse {
                    Some(Value::Record(record)) if record.type_name() == descriptor.full_name() => *record,
                    _ => descriptor.new_instance(),
                };
                self.decode_fields(reader, target, depth + 1)
                    .map(|record| Value::Record(Box::new(record)))
            }
            SchemaType::Array(element) => {
                let count = reader.read_count()?;
                let mut previous = match reuse {
                    Some(Value::Array(items)) => items.into_iter(),
                    _ => Vec::new().into_iter(),
                };
                let mut items = Vec::with_capacity(count.min(reader.remaining()));
                for i in 0..count {
                    let item = self
                        .decode_value(reader, element, previous.next(), depth)
                        .map_err(|e| e.within(&format!("[{}]", i)))?;
                    items.push(item);
                }
                Ok(Value::Array(items))
            }
            SchemaType::Map(value_schema) => {
                let previous = match reuse {
                    Some(Value::Map(map)) => Some(map),
                    _ => None,
                };
                self.decode_entries(reader, value_schema, previous, depth).map(Value::Map)
            }
            SchemaType::Union(branches) => {
                let start = reader.position();
                let branch = reader.read_usize()?;
                let branch_schema = branches.get(branch).ok_or_else(|| {
                    CodecError::malformed(start, format!("union branch {} out of range for {}", branch, schema))
                })?;
                if schema.nullable_inner().is_some() {
                    return if branch_schema.is_null() {
                        Ok(Value::Null)
                    } else {
                        self.decode_value(reader, branch_schema, reuse, depth)
                    };
                }
                let previous = match reuse {
                    Some(Value::Union { branch: b, value }) if b == branch => Some(*value),
                    _ => None,
                };
                let value = self.decode_value(reader, branch_schema, previous, depth)?;
                Ok(Value::union(branch, value))
            }
        }
    }

    fn decode_fields(&self, reader: &mut ByteReader<'_>, mut target: Record, depth: usize) -> CodecResult<Record> {
        let descriptor = Arc::clone(target.descriptor());
        target.clear_state();
        for (index, field) in descriptor.fields().iter().enumerate() {
            let previous = target.take_slot(index);
            let value = self
                .decode_value(reader, field.schema(), Some(previous), depth)
                .map_err(|e| e.within(&format!("{}.{}", descriptor.name(), field.name())))?;
            target.put_slot(index, value);
        }
        target.set_bits(FieldBits::new(descriptor.field_count()), descriptor.select_all());
        Ok(target)
    }

    fn decode_entries(
        &self,
        reader: &mut ByteReader<'_>,
        value_schema: &SchemaType,
        mut previous: Option<StateMap>,
        depth: usize,
    ) -> CodecResult<StateMap> {
        let count = reader.read_count()?;
        let mut map = StateMap::new();
        for _ in 0..count {
            let start = reader.position();
            let key = reader.read_string()?;
            if map.contains_key(&key) {
                return Err(CodecError::malformed(start, format!("duplicate map key {:?}", key)));
            }
            let reuse = previous.as_mut().and_then(|p| p.remove(&key));
            let value = self
                .decode_value(reader, value_schema, reuse, depth)
                .map_err(|e| e.within(&format!("[{:?}]", key)))?;
            map.load(key, value);
        }
        Ok(map)
    }
}

fn mismatch(schema: &SchemaType, value: &Value) -> CodecError {
    CodecError::value_mismatch(format!("expected {}, found {}", schema, value.kind_name()))
}

fn encode_primitive(writer: &mut ByteWriter, kind: PrimitiveKind, value: &Value) -> CodecResult<()> {
    match (kind, value) {
        (PrimitiveKind::Null, Value::Null) => {}
        (PrimitiveKind::Boolean, Value::Boolean(b)) => writer.write_bool(*b),
        (PrimitiveKind::Int, Value::Int(v)) => writer.write_i32(*v),
        (PrimitiveKind::Long, Value::Long(v)) => writer.write_i64(*v),
        (PrimitiveKind::Float, Value::Float(v)) => writer.write_f32(*v),
        (PrimitiveKind::Double, Value::Double(v)) => writer.write_f64(*v),
        (PrimitiveKind::Bytes, Value::Bytes(b)) => writer.write_bytes(b),
        (PrimitiveKind::String, Value::String(s)) => writer.write_str(s),
        (kind, value) => {
            return Err(CodecError::value_mismatch(format!(
                "expected {}, found {}",
                kind.name(),
                value.kind_name()
            )))
        }
    }
    Ok(())
}

fn decode_primitive(reader: &mut ByteReader<'_>, kind: PrimitiveKind) -> CodecResult<Value> {
    Ok(match kind {
        PrimitiveKind::Null => Value::Null,
        PrimitiveKind::Boolean => Value::Boolean(reader.read_bool()?),
        PrimitiveKind::Int => Value::Int(reader.read_i32()?),
        PrimitiveKind::Long => Value::Long(reader.read_i64()?),
        PrimitiveKind::Float => Value::Float(reader.read_f32()?),
        PrimitiveKind::Double => Value::Double(reader.read_f64()?),
        PrimitiveKind::Bytes => Value::Bytes(reader.read_bytes()?.to_vec()),
        PrimitiveKind::String => Value::String(reader.read_string()?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecConfig, CodecErrorCode};
    use crate::compiler::compile;
    use crate::record::EntryState;
    use crate::schema::{EnumSchema, FixedSchema, RecordSchema};

    fn types() -> CompiledTypes {
        let color = SchemaType::Enum(Arc::new(
            EnumSchema::new("Color", None, vec!["RED".into(), "GREEN".into()]).unwrap(),
        ));
        let inner = RecordSchema::new("Inner", None, vec![("n".into(), SchemaType::int())]).unwrap();
        let outer = RecordSchema::new(
            "Outer",
            None,
            vec![
                ("inner".into(), SchemaType::Record(inner)),
                ("color".into(), color),
                ("hash".into(), SchemaType::Fixed(Arc::new(FixedSchema::new("Hash", None, 4)))),
                ("labels".into(), SchemaType::map(SchemaType::nullable(SchemaType::string()))),
            ],
        )
        .unwrap();
        compile(&[SchemaType::Record(outer)]).unwrap()
    }

    fn round_trip(types: &CompiledTypes, schema: &SchemaType, value: &Value) -> Value {
        let codec = StructuralCodec::new(types);
        let mut writer = ByteWriter::new();
        codec.encode(&mut writer, schema, value).unwrap();
        let bytes = writer.into_bytes();
        let config = CodecConfig::default();
        let mut reader = ByteReader::new(&bytes, &config);
        let decoded = codec.decode(&mut reader, schema, None).unwrap();
        assert!(reader.is_at_end());
        decoded
    }

    #[test]
    fn test_nullable_union_either_order() {
        let types = CompiledTypes::default();
        for schema in [
            SchemaType::nullable(SchemaType::long()),
            SchemaType::Union(vec![SchemaType::long(), SchemaType::null()]),
        ] {
            assert_eq!(round_trip(&types, &schema, &Value::Null), Value::Null);
            assert_eq!(round_trip(&types, &schema, &Value::Long(7)), Value::Long(7));
        }
    }

    #[test]
    fn test_general_union_keeps_branch() {
        let types = CompiledTypes::default();
        let schema = SchemaType::Union(vec![SchemaType::int(), SchemaType::string(), SchemaType::null()]);
        let value = Value::union(1, Value::from("x"));
        assert_eq!(round_trip(&types, &schema, &value), value);

        let codec = StructuralCodec::new(&types);
        let err = codec
            .encode(&mut ByteWriter::new(), &schema, &Value::from("bare"))
            .unwrap_err();
        assert_eq!(err.code(), CodecErrorCode::ValueMismatch);
    }

    #[test]
    fn test_nested_record_decodes_readable_and_clean() {
        let types = types();
        let outer = types.get("Outer").unwrap();
        let inner = types.get("Inner").unwrap();

        let mut nested = inner.new_instance();
        nested.set(0, Value::Int(5)).unwrap();
        let mut record = outer.new_instance();
        record.set(0, Value::from(nested)).unwrap();
        record.set(1, Value::Enum(1)).unwrap();
        record.set(2, Value::Fixed(vec![1, 2, 3, 4])).unwrap();
        record.map_put(3, "k", Value::Null).unwrap();

        let schema = SchemaType::Record(Arc::clone(outer.schema()));
        let decoded = round_trip(&types, &schema, &Value::from(record.clone()));
        let decoded = decoded.as_record().unwrap();
        assert_eq!(decoded, &record);
        assert!(!decoded.has_dirty());
        assert_eq!(decoded.readable_fields().count(), 4);
        assert_eq!(decoded.entry_state(3, "k").unwrap(), Some(EntryState::Unchanged));
        assert!(!decoded.get(0).unwrap().as_record().unwrap().has_dirty());
    }

    #[test]
    fn test_null_in_required_field_rejected() {
        let types = types();
        let outer = types.get("Outer").unwrap();
        let record = outer.new_instance();
        let codec = StructuralCodec::new(&types);
        let err = codec.encode_record(&mut ByteWriter::new(), &record).unwrap_err();
        assert_eq!(err.code(), CodecErrorCode::ValueMismatch);
        assert!(err.message().starts_with("Outer.inner"));
    }

    #[test]
    fn test_enum_ordinal_out_of_range() {
        let types = types();
        let outer = types.get("Outer").unwrap();
        let color = outer.fields()[1].schema().clone();
        let config = CodecConfig::default();
        let bytes = [5u8];
        let err = StructuralCodec::new(&types)
            .decode(&mut ByteReader::new(&bytes, &config), &color, None)
            .unwrap_err();
        assert_eq!(err.code(), CodecErrorCode::MalformedPayload);
    }

    #[test]
    fn test_duplicate_map_key_rejected() {
        let types = CompiledTypes::default();
        let schema = SchemaType::map(SchemaType::int());
        let mut writer = ByteWriter::new();
        writer.write_len(2);
        for _ in 0..2 {
            writer.write_str("a");
            writer.write_i32(1);
        }
        let bytes = writer.into_bytes();
        let config = CodecConfig::default();
        let err = StructuralCodec::new(&types)
            .decode(&mut ByteReader::new(&bytes, &config), &schema, None)
            .unwrap_err();
        assert_eq!(err.code(), CodecErrorCode::MalformedPayload);
    }

    #[test]
    fn test_collection_limit_enforced() {
        let types = CompiledTypes::default();
        let schema = SchemaType::array(SchemaType::int());
        let mut writer = ByteWriter::new();
        writer.write_len(1000);
        let bytes = writer.into_bytes();
        let config = CodecConfig {
            max_collection_len: 10,
            ..CodecConfig::default()
        };
        let err = StructuralCodec::new(&types)
            .decode(&mut ByteReader::new(&bytes, &config), &schema, None)
            .unwrap_err();
        assert_eq!(err.code(), CodecErrorCode::MalformedPayload);
    }

    fn node_types() -> CompiledTypes {
        let root = crate::schema::SchemaParser::new()
            .parse_str(r#"{"type":"record","name":"Node","fields":[{"name":"next","type":["null","Node"]}]}"#)
            .unwrap();
        compile(&[root]).unwrap()
    }

    fn chain_bytes(nodes: usize) -> Vec<u8> {
        let mut bytes = vec![1u8; nodes - 1];
        bytes.push(0);
        bytes
    }

    #[test]
    fn test_nesting_limit_on_decode() {
        let types = node_types();
        let schema = SchemaType::Record(Arc::clone(types.get("Node").unwrap().schema()));
        let config = CodecConfig::default();
        let codec = StructuralCodec::new(&types).with_max_depth(3);

        let bytes = chain_bytes(3);
        let value = codec.decode(&mut ByteReader::new(&bytes, &config), &schema, None).unwrap();
        assert!(value.as_record().is_some());

        let bytes = chain_bytes(4);
        let err = codec
            .decode(&mut ByteReader::new(&bytes, &config), &schema, None)
            .unwrap_err();
        assert_eq!(err.code(), CodecErrorCode::MalformedPayload);
        assert!(err.message().contains("max_depth"));
    }

    #[test]
    fn test_nesting_limit_on_encode() {
        let types = node_types();
        let node = types.get("Node").unwrap();
        let mut chain = node.new_instance();
        for _ in 0..3 {
            let mut parent = node.new_instance();
            parent.set(0, Value::from(chain)).unwrap();
            chain = parent;
        }

        let codec = StructuralCodec::new(&types);
        assert!(codec.with_max_depth(3).encode_record(&mut ByteWriter::new(), &chain).is_ok());
        let err = codec
            .with_max_depth(2)
            .encode_record(&mut ByteWriter::new(), &chain)
            .unwrap_err();
        assert_eq!(err.code(), CodecErrorCode::ValueMismatch);
    }
}
