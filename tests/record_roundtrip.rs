//! Stateful Codec Round-Trip Tests
//!
//! Tests for properties:
//! - Packed-bit arrays round trip for every length
//! - Readable subset, readable values and dirty bits survive a round trip
//! - Unreadable fields contribute no bytes and stay unreadable
//! - Structural equality ignores state
//! - Decode failures are fatal and typed
//! - Recursive payloads are bounded by the configured nesting depth

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use recordstate::codec::{
    read_bits, write_bits, ByteReader, ByteWriter, CodecConfig, CodecErrorCode, StatefulCodec,
};
use recordstate::compiler::{compile, CompiledTypes};
use recordstate::record::{FieldBits, Value};
use recordstate::schema::SchemaParser;

// =============================================================================
// Test Utilities
// =============================================================================

const EMPLOYEE: &str = r#"{"type":"record","name":"Employee","fields":[
    {"name":"name","type":"string"},
    {"name":"age","type":"int"},
    {"name":"ssn","type":"string"}]}"#;

const PROFILE: &str = r#"{"type":"record","name":"Profile","namespace":"hr","fields":[
    {"name":"name","type":"string"},
    {"name":"manager","type":["null",{"type":"record","name":"Person","fields":[
        {"name":"name","type":"string"},
        {"name":"level","type":"int"}]}]},
    {"name":"skills","type":{"type":"array","items":"string"}},
    {"name":"grade","type":{"type":"enum","name":"Grade","symbols":["JUNIOR","SENIOR"]}},
    {"name":"badge","type":{"type":"fixed","name":"Badge","size":3}},
    {"name":"note","type":["null","int","string"]},
    {"name":"photo","type":"bytes"},
    {"name":"salary","type":"double"}]}"#;

const NODE: &str = r#"{"type":"record","name":"Node","fields":[
    {"name":"next","type":["null","Node"]}]}"#;

fn types_for(schema: &str) -> Arc<CompiledTypes> {
    let root = SchemaParser::new().parse_str(schema).unwrap();
    Arc::new(compile(&[root]).unwrap())
}

fn codec_for(schema: &str, name: &str) -> StatefulCodec {
    StatefulCodec::new(types_for(schema), name, CodecConfig::default()).unwrap()
}

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

// =============================================================================
// Packed-bit arrays
// =============================================================================

/// Every length from 0 to 200 round trips with an irregular bit pattern.
#[test]
fn test_bitset_round_trip_for_lengths_0_to_n() {
    let config = CodecConfig::default();
    for len in 0..=200 {
        let bools: Vec<bool> = (0..len).map(|i| (i * 7 + 3) % 5 < 2).collect();
        let bits = FieldBits::from_bools(&bools);

        let mut writer = ByteWriter::new();
        write_bits(&mut writer, &bits);
        let bytes = writer.into_bytes();

        let mut reader = ByteReader::new(&bytes, &config);
        let decoded = read_bits(&mut reader).unwrap();
        assert_eq!(decoded.to_bools(), bools, "length {}", len);
        assert!(reader.is_at_end(), "length {} left bytes behind", len);
    }
}

// =============================================================================
// Employee scenario
// =============================================================================

/// Only name and age are set; ssn stays unreadable and clean after decode.
#[test]
fn test_employee_scenario() {
    let codec = codec_for(EMPLOYEE, "Employee");
    let descriptor = Arc::clone(codec.descriptor());
    let name = descriptor.index_of("name").unwrap();
    let age = descriptor.index_of("age").unwrap();
    let ssn = descriptor.index_of("ssn").unwrap();

    let mut employee = descriptor.new_instance();
    employee.set(name, Value::from("Ana")).unwrap();
    employee.set(age, Value::Int(30)).unwrap();

    let bytes = codec.encode(&employee).unwrap();
    let decoded = codec.decode(&bytes, None).unwrap();

    assert!(!decoded.is_readable(ssn));
    assert_eq!(decoded.get(name).unwrap().as_str(), Some("Ana"));
    assert_eq!(decoded.get(age).unwrap().as_int(), Some(30));
    assert!(decoded.is_dirty(name));
    assert!(!decoded.is_dirty(ssn));
}

/// A required field that was never set is legal as long as it is unreadable.
#[test]
fn test_unset_required_field_is_not_encoded() {
    let codec = codec_for(EMPLOYEE, "Employee");
    let mut employee = codec.descriptor().new_instance();
    employee.set_by_name("age", Value::Int(1)).unwrap();
    assert!(codec.encode(&employee).is_ok());

    employee.set_readable(0).unwrap();
    let err = codec.encode(&employee).unwrap_err();
    assert_eq!(err.code(), CodecErrorCode::ValueMismatch);
}

// =============================================================================
// Selective write
// =============================================================================

/// Only fields A and C readable: B is absent after the round trip.
#[test]
fn test_selective_write_skips_unreadable_field() {
    let codec = codec_for(EMPLOYEE, "Employee");
    let descriptor = Arc::clone(codec.descriptor());

    let mut full = descriptor.new_instance();
    full.set(0, Value::from("Ana")).unwrap();
    full.set(1, Value::Int(30)).unwrap();
    full.set(2, Value::from("123-45")).unwrap();

    let mut selective = full.clone();
    selective.restrict_to(&descriptor.select(&["name", "ssn"]).unwrap());

    let full_bytes = codec.encode(&full).unwrap();
    let selective_bytes = codec.encode(&selective).unwrap();
    assert_eq!(full_bytes.len() - selective_bytes.len(), 4, "int payload omitted");

    let decoded = codec.decode(&selective_bytes, None).unwrap();
    assert!(decoded.is_readable(0));
    assert!(!decoded.is_readable(1));
    assert!(decoded.is_readable(2));
    assert_eq!(decoded.get(1).unwrap(), &Value::Null);
    assert_eq!(decoded.get(2).unwrap().as_str(), Some("123-45"));
    assert!(decoded.is_dirty(1), "dirty bits come from the stream");
}

/// Every schema shape survives a full round trip with its bits.
#[test]
fn test_all_shapes_round_trip() {
    let types = types_for(PROFILE);
    let codec = StatefulCodec::new(Arc::clone(&types), "hr.Profile", CodecConfig::default()).unwrap();
    let person = types.get("hr.Person").unwrap();

    let mut manager = person.new_instance();
    manager.set(0, Value::from("Bo")).unwrap();
    manager.set(1, Value::Int(3)).unwrap();

    let mut profile = codec.descriptor().new_instance();
    profile.set(0, Value::from("Ana")).unwrap();
    profile.set(1, Value::from(manager)).unwrap();
    profile.append(2, Value::from("rust")).unwrap();
    profile.append(2, Value::from("sql")).unwrap();
    profile.set(3, Value::Enum(1)).unwrap();
    profile.set(4, Value::Fixed(vec![7, 8, 9])).unwrap();
    profile.set(5, Value::union(2, Value::from("remote"))).unwrap();
    profile.set(6, Value::Bytes(vec![0, 255])).unwrap();
    profile.set(7, Value::Double(1234.5)).unwrap();
    profile.clear_dirty();
    profile.set_dirty(5).unwrap();

    let decoded = codec.decode(&codec.encode(&profile).unwrap(), None).unwrap();
    assert_eq!(decoded, profile);
    assert_eq!(decoded.dirty_fields().collect::<Vec<_>>(), vec![5]);
    assert_eq!(decoded.readable_fields().count(), 8);

    let nested = decoded.get(1).unwrap().as_record().unwrap();
    assert_eq!(nested.readable_fields().count(), 2);
    assert!(!nested.has_dirty());
}

// =============================================================================
// Reuse mode
// =============================================================================

/// Decoding into a reused instance replaces its state with the stream's.
#[test]
fn test_reuse_instance_takes_stream_state() {
    let codec = codec_for(EMPLOYEE, "Employee");
    let descriptor = Arc::clone(codec.descriptor());

    let mut source = descriptor.new_instance();
    source.set(0, Value::from("Ana")).unwrap();
    let bytes = codec.encode(&source).unwrap();

    let mut reuse = descriptor.new_instance();
    reuse.set(1, Value::Int(99)).unwrap();
    reuse.set(2, Value::from("old")).unwrap();

    let decoded = codec.decode(&bytes, Some(reuse)).unwrap();
    assert_eq!(decoded.get(0).unwrap().as_str(), Some("Ana"));
    assert_eq!(decoded.readable_fields().collect::<Vec<_>>(), vec![0]);
    assert_eq!(decoded.dirty_fields().collect::<Vec<_>>(), vec![0]);
    // slots outside the stream keep their previous values, unreadable
    assert_eq!(decoded.get(1).unwrap().as_int(), Some(99));
    assert!(!decoded.is_readable(1));
}

/// A reused nested record of the same type is refilled in place.
#[test]
fn test_reuse_merges_nested_record() {
    let types = types_for(PROFILE);
    let codec = StatefulCodec::new(Arc::clone(&types), "hr.Profile", CodecConfig::default()).unwrap();
    let person = types.get("hr.Person").unwrap();

    let mut manager = person.new_instance();
    manager.set(0, Value::from("Cy")).unwrap();
    manager.set(1, Value::Int(5)).unwrap();
    let mut profile = codec.descriptor().new_instance();
    profile.set(1, Value::from(manager)).unwrap();
    let bytes = codec.encode(&profile).unwrap();

    let mut stale_manager = person.new_instance();
    stale_manager.set(0, Value::from("Old")).unwrap();
    let mut reuse = codec.descriptor().new_instance();
    reuse.set(1, Value::from(stale_manager)).unwrap();

    let decoded = codec.decode(&bytes, Some(reuse)).unwrap();
    let nested = decoded.get(1).unwrap().as_record().unwrap();
    assert_eq!(nested.get(0).unwrap().as_str(), Some("Cy"));
    assert_eq!(nested.get(1).unwrap().as_int(), Some(5));
}

// =============================================================================
// Structural equality
// =============================================================================

/// Identical values with different bitsets are equal and hash alike.
#[test]
fn test_structural_equality_ignores_state() {
    let codec = codec_for(EMPLOYEE, "Employee");
    let descriptor = Arc::clone(codec.descriptor());

    let mut a = descriptor.new_instance();
    a.set(0, Value::from("Ana")).unwrap();
    let mut b = a.clone();
    b.clear_state();
    b.set_readable(2).unwrap();

    assert_ne!(a.dirty_bits(), b.dirty_bits());
    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));

    let decoded = codec.decode(&codec.encode(&a).unwrap(), None).unwrap();
    assert_eq!(decoded, a);
}

// =============================================================================
// Decode failures
// =============================================================================

/// Every strict prefix of a valid payload fails without a partial record.
#[test]
fn test_truncated_payloads_fail() {
    let codec = codec_for(EMPLOYEE, "Employee");
    let mut employee = codec.descriptor().new_instance();
    employee.set(0, Value::from("Ana")).unwrap();
    employee.set(1, Value::Int(30)).unwrap();
    let bytes = codec.encode(&employee).unwrap();

    for cut in 0..bytes.len() {
        let err = codec.decode(&bytes[..cut], None).unwrap_err();
        assert_eq!(err.code(), CodecErrorCode::TruncatedStream, "cut at {}", cut);
    }
}

/// A payload written for a different field count is a schema mismatch.
#[test]
fn test_bitmap_width_mismatch() {
    let employee = codec_for(EMPLOYEE, "Employee");
    let profile = codec_for(PROFILE, "hr.Profile");

    let bytes = profile.encode(&profile.descriptor().new_instance()).unwrap();
    let err = employee.decode(&bytes, None).unwrap_err();
    assert_eq!(err.code(), CodecErrorCode::SchemaMismatch);
}

/// Bytes after the last readable field are rejected.
#[test]
fn test_trailing_garbage_rejected() {
    let codec = codec_for(EMPLOYEE, "Employee");
    let mut bytes = codec.encode(&codec.descriptor().new_instance()).unwrap();
    bytes.extend_from_slice(&[1, 2, 3]);
    let err = codec.decode(&bytes, None).unwrap_err();
    assert_eq!(err.code(), CodecErrorCode::MalformedPayload);
}

/// Decode limits from the configuration bound string lengths.
#[test]
fn test_configured_limits_apply() {
    let config = CodecConfig {
        max_bytes_len: 4,
        ..CodecConfig::default()
    };
    let strict = StatefulCodec::new(types_for(EMPLOYEE), "Employee", config).unwrap();
    let lenient = codec_for(EMPLOYEE, "Employee");

    let mut employee = lenient.descriptor().new_instance();
    employee.set(0, Value::from("a long name")).unwrap();
    let bytes = lenient.encode(&employee).unwrap();

    let err = strict.decode(&bytes, None).unwrap_err();
    assert_eq!(err.code(), CodecErrorCode::MalformedPayload);
}

// =============================================================================
// Nesting depth
// =============================================================================

fn node_chain(codec: &StatefulCodec, nested: usize) -> recordstate::record::Record {
    let mut chain = codec.descriptor().new_instance();
    chain.set(0, Value::Null).unwrap();
    for _ in 0..nested {
        let mut parent = codec.descriptor().new_instance();
        parent.set(0, Value::from(chain)).unwrap();
        chain = parent;
    }
    chain
}

/// A chain nested exactly to the limit decodes; one level more is malformed.
#[test]
fn test_nesting_depth_limit() {
    let config = CodecConfig {
        max_depth: 4,
        ..CodecConfig::default()
    };
    let strict = StatefulCodec::new(types_for(NODE), "Node", config).unwrap();
    let lenient = codec_for(NODE, "Node");

    let at_limit = lenient.encode(&node_chain(&lenient, 4)).unwrap();
    let decoded = strict.decode(&at_limit, None).unwrap();
    assert_eq!(decoded, node_chain(&lenient, 4));

    let over_limit = lenient.encode(&node_chain(&lenient, 5)).unwrap();
    let err = strict.decode(&over_limit, None).unwrap_err();
    assert_eq!(err.code(), CodecErrorCode::MalformedPayload);

    assert!(strict.encode(&node_chain(&lenient, 4)).is_ok());
    let err = strict.encode(&node_chain(&lenient, 5)).unwrap_err();
    assert_eq!(err.code(), CodecErrorCode::ValueMismatch);
}

/// A hostile payload of repeated branch tags fails cleanly instead of
/// recursing without bound.
#[test]
fn test_deep_recursive_payload_rejected() {
    let codec = codec_for(NODE, "Node");
    let mut writer = ByteWriter::new();
    write_bits(&mut writer, &FieldBits::new(1));
    write_bits(&mut writer, &FieldBits::from_bools(&[true]));
    let mut bytes = writer.into_bytes();
    bytes.extend(std::iter::repeat(1u8).take(200_000));
    bytes.push(0);

    let err = codec.decode(&bytes, None).unwrap_err();
    assert_eq!(err.code(), CodecErrorCode::MalformedPayload);
    assert!(err.message().contains("max_depth"));
}
