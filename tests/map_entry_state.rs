//! Map Entry-State Tests
//!
//! Tests for properties:
//! - Entry states (Updated / Deleted / Unchanged) survive a round trip
//! - The visible map holds put keys and never removed keys
//! - Decode never marks fields dirty beyond the stream's dirty bitmap
//! - Nested maps carry no side table and decode as Unchanged

use std::sync::Arc;

use recordstate::codec::{CodecConfig, CodecErrorCode, StatefulCodec};
use recordstate::compiler::compile;
use recordstate::record::{EntryState, Value};
use recordstate::schema::SchemaParser;

// =============================================================================
// Test Utilities
// =============================================================================

const PAGE: &str = r#"{"type":"record","name":"WebPage","namespace":"crawl","fields":[
    {"name":"url","type":"string"},
    {"name":"outlinks","type":{"type":"map","values":"string"}},
    {"name":"headers","type":["null",{"type":"map","values":"string"}]},
    {"name":"history","type":{"type":"array","items":{"type":"map","values":"long"}}}]}"#;

const URL: usize = 0;
const OUTLINKS: usize = 1;
const HEADERS: usize = 2;
const HISTORY: usize = 3;

fn codec() -> StatefulCodec {
    let root = SchemaParser::new().parse_str(PAGE).unwrap();
    let types = Arc::new(compile(&[root]).unwrap());
    StatefulCodec::new(types, "crawl.WebPage", CodecConfig::default()).unwrap()
}

// =============================================================================
// Outlinks scenario
// =============================================================================

/// A flushed put decodes as exactly that pair, Unchanged, with only the
/// stream's dirty bits set.
#[test]
fn test_outlinks_scenario() {
    let codec = codec();
    let mut page = codec.descriptor().new_instance();
    page.map_put(OUTLINKS, "http://x", Value::from("anchor1")).unwrap();
    page.clear_entry_states();
    page.clear_dirty();

    let decoded = codec.decode(&codec.encode(&page).unwrap(), None).unwrap();
    let outlinks = decoded.get(OUTLINKS).unwrap().as_map().unwrap();

    assert_eq!(outlinks.len(), 1);
    assert_eq!(outlinks.get("http://x"), Some(&Value::from("anchor1")));
    assert_eq!(
        decoded.entry_state(OUTLINKS, "http://x").unwrap(),
        Some(EntryState::Unchanged)
    );
    assert!(!decoded.has_dirty());
    assert!(decoded.is_readable(OUTLINKS));
}

// =============================================================================
// Entry-state fidelity
// =============================================================================

/// Updated, Deleted and Unchanged keys all keep their state.
#[test]
fn test_entry_states_preserved() {
    let codec = codec();
    let mut page = codec.descriptor().new_instance();
    page.map_put(OUTLINKS, "kept", Value::from("k")).unwrap();
    page.map_put(OUTLINKS, "dropped", Value::from("d")).unwrap();
    page.clear_entry_states();

    page.map_put(OUTLINKS, "added", Value::from("a")).unwrap();
    page.map_remove(OUTLINKS, "dropped").unwrap();

    let decoded = codec.decode(&codec.encode(&page).unwrap(), None).unwrap();

    assert_eq!(decoded.entry_state(OUTLINKS, "added").unwrap(), Some(EntryState::Updated));
    assert_eq!(decoded.entry_state(OUTLINKS, "dropped").unwrap(), Some(EntryState::Deleted));
    assert_eq!(decoded.entry_state(OUTLINKS, "kept").unwrap(), Some(EntryState::Unchanged));

    let outlinks = decoded.get(OUTLINKS).unwrap().as_map().unwrap();
    assert!(outlinks.contains_key("added"));
    assert!(outlinks.contains_key("kept"));
    assert!(!outlinks.contains_key("dropped"));
    assert!(decoded.is_dirty(OUTLINKS));
}

/// Removing a key that was never loaded still records the deletion.
#[test]
fn test_remove_of_absent_key_is_tracked() {
    let codec = codec();
    let mut page = codec.descriptor().new_instance();
    page.map_remove(OUTLINKS, "http://never-loaded").unwrap();

    let decoded = codec.decode(&codec.encode(&page).unwrap(), None).unwrap();
    assert!(decoded.get(OUTLINKS).unwrap().as_map().unwrap().is_empty());
    assert_eq!(
        decoded.entry_state(OUTLINKS, "http://never-loaded").unwrap(),
        Some(EntryState::Deleted)
    );
}

/// Clearing a map marks every previously visible key Deleted.
#[test]
fn test_clear_marks_all_deleted() {
    let codec = codec();
    let mut page = codec.descriptor().new_instance();
    page.map_put(OUTLINKS, "a", Value::from("1")).unwrap();
    page.map_put(OUTLINKS, "b", Value::from("2")).unwrap();
    page.map_clear(OUTLINKS).unwrap();

    let decoded = codec.decode(&codec.encode(&page).unwrap(), None).unwrap();
    for key in ["a", "b"] {
        assert_eq!(decoded.entry_state(OUTLINKS, key).unwrap(), Some(EntryState::Deleted));
    }
}

/// A nullable map field carries its side table when present and none when null.
#[test]
fn test_nullable_map_field() {
    let codec = codec();
    let mut page = codec.descriptor().new_instance();
    page.set(URL, Value::from("http://a")).unwrap();
    page.set(HEADERS, Value::Null).unwrap();
    let decoded = codec.decode(&codec.encode(&page).unwrap(), None).unwrap();
    assert_eq!(decoded.get(HEADERS).unwrap(), &Value::Null);
    assert!(decoded.is_readable(HEADERS));

    page.map_put(HEADERS, "etag", Value::from("x1")).unwrap();
    let decoded = codec.decode(&codec.encode(&page).unwrap(), None).unwrap();
    assert_eq!(decoded.map_get(HEADERS, "etag").unwrap(), Some(&Value::from("x1")));
    assert_eq!(decoded.entry_state(HEADERS, "etag").unwrap(), Some(EntryState::Updated));
}

/// Maps below the top level use the plain encoding: every key is Unchanged.
#[test]
fn test_nested_maps_have_no_side_table() {
    let codec = codec();
    let mut page = codec.descriptor().new_instance();
    let mut snapshot = recordstate::record::StateMap::new();
    snapshot.put("fetches", Value::Long(3));
    page.append(HISTORY, Value::from(snapshot)).unwrap();

    let decoded = codec.decode(&codec.encode(&page).unwrap(), None).unwrap();
    let history = decoded.get(HISTORY).unwrap().as_array().unwrap();
    let first = history[0].as_map().unwrap();
    assert_eq!(first.get("fetches"), Some(&Value::Long(3)));
    assert_eq!(first.state("fetches"), Some(EntryState::Unchanged));
}

/// Reusing an instance drops the entry states it held before the decode.
#[test]
fn test_reuse_forgets_previous_entry_states() {
    let codec = codec();
    let mut source = codec.descriptor().new_instance();
    source.map_put(OUTLINKS, "fresh", Value::from("f")).unwrap();
    let bytes = codec.encode(&source).unwrap();

    let mut reuse = codec.descriptor().new_instance();
    reuse.map_remove(OUTLINKS, "stale").unwrap();

    let decoded = codec.decode(&bytes, Some(reuse)).unwrap();
    assert_eq!(decoded.entry_state(OUTLINKS, "stale").unwrap(), None);
    assert_eq!(decoded.entry_state(OUTLINKS, "fresh").unwrap(), Some(EntryState::Updated));
}

/// An entry-state tag outside 0..=2 is a malformed payload.
#[test]
fn test_unknown_entry_tag_rejected() {
    let codec = codec();
    let mut page = codec.descriptor().new_instance();
    page.map_remove(OUTLINKS, "k").unwrap();
    let mut bytes = codec.encode(&page).unwrap();

    // layout: [4][bits][4][bits][1]["k" = 1, b'k'][tag][0 entries]
    let tag_offset = bytes.len() - 2;
    assert_eq!(bytes[tag_offset], EntryState::Deleted.tag());
    bytes[tag_offset] = 9;

    let err = codec.decode(&bytes, None).unwrap_err();
    assert_eq!(err.code(), CodecErrorCode::MalformedPayload);
}
