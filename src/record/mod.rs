//! Change-tracking record runtime
//!
//! Records are instances of compiled record types. Each record tracks, per
//! field, whether the field was modified (dirty) and whether it holds a
//! materialized value (readable). Map fields also track a state per key.
//!
//! # Design Principles
//!
//! - Every mutator marks the touched field dirty and readable
//! - Equality and hashing look at field values only, never at state
//! - Operations dispatch on the compiled field kind, not on value shape
//! - Records are single-owner; descriptors are shared read-only

mod bits;
mod errors;
mod json;
mod persistent;
#[allow(clippy::module_inception)]
mod record;
mod state_map;
mod value;

pub use bits::FieldBits;
pub use errors::{RecordError, RecordResult};
pub use json::{readable_to_json, record_from_json, record_to_json, value_from_json, value_to_json};
pub use persistent::Persistent;
pub use record::Record;
pub use state_map::{EntryState, StateMap};
pub use value::Value;
