//! Capability trait for record-backed types
//!
//! Store adapters work against `Persistent` instead of concrete generated
//! types: they can reach the underlying record, ask for field state by name and
//! create a same-shaped instance without knowing how the type is constructed.

use std::sync::Arc;

use super::errors::RecordResult;
use super::record::Record;
use crate::compiler::RecordTypeDescriptor;

/// A type backed by a change-tracking record
pub trait Persistent: Sized {
    fn record(&self) -> &Record;

    fn record_mut(&mut self) -> &mut Record;

    /// Fresh zero-state instance of the same type
    fn new_instance(&self) -> Self;

    fn descriptor(&self) -> &Arc<RecordTypeDescriptor> {
        self.record().descriptor()
    }

    fn is_field_dirty(&self, name: &str) -> RecordResult<bool> {
        self.record().is_dirty_by_name(name)
    }

    fn is_field_readable(&self, name: &str) -> RecordResult<bool> {
        self.record().is_readable_by_name(name)
    }

    /// Returns whether any field needs to be written
    fn has_dirty_fields(&self) -> bool {
        self.record().has_dirty()
    }

    /// Clears dirty bits, readable bits and map entry states
    fn clear_state(&mut self) {
        self.record_mut().clear_state();
    }
}

impl Persistent for Record {
    fn record(&self) -> &Record {
        self
    }

    fn record_mut(&mut self) -> &mut Record {
        self
    }

    fn new_instance(&self) -> Self {
        Record::new_instance(self)
    }
}
