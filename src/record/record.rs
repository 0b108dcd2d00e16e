//! Change-tracking record instances
//!
//! A record owns one value slot per field plus two bitsets:
//! - `dirty[i]`: field `i` was touched by a mutator since state was last cleared
//! - `readable[i]`: field `i` holds a materialized, caller-visible value
//!
//! Every mutator marks the touched field dirty and readable. Dirty does not
//! compare against the previous value: touching a field is enough.
//!
//! A record is not thread-safe. At most one thread mutates or encodes a given
//! instance at a time.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::bits::FieldBits;
use super::errors::{RecordError, RecordResult};
use super::state_map::{EntryState, StateMap};
use super::value::Value;
use crate::compiler::{FieldDescriptor, FieldKind, RecordTypeDescriptor};

/// A schema-typed, mutable, field-indexed value
#[derive(Clone)]
pub struct Record {
    descriptor: Arc<RecordTypeDescriptor>,
    slots: Vec<Value>,
    dirty: FieldBits,
    readable: FieldBits,
}

impl Record {
    /// Creates an instance with every slot null and every bit clear.
    ///
    /// This is the default factory attached to compiled descriptors.
    pub fn empty(descriptor: &Arc<RecordTypeDescriptor>) -> Self {
        let count = descriptor.field_count();
        Self {
            descriptor: Arc::clone(descriptor),
            slots: vec![Value::Null; count],
            dirty: FieldBits::new(count),
            readable: FieldBits::new(count),
        }
    }

    /// Creates a zero-state instance by copying a prototype
    pub fn from_prototype(prototype: &Record) -> Self {
        let mut record = prototype.clone();
        record.clear_state();
        record
    }

    /// Creates a fresh zero-state instance of the same record type
    pub fn new_instance(&self) -> Record {
        self.descriptor.new_instance()
    }

    pub fn descriptor(&self) -> &Arc<RecordTypeDescriptor> {
        &self.descriptor
    }

    /// Full name of the record type
    pub fn type_name(&self) -> &str {
        self.descriptor.full_name()
    }

    pub fn field_count(&self) -> usize {
        self.slots.len()
    }

    // ---------------------------------------------------------------------
    // Slot access
    // ---------------------------------------------------------------------

    /// Returns the value at `index`
    pub fn get(&self, index: usize) -> RecordResult<&Value> {
        self.descriptor.checked_field(index)?;
        Ok(&self.slots[index])
    }

    pub fn get_by_name(&self, name: &str) -> RecordResult<&Value> {
        let index = self.descriptor.checked_index(name)?;
        Ok(&self.slots[index])
    }

    /// Replaces the value at `index` and marks the field dirty and readable
    pub fn set(&mut self, index: usize, value: Value) -> RecordResult<()> {
        let field = self.descriptor.checked_field(index)?;
        Self::check_conforms(field, field.schema(), &value)?;
        self.slots[index] = value;
        self.touch(index);
        Ok(())
    }

    pub fn set_by_name(&mut self, name: &str, value: Value) -> RecordResult<()> {
        let index = self.descriptor.checked_index(name)?;
        self.set(index, value)
    }

    /// Appends one element to a list field
    pub fn append(&mut self, index: usize, item: Value) -> RecordResult<()> {
        let field = self.field_of_kind(index, FieldKind::List)?;
        if let Some(element) = field.element_schema() {
            Self::check_conforms(field, element, &item)?;
        }
        match &mut self.slots[index] {
            Value::Array(items) => items.push(item),
            slot => *slot = Value::Array(vec![item]),
        }
        self.touch(index);
        Ok(())
    }

    /// Looks up one entry of a map field
    pub fn map_get(&self, index: usize, key: &str) -> RecordResult<Option<&Value>> {
        self.field_of_kind(index, FieldKind::Map)?;
        Ok(match &self.slots[index] {
            Value::Map(map) => map.get(key),
            _ => None,
        })
    }

    /// Puts one entry into a map field; the key becomes `Updated`
    pub fn map_put(&mut self, index: usize, key: impl Into<String>, value: Value) -> RecordResult<Option<Value>> {
        let field = self.field_of_kind(index, FieldKind::Map)?;
        if let Some(value_schema) = field.map_value_schema() {
            Self::check_conforms(field, value_schema, &value)?;
        }
        let previous = self.with_map(index, |map| map.put(key, value));
        self.touch(index);
        Ok(previous)
    }

    /// Removes one entry from a map field; the key becomes `Deleted`
    pub fn map_remove(&mut self, index: usize, key: &str) -> RecordResult<Option<Value>> {
        self.field_of_kind(index, FieldKind::Map)?;
        let previous = self.with_map(index, |map| map.remove(key));
        self.touch(index);
        Ok(previous)
    }

    /// Empties a map field; every previously visible key becomes `Deleted`
    pub fn map_clear(&mut self, index: usize) -> RecordResult<()> {
        self.field_of_kind(index, FieldKind::Map)?;
        self.with_map(index, StateMap::clear);
        self.touch(index);
        Ok(())
    }

    /// Returns the entry state of one key of a map field
    pub fn entry_state(&self, index: usize, key: &str) -> RecordResult<Option<EntryState>> {
        self.field_of_kind(index, FieldKind::Map)?;
        Ok(match &self.slots[index] {
            Value::Map(map) => map.state(key),
            _ => None,
        })
    }

    /// Runs `f` on the map held at `index`, creating an empty map first
    fn with_map<R>(&mut self, index: usize, f: impl FnOnce(&mut StateMap) -> R) -> R {
        match &mut self.slots[index] {
            Value::Map(map) => f(map),
            slot => {
                let mut map = StateMap::new();
                let result = f(&mut map);
                *slot = Value::Map(map);
                result
            }
        }
    }

    fn field_of_kind(&self, index: usize, required: FieldKind) -> RecordResult<&FieldDescriptor> {
        let field = self.descriptor.checked_field(index)?;
        if field.kind() != required {
            return Err(RecordError::KindMismatch {
                record: self.descriptor.full_name().to_string(),
                field: field.name().to_string(),
                kind: field.kind(),
                required,
            });
        }
        Ok(field)
    }

    fn check_conforms(field: &FieldDescriptor, schema: &crate::schema::SchemaType, value: &Value) -> RecordResult<()> {
        if value.conforms_to(schema) {
            Ok(())
        } else {
            Err(RecordError::TypeMismatch {
                field: field.name().to_string(),
                expected: schema.to_string(),
                found: value.kind_name().to_string(),
            })
        }
    }

    fn touch(&mut self, index: usize) {
        self.dirty.set(index);
        self.readable.set(index);
    }

    // ---------------------------------------------------------------------
    // State bits
    // ---------------------------------------------------------------------

    /// Out-of-range indices read as clean
    pub fn is_dirty(&self, index: usize) -> bool {
        self.dirty.get(index)
    }

    /// Out-of-range indices read as unreadable
    pub fn is_readable(&self, index: usize) -> bool {
        self.readable.get(index)
    }

    /// Returns whether any field is dirty
    pub fn has_dirty(&self) -> bool {
        self.dirty.any()
    }

    pub fn is_dirty_by_name(&self, name: &str) -> RecordResult<bool> {
        Ok(self.dirty.get(self.descriptor.checked_index(name)?))
    }

    pub fn is_readable_by_name(&self, name: &str) -> RecordResult<bool> {
        Ok(self.readable.get(self.descriptor.checked_index(name)?))
    }

    pub fn set_readable(&mut self, index: usize) -> RecordResult<()> {
        self.descriptor.checked_field(index)?;
        self.readable.set(index);
        Ok(())
    }

    pub fn set_dirty(&mut self, index: usize) -> RecordResult<()> {
        self.descriptor.checked_field(index)?;
        self.dirty.set(index);
        Ok(())
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear_all();
    }

    pub fn clear_readable(&mut self) {
        self.readable.clear_all();
    }

    /// Forgets the entry states of every map field
    pub fn clear_entry_states(&mut self) {
        for slot in &mut self.slots {
            if let Value::Map(map) = slot {
                map.clear_states();
            }
        }
    }

    /// Clears dirty bits, readable bits and map entry states
    pub fn clear_state(&mut self) {
        self.clear_dirty();
        self.clear_readable();
        self.clear_entry_states();
    }

    pub fn dirty_bits(&self) -> &FieldBits {
        &self.dirty
    }

    pub fn readable_bits(&self) -> &FieldBits {
        &self.readable
    }

    /// Indices of dirty fields in ordinal order
    pub fn dirty_fields(&self) -> impl Iterator<Item = usize> + '_ {
        self.dirty.iter_ones()
    }

    /// Indices of readable fields in ordinal order
    pub fn readable_fields(&self) -> impl Iterator<Item = usize> + '_ {
        self.readable.iter_ones()
    }

    // ---------------------------------------------------------------------
    // Partial materialization
    // ---------------------------------------------------------------------

    /// Marks every field outside `selection` unreadable
    pub fn restrict_to(&mut self, selection: &FieldBits) {
        for index in 0..self.slots.len() {
            if !selection.get(index) {
                self.readable.unset(index);
            }
        }
    }

    /// Copies the selected slots from `source` and marks them readable.
    ///
    /// Selected fields are not marked dirty. Every other field is left
    /// unreadable.
    pub fn materialize_from(&mut self, source: &Record, selection: &FieldBits) -> RecordResult<()> {
        if source.type_name() != self.type_name() {
            return Err(RecordError::DescriptorMismatch {
                expected: self.type_name().to_string(),
                found: source.type_name().to_string(),
            });
        }
        self.readable.clear_all();
        let len = self.slots.len();
        for index in selection.iter_ones().filter(|i| *i < len) {
            self.slots[index] = source.slots[index].clone();
            self.readable.set(index);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Codec hooks: no dirty marking
    // ---------------------------------------------------------------------

    /// Takes a slot value out, leaving null behind
    pub(crate) fn take_slot(&mut self, index: usize) -> Value {
        std::mem::replace(&mut self.slots[index], Value::Null)
    }

    /// Stores a slot value without touching the bitsets
    pub(crate) fn put_slot(&mut self, index: usize, value: Value) {
        self.slots[index] = value;
    }

    pub(crate) fn slots(&self) -> &[Value] {
        &self.slots
    }

    /// Replaces both bitsets
    pub(crate) fn set_bits(&mut self, dirty: FieldBits, readable: FieldBits) {
        self.dirty = dirty;
        self.readable = readable;
    }
}

impl PartialEq for Record {
    /// Compares type and every slot in ordinal order; state bits are ignored
    fn eq(&self, other: &Self) -> bool {
        self.type_name() == other.type_name() && self.slots == other.slots
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_name().hash(state);
        self.slots.hash(state);
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct(self.type_name());
        for (field, value) in self.descriptor.fields().iter().zip(&self.slots) {
            out.field(field.name(), value);
        }
        out.field("dirty", &self.dirty.iter_ones().collect::<Vec<_>>())
            .field("readable", &self.readable.iter_ones().collect::<Vec<_>>())
            .finish()
    }
}
