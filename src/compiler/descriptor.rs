//! Record type descriptors
//!
//! A descriptor is the compiled, immutable layout of one record schema: the
//! ordered field table, the name index, the field kind tags that decide
//! accessor shapes, and the factory used to create instances.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::naming::constant_name;
use crate::record::{FieldBits, Record, RecordError, RecordResult};
use crate::schema::{RecordSchema, SchemaError, SchemaResult, SchemaType};

/// Field kind tag, fixed at compile time.
///
/// Runtime code dispatches on this tag, never on the runtime shape of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// primitive, enum or fixed
    Scalar,
    /// nested record
    Nested,
    /// array
    List,
    /// string-keyed map
    Map,
    /// union that is not a plain nullable
    Union,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Scalar => "scalar",
            FieldKind::Nested => "nested",
            FieldKind::List => "list",
            FieldKind::Map => "map",
            FieldKind::Union => "union",
        };
        write!(f, "{}", name)
    }
}

/// Generated accessor kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Accessor {
    Get,
    Set,
    /// append one list element
    Append,
    /// map lookup by key
    GetEntry,
    /// map put by key
    PutEntry,
    /// map remove by key
    RemoveEntry,
}

/// One compiled field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    name: String,
    index: usize,
    constant_name: String,
    /// Schema as declared, including a nullable union wrapper
    declared: SchemaType,
    /// Schema after nullable-union elision
    value_schema: SchemaType,
    kind: FieldKind,
    nullable: bool,
}

impl FieldDescriptor {
    fn compile(name: &str, index: usize, declared: &SchemaType) -> Self {
        let (value_schema, nullable) = match declared.nullable_inner() {
            Some(inner) => (inner.clone(), true),
            None => (declared.clone(), false),
        };
        let kind = match value_schema {
            SchemaType::Array(_) => FieldKind::List,
            SchemaType::Map(_) => FieldKind::Map,
            SchemaType::Record(_) => FieldKind::Nested,
            SchemaType::Union(_) => FieldKind::Union,
            _ => FieldKind::Scalar,
        };
        Self {
            name: name.to_string(),
            index,
            constant_name: constant_name(name),
            declared: declared.clone(),
            value_schema,
            kind,
            nullable,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Zero-based ordinal, equal to the declaration position
    pub fn index(&self) -> usize {
        self.index
    }

    /// Upper-snake-case identifier used for generated field constants
    pub fn constant_name(&self) -> &str {
        &self.constant_name
    }

    /// The schema as declared; values stored in the field conform to this
    pub fn schema(&self) -> &SchemaType {
        &self.declared
    }

    /// The schema with a nullable union wrapper removed
    pub fn value_schema(&self) -> &SchemaType {
        &self.value_schema
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Element schema for list fields
    pub fn element_schema(&self) -> Option<&SchemaType> {
        match &self.value_schema {
            SchemaType::Array(element) => Some(element),
            _ => None,
        }
    }

    /// Value schema for map fields
    pub fn map_value_schema(&self) -> Option<&SchemaType> {
        match &self.value_schema {
            SchemaType::Map(value) => Some(value),
            _ => None,
        }
    }

    /// Accessors generated for this field
    pub fn accessors(&self) -> &'static [Accessor] {
        match self.kind {
            FieldKind::Scalar | FieldKind::Nested | FieldKind::Union => &[Accessor::Get, Accessor::Set],
            FieldKind::List => &[Accessor::Get, Accessor::Set, Accessor::Append],
            FieldKind::Map => &[
                Accessor::Get,
                Accessor::Set,
                Accessor::GetEntry,
                Accessor::PutEntry,
                Accessor::RemoveEntry,
            ],
        }
    }
}

/// Instance factory attached to a descriptor
pub type RecordFactory = fn(&Arc<RecordTypeDescriptor>) -> Record;

/// Compiled layout of one record schema.
///
/// Built once, immutable, shared by every instance of the record type.
pub struct RecordTypeDescriptor {
    schema: Arc<RecordSchema>,
    full_name: String,
    fields: Vec<FieldDescriptor>,
    by_name: HashMap<String, usize>,
    factory: RecordFactory,
}

impl RecordTypeDescriptor {
    /// Compiles the descriptor of a record schema.
    ///
    /// # Errors
    ///
    /// - `REC_SCHEMA_DUPLICATE_FIELD` if the name index would not be bijective
    /// - `REC_SCHEMA_MALFORMED` if the record was declared but never defined
    pub fn new(schema: Arc<RecordSchema>) -> SchemaResult<Self> {
        let full_name = schema.full_name();
        if !schema.is_defined() {
            return Err(SchemaError::malformed(&full_name, "record declared but never defined"));
        }

        let mut fields = Vec::with_capacity(schema.fields().len());
        let mut by_name = HashMap::with_capacity(schema.fields().len());
        for (index, field) in schema.fields().iter().enumerate() {
            if by_name.insert(field.name.clone(), index).is_some() {
                return Err(SchemaError::duplicate_field(&full_name, &field.name));
            }
            fields.push(FieldDescriptor::compile(&field.name, index, &field.schema));
        }

        Ok(Self {
            schema,
            full_name,
            fields,
            by_name,
            factory: Record::empty,
        })
    }

    /// Replaces the instance factory
    pub fn with_factory(mut self, factory: RecordFactory) -> Self {
        self.factory = factory;
        self
    }

    pub(crate) fn set_factory(&mut self, factory: RecordFactory) {
        self.factory = factory;
    }

    /// Creates a fresh zero-state instance through the attached factory
    pub fn new_instance(self: &Arc<Self>) -> Record {
        (self.factory)(self)
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Short (unqualified) record name
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, index: usize) -> Option<&FieldDescriptor> {
        self.fields.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.index_of(name).map(|i| &self.fields[i])
    }

    /// Returns the field at `index` or an `InvalidFieldIndex` error
    pub fn checked_field(&self, index: usize) -> RecordResult<&FieldDescriptor> {
        self.fields.get(index).ok_or_else(|| RecordError::InvalidFieldIndex {
            record: self.full_name.clone(),
            index,
            count: self.fields.len(),
        })
    }

    /// Resolves a field name to its index or an `UnknownField` error
    pub fn checked_index(&self, name: &str) -> RecordResult<usize> {
        self.index_of(name).ok_or_else(|| RecordError::UnknownField {
            record: self.full_name.clone(),
            field: name.to_string(),
        })
    }

    /// Builds a field selection from a list of field names.
    ///
    /// Store adapters pass such a list when materializing a partial record.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> RecordResult<FieldBits> {
        let mut selection = FieldBits::new(self.fields.len());
        for name in names {
            selection.set(self.checked_index(name.as_ref())?);
        }
        Ok(selection)
    }

    /// Selection of every field
    pub fn select_all(&self) -> FieldBits {
        let mut selection = FieldBits::new(self.fields.len());
        selection.set_all();
        selection
    }
}

impl fmt::Debug for RecordTypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordTypeDescriptor")
            .field("full_name", &self.full_name)
            .field("fields", &self.fields)
            .finish()
    }
}

impl PartialEq for RecordTypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.full_name == other.full_name && self.fields == other.fields
    }
}
