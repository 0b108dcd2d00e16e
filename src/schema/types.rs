//! Schema type graph
//!
//! A schema is a tree of `SchemaType` nodes, except that named record types are
//! shared through `Arc` so records can refer to themselves or to each other.
//!
//! Supported node kinds:
//! - primitive: null, boolean, int, long, float, double, bytes, string
//! - enum: named list of symbols
//! - fixed: named byte blob of a declared size
//! - record: named, ordered field list
//! - array: homogeneous list with an element type
//! - map: string-keyed map with a value type
//! - union: ordered list of branch types
//!
//! Record field lists are set exactly once (see [`RecordSchema::define`]) and are
//! immutable afterwards.

use std::fmt;
use std::sync::{Arc, OnceLock};

use super::errors::{SchemaError, SchemaResult};

/// Primitive schema kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Null,
    Boolean,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 32-bit IEEE float
    Float,
    /// 64-bit IEEE float
    Double,
    Bytes,
    /// UTF-8 string
    String,
}

impl PrimitiveKind {
    /// Returns the schema-language name of this primitive
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveKind::Null => "null",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Bytes => "bytes",
            PrimitiveKind::String => "string",
        }
    }

    /// Parses a primitive name, returns None for anything else
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "null" => Some(PrimitiveKind::Null),
            "boolean" => Some(PrimitiveKind::Boolean),
            "int" => Some(PrimitiveKind::Int),
            "long" => Some(PrimitiveKind::Long),
            "float" => Some(PrimitiveKind::Float),
            "double" => Some(PrimitiveKind::Double),
            "bytes" => Some(PrimitiveKind::Bytes),
            "string" => Some(PrimitiveKind::String),
            _ => None,
        }
    }
}

/// The kind tag of a schema node, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaTag {
    Primitive,
    Enum,
    Fixed,
    Record,
    Array,
    Map,
    Union,
}

/// A schema node
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaType {
    Primitive(PrimitiveKind),
    Enum(Arc<EnumSchema>),
    Fixed(Arc<FixedSchema>),
    Record(Arc<RecordSchema>),
    Array(Box<SchemaType>),
    /// Keys are always strings
    Map(Box<SchemaType>),
    Union(Vec<SchemaType>),
}

impl SchemaType {
    pub fn null() -> Self {
        SchemaType::Primitive(PrimitiveKind::Null)
    }

    pub fn boolean() -> Self {
        SchemaType::Primitive(PrimitiveKind::Boolean)
    }

    pub fn int() -> Self {
        SchemaType::Primitive(PrimitiveKind::Int)
    }

    pub fn long() -> Self {
        SchemaType::Primitive(PrimitiveKind::Long)
    }

    pub fn float() -> Self {
        SchemaType::Primitive(PrimitiveKind::Float)
    }

    pub fn double() -> Self {
        SchemaType::Primitive(PrimitiveKind::Double)
    }

    pub fn bytes() -> Self {
        SchemaType::Primitive(PrimitiveKind::Bytes)
    }

    pub fn string() -> Self {
        SchemaType::Primitive(PrimitiveKind::String)
    }

    pub fn array(element: SchemaType) -> Self {
        SchemaType::Array(Box::new(element))
    }

    pub fn map(value: SchemaType) -> Self {
        SchemaType::Map(Box::new(value))
    }

    /// Shorthand for the `[null, T]` union
    pub fn nullable(inner: SchemaType) -> Self {
        SchemaType::Union(vec![SchemaType::null(), inner])
    }

    /// Returns the kind tag of this node
    pub fn tag(&self) -> SchemaTag {
        match self {
            SchemaType::Primitive(_) => SchemaTag::Primitive,
            SchemaType::Enum(_) => SchemaTag::Enum,
            SchemaType::Fixed(_) => SchemaTag::Fixed,
            SchemaType::Record(_) => SchemaTag::Record,
            SchemaType::Array(_) => SchemaTag::Array,
            SchemaType::Map(_) => SchemaTag::Map,
            SchemaType::Union(_) => SchemaTag::Union,
        }
    }

    /// Returns the type name used in messages and union branch labels.
    ///
    /// Named types report their full name.
    pub fn type_name(&self) -> String {
        match self {
            SchemaType::Primitive(kind) => kind.name().to_string(),
            SchemaType::Enum(e) => e.full_name(),
            SchemaType::Fixed(f) => f.full_name(),
            SchemaType::Record(r) => r.full_name(),
            SchemaType::Array(_) => "array".to_string(),
            SchemaType::Map(_) => "map".to_string(),
            SchemaType::Union(_) => "union".to_string(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SchemaType::Primitive(PrimitiveKind::Null))
    }

    /// If this is a two-branch union with exactly one `null` branch, returns the
    /// non-null branch.
    pub fn nullable_inner(&self) -> Option<&SchemaType> {
        match self {
            SchemaType::Union(branches) if branches.len() == 2 => {
                match (branches[0].is_null(), branches[1].is_null()) {
                    (true, false) => Some(&branches[1]),
                    (false, true) => Some(&branches[0]),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Returns the record schema if this node is a record
    pub fn as_record(&self) -> Option<&Arc<RecordSchema>> {
        match self {
            SchemaType::Record(r) => Some(r),
            _ => None,
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaType::Array(element) => write!(f, "array<{}>", element),
            SchemaType::Map(value) => write!(f, "map<string,{}>", value),
            SchemaType::Union(branches) => {
                write!(f, "union[")?;
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", branch)?;
                }
                write!(f, "]")
            }
            other => write!(f, "{}", other.type_name()),
        }
    }
}

fn join_name(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{}.{}", ns, name),
        _ => name.to_string(),
    }
}

/// Enum schema: an ordered symbol list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumSchema {
    pub name: String,
    pub namespace: Option<String>,
    pub symbols: Vec<String>,
}

impl EnumSchema {
    /// Creates an enum schema, rejecting empty or duplicate symbol lists
    pub fn new(
        name: impl Into<String>,
        namespace: Option<String>,
        symbols: Vec<String>,
    ) -> SchemaResult<Self> {
        let name = name.into();
        let full = join_name(namespace.as_deref(), &name);
        if symbols.is_empty() {
            return Err(SchemaError::malformed(&full, "enum must declare at least one symbol"));
        }
        for (i, symbol) in symbols.iter().enumerate() {
            if symbols[..i].contains(symbol) {
                return Err(SchemaError::malformed(
                    &full,
                    format!("duplicate enum symbol '{}'", symbol),
                ));
            }
        }
        Ok(Self {
            name,
            namespace,
            symbols,
        })
    }

    pub fn full_name(&self) -> String {
        join_name(self.namespace.as_deref(), &self.name)
    }

    /// Returns the ordinal of a symbol
    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }
}

/// Fixed-size byte blob schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedSchema {
    pub name: String,
    pub namespace: Option<String>,
    pub size: usize,
}

impl FixedSchema {
    pub fn new(name: impl Into<String>, namespace: Option<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            namespace,
            size,
        }
    }

    pub fn full_name(&self) -> String {
        join_name(self.namespace.as_deref(), &self.name)
    }
}

/// One declared record field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub name: String,
    pub schema: SchemaType,
    /// Zero-based declaration position
    pub position: usize,
}

/// Record schema.
///
/// Records are compared by full name only: the field list may refer back to the
/// record itself, so structural comparison would not terminate.
pub struct RecordSchema {
    name: String,
    namespace: Option<String>,
    doc: Option<String>,
    fields: OnceLock<Vec<FieldSchema>>,
}

impl RecordSchema {
    /// Declares a record whose fields are supplied later through [`define`].
    ///
    /// [`define`]: RecordSchema::define
    pub fn declare(name: impl Into<String>, namespace: Option<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            namespace,
            doc: None,
            fields: OnceLock::new(),
        })
    }

    /// Declares a record with documentation text
    pub fn declare_with_doc(
        name: impl Into<String>,
        namespace: Option<String>,
        doc: Option<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            namespace,
            doc,
            fields: OnceLock::new(),
        })
    }

    /// Declares and defines a non-recursive record in one step
    pub fn new(
        name: impl Into<String>,
        namespace: Option<String>,
        fields: Vec<(String, SchemaType)>,
    ) -> SchemaResult<Arc<Self>> {
        let record = Self::declare(name, namespace);
        record.define(fields)?;
        Ok(record)
    }

    /// Sets the field list. Positions follow declaration order.
    ///
    /// # Errors
    ///
    /// - `REC_SCHEMA_DUPLICATE_FIELD` if two fields share a name
    /// - `REC_SCHEMA_MALFORMED` if the record was already defined
    pub fn define(&self, fields: Vec<(String, SchemaType)>) -> SchemaResult<()> {
        let full = self.full_name();
        let mut built: Vec<FieldSchema> = Vec::with_capacity(fields.len());
        for (position, (name, schema)) in fields.into_iter().enumerate() {
            if built.iter().any(|f| f.name == name) {
                return Err(SchemaError::duplicate_field(&full, name));
            }
            built.push(FieldSchema {
                name,
                schema,
                position,
            });
        }
        self.fields
            .set(built)
            .map_err(|_| SchemaError::malformed(&full, "record fields defined twice"))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn full_name(&self) -> String {
        join_name(self.namespace.as_deref(), &self.name)
    }

    /// Returns whether `define` has been called
    pub fn is_defined(&self) -> bool {
        self.fields.get().is_some()
    }

    /// Returns the declared fields; empty for a record that was never defined
    pub fn fields(&self) -> &[FieldSchema] {
        self.fields.get().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields().iter().find(|f| f.name == name)
    }
}

impl PartialEq for RecordSchema {
    fn eq(&self, other: &Self) -> bool {
        self.full_name() == other.full_name()
    }
}

impl fmt::Debug for RecordSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields().iter().map(|f| f.name.as_str()).collect();
        f.debug_struct("RecordSchema")
            .field("name", &self.full_name())
            .field("fields", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee() -> Arc<RecordSchema> {
        RecordSchema::new(
            "Employee",
            Some("org.example".into()),
            vec![
                ("name".into(), SchemaType::string()),
                ("age".into(), SchemaType::int()),
                ("ssn".into(), SchemaType::string()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_field_positions_follow_declaration_order() {
        let record = employee();
        let positions: Vec<_> = record.fields().iter().map(|f| (f.name.as_str(), f.position)).collect();
        assert_eq!(positions, vec![("name", 0), ("age", 1), ("ssn", 2)]);
        assert_eq!(record.full_name(), "org.example.Employee");
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = RecordSchema::new(
            "Broken",
            None,
            vec![
                ("a".into(), SchemaType::int()),
                ("a".into(), SchemaType::long()),
            ],
        );
        let err = result.unwrap_err();
        assert_eq!(err.code().code(), "REC_SCHEMA_DUPLICATE_FIELD");
    }

    #[test]
    fn test_define_twice_rejected() {
        let record = employee();
        let err = record.define(vec![]).unwrap_err();
        assert_eq!(err.code().code(), "REC_SCHEMA_MALFORMED");
    }

    #[test]
    fn test_recursive_record_compares_by_name() {
        let node = RecordSchema::declare("Node", None);
        node.define(vec![
            ("value".into(), SchemaType::long()),
            ("next".into(), SchemaType::nullable(SchemaType::Record(node.clone()))),
        ])
        .unwrap();

        let next = &node.fields()[1].schema;
        let inner = next.nullable_inner().unwrap();
        assert_eq!(inner, &SchemaType::Record(node.clone()));
        // Debug must terminate on cyclic schemas
        assert!(format!("{:?}", node).contains("Node"));
    }

    #[test]
    fn test_nullable_inner_detection() {
        let opt = SchemaType::nullable(SchemaType::string());
        assert_eq!(opt.nullable_inner(), Some(&SchemaType::string()));

        let reversed = SchemaType::Union(vec![SchemaType::int(), SchemaType::null()]);
        assert_eq!(reversed.nullable_inner(), Some(&SchemaType::int()));

        let wide = SchemaType::Union(vec![
            SchemaType::null(),
            SchemaType::int(),
            SchemaType::string(),
        ]);
        assert!(wide.nullable_inner().is_none());

        let no_null = SchemaType::Union(vec![SchemaType::int(), SchemaType::string()]);
        assert!(no_null.nullable_inner().is_none());
    }

    #[test]
    fn test_enum_rejects_duplicate_symbols() {
        let err = EnumSchema::new("Color", None, vec!["RED".into(), "RED".into()]).unwrap_err();
        assert_eq!(err.code().code(), "REC_SCHEMA_MALFORMED");
        assert!(EnumSchema::new("Color", None, vec![]).is_err());
    }

    #[test]
    fn test_display_renders_nested_types() {
        let schema = SchemaType::map(SchemaType::array(SchemaType::nullable(SchemaType::int())));
        assert_eq!(schema.to_string(), "map<string,array<union[null,int]>>");
    }
}
