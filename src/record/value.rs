//! Field values
//!
//! `Value` is the in-memory form of every schema type. Floats compare and
//! hash by bit pattern so equality stays reflexive and consistent with `Hash`.

use std::hash::{Hash, Hasher};

use super::record::Record;
use super::state_map::StateMap;
use crate::schema::{PrimitiveKind, SchemaType};

/// A field value
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    String(String),
    /// Enum symbol ordinal
    Enum(usize),
    Fixed(Vec<u8>),
    Record(Box<Record>),
    Array(Vec<Value>),
    Map(StateMap),
    /// Branch of a union that is not a plain nullable
    Union { branch: usize, value: Box<Value> },
}

impl Value {
    /// Builds a union value for branch `branch`
    pub fn union(branch: usize, value: Value) -> Self {
        Value::Union {
            branch,
            value: Box::new(value),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&StateMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Short kind label used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::Enum(_) => "enum",
            Value::Fixed(_) => "fixed",
            Value::Record(_) => "record",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Union { .. } => "union",
        }
    }

    /// Checks that the value has the shape `schema` describes.
    ///
    /// Nested records are checked by type name only; their slots were checked
    /// when they were set.
    pub fn conforms_to(&self, schema: &SchemaType) -> bool {
        match (schema, self) {
            (SchemaType::Primitive(kind), value) => matches!(
                (kind, value),
                (PrimitiveKind::Null, Value::Null)
                    | (PrimitiveKind::Boolean, Value::Boolean(_))
                    | (PrimitiveKind::Int, Value::Int(_))
                    | (PrimitiveKind::Long, Value::Long(_))
                    | (PrimitiveKind::Float, Value::Float(_))
                    | (PrimitiveKind::Double, Value::Double(_))
                    | (PrimitiveKind::Bytes, Value::Bytes(_))
                    | (PrimitiveKind::String, Value::String(_))
            ),
            (SchemaType::Enum(e), Value::Enum(ordinal)) => *ordinal < e.symbols.len(),
            (SchemaType::Fixed(f), Value::Fixed(bytes)) => bytes.len() == f.size,
            (SchemaType::Record(r), Value::Record(record)) => record.type_name() == r.full_name(),
            (SchemaType::Array(element), Value::Array(items)) => items.iter().all(|v| v.conforms_to(element)),
            (SchemaType::Map(value_schema), Value::Map(map)) => map.iter().all(|(_, v)| v.conforms_to(value_schema)),
            (SchemaType::Union(branches), value) => match schema.nullable_inner() {
                Some(inner) => value.is_null() || value.conforms_to(inner),
                None => match value {
                    Value::Union { branch, value } => {
                        branches.get(*branch).is_some_and(|b| value.conforms_to(b))
                    }
                    _ => false,
                },
            },
            _ => false,
        }
    }

    fn discriminant(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Int(_) => 2,
            Value::Long(_) => 3,
            Value::Float(_) => 4,
            Value::Double(_) => 5,
            Value::Bytes(_) => 6,
            Value::String(_) => 7,
            Value::Enum(_) => 8,
            Value::Fixed(_) => 9,
            Value::Record(_) => 10,
            Value::Array(_) => 11,
            Value::Map(_) => 12,
            Value::Union { .. } => 13,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Fixed(a), Value::Fixed(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (
                Value::Union {
                    branch: a,
                    value: va,
                },
                Value::Union {
                    branch: b,
                    value: vb,
                },
            ) => a == b && va == vb,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.discriminant().hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(v) => v.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Long(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::Bytes(v) | Value::Fixed(v) => v.hash(state),
            Value::String(v) => v.hash(state),
            Value::Enum(v) => v.hash(state),
            Value::Record(r) => r.hash(state),
            Value::Array(items) => items.hash(state),
            Value::Map(m) => m.hash(state),
            Value::Union { branch, value } => {
                branch.hash(state);
                value.hash(state);
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(Box::new(v))
    }
}

impl From<StateMap> for Value {
    fn from(v: StateMap) -> Self {
        Value::Map(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
