//! JSON bridge for record values
//!
//! JSON shape per schema type:
//! - primitives map to their JSON counterparts; bytes and fixed are arrays of
//!   numbers in `0..=255`
//! - enums are symbol strings
//! - records are objects keyed by field name
//! - a nullable union is `null` or the plain value
//! - any other union is `{"<branch type name>": value}`, or `null` for a
//!   `null` branch
//!
//! Maps read from JSON record every entry as `Updated`: a JSON document
//! describes writes.

use std::sync::Arc;

use serde_json::{Map as JsonMap, Number, Value as Json};

use super::errors::{RecordError, RecordResult};
use super::record::Record;
use super::state_map::StateMap;
use super::value::Value;
use crate::compiler::{CompiledTypes, RecordTypeDescriptor};
use crate::schema::{PrimitiveKind, SchemaType};

fn invalid(path: &str, reason: impl Into<String>) -> RecordError {
    RecordError::InvalidJson {
        path: path.to_string(),
        reason: reason.into(),
    }
}

/// Builds a record from a JSON object; every present field is set through the
/// record mutators and ends up dirty and readable.
pub fn record_from_json(
    descriptor: &Arc<RecordTypeDescriptor>,
    json: &Json,
    types: &CompiledTypes,
) -> RecordResult<Record> {
    let object = json
        .as_object()
        .ok_or_else(|| invalid(descriptor.full_name(), "expected a JSON object"))?;

    let mut record = descriptor.new_instance();
    for (name, field_json) in object {
        let index = descriptor.checked_index(name)?;
        let field = &descriptor.fields()[index];
        let path = format!("{}.{}", descriptor.name(), name);
        let value = value_from_json(field.schema(), field_json, types, &path)?;
        record.set(index, value)?;
    }
    Ok(record)
}

/// Converts a JSON document into a value of `schema`
pub fn value_from_json(schema: &SchemaType, json: &Json, types: &CompiledTypes, path: &str) -> RecordResult<Value> {
    match schema {
        SchemaType::Primitive(kind) => primitive_from_json(*kind, json, path),
        SchemaType::Enum(e) => {
            let symbol = json.as_str().ok_or_else(|| invalid(path, "expected an enum symbol"))?;
            e.index_of(symbol)
                .map(Value::Enum)
                .ok_or_else(|| invalid(path, format!("'{}' is not a symbol of {}", symbol, e.full_name())))
        }
        SchemaType::Fixed(f) => {
            let bytes = bytes_from_json(json, path)?;
            if bytes.len() != f.size {
                return Err(invalid(
                    path,
                    format!("{} expects {} bytes, got {}", f.full_name(), f.size, bytes.len()),
                ));
            }
            Ok(Value::Fixed(bytes))
        }
        SchemaType::Record(r) => {
            let descriptor = types
                .get(&r.full_name())
                .ok_or_else(|| invalid(path, format!("record type {} is not compiled", r.full_name())))?;
            let mut nested = record_from_json(descriptor, json, types)?;
            nested.clear_state();
            Ok(Value::Record(Box::new(nested)))
        }
        SchemaType::Array(element) => {
            let items = json.as_array().ok_or_else(|| invalid(path, "expected an array"))?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| value_from_json(element, item, types, &format!("{}[{}]", path, i)))
                .collect::<RecordResult<Vec<_>>>()
                .map(Value::Array)
        }
        SchemaType::Map(value_schema) => {
            let object = json.as_object().ok_or_else(|| invalid(path, "expected an object"))?;
            let mut map = StateMap::new();
            for (key, item) in object {
                let value = value_from_json(value_schema, item, types, &format!("{}[{:?}]", path, key))?;
                map.put(key.clone(), value);
            }
            Ok(Value::Map(map))
        }
        SchemaType::Union(branches) => {
            if let Some(inner) = schema.nullable_inner() {
                return if json.is_null() {
                    Ok(Value::Null)
                } else {
                    value_from_json(inner, json, types, path)
                };
            }
            if json.is_null() {
                let branch = branches
                    .iter()
                    .position(SchemaType::is_null)
                    .ok_or_else(|| invalid(path, "union has no null branch"))?;
                return Ok(Value::union(branch, Value::Null));
            }
            let object = json
                .as_object()
                .filter(|o| o.len() == 1)
                .ok_or_else(|| invalid(path, "expected {\"<branch type>\": value}"))?;
            let (label, inner_json) = object
                .iter()
                .next()
                .ok_or_else(|| invalid(path, "empty union object"))?;
            let branch = branches
                .iter()
                .position(|b| &b.type_name() == label)
                .ok_or_else(|| invalid(path, format!("'{}' is not a branch of {}", label, schema)))?;
            let value = value_from_json(&branches[branch], inner_json, types, path)?;
            Ok(Value::union(branch, value))
        }
    }
}

fn primitive_from_json(kind: PrimitiveKind, json: &Json, path: &str) -> RecordResult<Value> {
    let mismatch = || invalid(path, format!("expected {}", kind.name()));
    match kind {
        PrimitiveKind::Null => json.is_null().then_some(Value::Null).ok_or_else(mismatch),
        PrimitiveKind::Boolean => json.as_bool().map(Value::Boolean).ok_or_else(mismatch),
        PrimitiveKind::Int => json
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(Value::Int)
            .ok_or_else(mismatch),
        PrimitiveKind::Long => json.as_i64().map(Value::Long).ok_or_else(mismatch),
        PrimitiveKind::Float => json.as_f64().map(|v| Value::Float(v as f32)).ok_or_else(mismatch),
        PrimitiveKind::Double => json.as_f64().map(Value::Double).ok_or_else(mismatch),
        PrimitiveKind::Bytes => bytes_from_json(json, path).map(Value::Bytes),
        PrimitiveKind::String => json.as_str().map(|s| Value::String(s.to_string())).ok_or_else(mismatch),
    }
}

fn bytes_from_json(json: &Json, path: &str) -> RecordResult<Vec<u8>> {
    let items = json.as_array().ok_or_else(|| invalid(path, "expected an array of bytes"))?;
    items
        .iter()
        .map(|item| {
            item.as_u64()
                .and_then(|b| u8::try_from(b).ok())
                .ok_or_else(|| invalid(path, "byte values must be in 0..=255"))
        })
        .collect()
}

/// Converts a value of `schema` into JSON.
///
/// A value that does not conform renders as `null`.
pub fn value_to_json(value: &Value, schema: &SchemaType) -> Json {
    match (schema, value) {
        (_, Value::Null) if !matches!(schema, SchemaType::Union(_)) => Json::Null,
        (_, Value::Boolean(v)) => Json::Bool(*v),
        (_, Value::Int(v)) => Json::from(*v),
        (_, Value::Long(v)) => Json::from(*v),
        (_, Value::Float(v)) => Number::from_f64(f64::from(*v)).map_or(Json::Null, Json::Number),
        (_, Value::Double(v)) => Number::from_f64(*v).map_or(Json::Null, Json::Number),
        (_, Value::String(v)) => Json::String(v.clone()),
        (_, Value::Bytes(v)) | (_, Value::Fixed(v)) => Json::Array(v.iter().map(|b| Json::from(*b)).collect()),
        (SchemaType::Enum(e), Value::Enum(ordinal)) => {
            e.symbols.get(*ordinal).map_or(Json::Null, |s| Json::String(s.clone()))
        }
        (_, Value::Record(record)) => record_to_json(record),
        (SchemaType::Array(element), Value::Array(items)) => {
            Json::Array(items.iter().map(|item| value_to_json(item, element)).collect())
        }
        (SchemaType::Map(value_schema), Value::Map(map)) => Json::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), value_to_json(v, value_schema)))
                .collect(),
        ),
        (SchemaType::Union(branches), value) => match schema.nullable_inner() {
            Some(inner) => value_to_json(value, inner),
            None => match value {
                Value::Union { branch, value } => match branches.get(*branch) {
                    Some(b) if b.is_null() => Json::Null,
                    Some(b) => {
                        let mut object = JsonMap::new();
                        object.insert(b.type_name(), value_to_json(value, b));
                        Json::Object(object)
                    }
                    None => Json::Null,
                },
                _ => Json::Null,
            },
        },
        _ => Json::Null,
    }
}

/// Renders every field of a record as a JSON object
pub fn record_to_json(record: &Record) -> Json {
    let object: JsonMap<String, Json> = record
        .descriptor()
        .fields()
        .iter()
        .zip(record.slots())
        .map(|(field, value)| (field.name().to_string(), value_to_json(value, field.schema())))
        .collect();
    Json::Object(object)
}

/// Renders only the readable fields of a record
pub fn readable_to_json(record: &Record) -> Json {
    let object: JsonMap<String, Json> = record
        .descriptor()
        .fields()
        .iter()
        .zip(record.slots())
        .filter(|(field, _)| record.is_readable(field.index()))
        .map(|(field, value)| (field.name().to_string(), value_to_json(value, field.schema())))
        .collect();
    Json::Object(object)
}
