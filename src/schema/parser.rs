//! JSON schema definition parser
//!
//! Schema documents use the conventional JSON record-schema dialect:
//!
//! ```text
//! {"type": "record", "name": "WebPage", "namespace": "org.example",
//!  "fields": [
//!     {"name": "url",      "type": "string"},
//!     {"name": "title",    "type": ["null", "string"]},
//!     {"name": "outlinks", "type": {"type": "map", "values": "string"}}
//!  ]}
//! ```
//!
//! Parsing is two-pass so that named types may be referenced before their
//! definition and records may be (mutually) recursive:
//!
//! 1. declare every named type (record, enum, fixed) reachable in the documents
//! 2. resolve every node, binding name references to the declared types

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::Value;

use super::errors::{SchemaError, SchemaResult};
use super::types::{EnumSchema, FixedSchema, PrimitiveKind, RecordSchema, SchemaType};

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static pattern"))
}

/// Splits `a.b.C` into (`Some("a.b")`, `"C"`); a bare name inherits `enclosing`.
fn split_full_name(name: &str, explicit_ns: Option<&str>, enclosing: Option<&str>) -> (Option<String>, String) {
    match name.rfind('.') {
        Some(dot) => (Some(name[..dot].to_string()), name[dot + 1..].to_string()),
        None => {
            let ns = explicit_ns.or(enclosing).filter(|ns| !ns.is_empty());
            (ns.map(str::to_string), name.to_string())
        }
    }
}

fn full_name(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) => format!("{}.{}", ns, name),
        None => name.to_string(),
    }
}

fn validate_name(node: &str, namespace: Option<&str>, name: &str) -> SchemaResult<()> {
    if !name_pattern().is_match(name) {
        return Err(SchemaError::malformed(node, format!("invalid name '{}'", name)));
    }
    if let Some(ns) = namespace {
        for segment in ns.split('.') {
            if !name_pattern().is_match(segment) {
                return Err(SchemaError::malformed(node, format!("invalid namespace '{}'", ns)));
            }
        }
    }
    Ok(())
}

fn str_field<'a>(obj: &'a serde_json::Map<String, Value>, key: &str, node: &str) -> SchemaResult<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| SchemaError::malformed(node, format!("missing string attribute '{}'", key)))
}

/// Parser holding the named types seen so far.
///
/// Named types persist across calls, so a later document may refer to a type
/// defined by an earlier one.
#[derive(Debug, Default)]
pub struct SchemaParser {
    named: HashMap<String, SchemaType>,
}

impl SchemaParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses one schema from JSON text
    pub fn parse_str(&mut self, text: &str) -> SchemaResult<SchemaType> {
        let json: Value = serde_json::from_str(text)
            .map_err(|e| SchemaError::malformed("<input>", format!("invalid JSON: {}", e)))?;
        let mut parsed = self.parse_documents(std::slice::from_ref(&json))?;
        Ok(parsed.remove(0))
    }

    /// Parses a batch of schema documents as one unit.
    ///
    /// References may cross document boundaries in either direction.
    pub fn parse_documents(&mut self, documents: &[Value]) -> SchemaResult<Vec<SchemaType>> {
        for doc in documents {
            self.declare(doc, None)?;
        }
        documents.iter().map(|doc| self.resolve(doc, None, "<root>")).collect()
    }

    /// Looks up a named type by full name
    pub fn named_type(&self, full_name: &str) -> Option<&SchemaType> {
        self.named.get(full_name)
    }

    /// Returns the number of named types known to the parser
    pub fn named_count(&self) -> usize {
        self.named.len()
    }

    fn register(&mut self, full: String, schema: SchemaType) -> SchemaResult<()> {
        if self.named.contains_key(&full) {
            return Err(SchemaError::malformed(&full, "named type defined more than once"));
        }
        self.named.insert(full, schema);
        Ok(())
    }

    /// Pass 1: declare named types
    fn declare(&mut self, json: &Value, enclosing: Option<&str>) -> SchemaResult<()> {
        match json {
            Value::Array(branches) => {
                for branch in branches {
                    self.declare(branch, enclosing)?;
                }
                Ok(())
            }
            Value::Object(obj) => {
                let Some(tag) = obj.get("type") else {
                    return Ok(());
                };
                let tag = match tag {
                    Value::String(s) => s.as_str(),
                    nested => return self.declare(nested, enclosing),
                };
                match tag {
                    "record" | "enum" | "fixed" => {
                        let raw_name = str_field(obj, "name", "<anonymous>")?;
                        let explicit_ns = obj.get("namespace").and_then(Value::as_str);
                        let (ns, name) = split_full_name(raw_name, explicit_ns, enclosing);
                        let full = full_name(ns.as_deref(), &name);
                        validate_name(&full, ns.as_deref(), &name)?;

                        match tag {
                            "record" => {
                                let doc = obj.get("doc").and_then(Value::as_str).map(str::to_string);
                                let record = RecordSchema::declare_with_doc(name, ns.clone(), doc);
                                self.register(full.clone(), SchemaType::Record(record))?;
                                let fields = obj
                                    .get("fields")
                                    .and_then(Value::as_array)
                                    .ok_or_else(|| SchemaError::malformed(&full, "record requires a 'fields' array"))?;
                                for field in fields {
                                    if let Some(field_type) = field.get("type") {
                                        self.declare(field_type, ns.as_deref())?;
                                    }
                                }
                            }
                            "enum" => {
                                let symbols = obj
                                    .get("symbols")
                                    .and_then(Value::as_array)
                                    .ok_or_else(|| SchemaError::malformed(&full, "enum requires a 'symbols' array"))?;
                                let mut names = Vec::with_capacity(symbols.len());
                                for symbol in symbols {
                                    let symbol = symbol
                                        .as_str()
                                        .ok_or_else(|| SchemaError::malformed(&full, "enum symbols must be strings"))?;
                                    validate_name(&full, None, symbol)?;
                                    names.push(symbol.to_string());
                                }
                                let schema = EnumSchema::new(name, ns, names)?;
                                self.register(full, SchemaType::Enum(Arc::new(schema)))?;
                            }
                            _ => {
                                let size = obj
                                    .get("size")
                                    .and_then(Value::as_u64)
                                    .ok_or_else(|| SchemaError::malformed(&full, "fixed requires a non-negative 'size'"))?;
                                let schema = FixedSchema::new(name, ns, size as usize);
                                self.register(full, SchemaType::Fixed(Arc::new(schema)))?;
                            }
                        }
                        Ok(())
                    }
                    "array" => match obj.get("items") {
                        Some(items) => self.declare(items, enclosing),
                        None => Ok(()),
                    },
                    "map" => match obj.get("values") {
                        Some(values) => self.declare(values, enclosing),
                        None => Ok(()),
                    },
                    _ => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }

    fn lookup(&self, reference: &str, namespace: Option<&str>) -> Option<SchemaType> {
        if !reference.contains('.') {
            if let Some(ns) = namespace {
                if let Some(found) = self.named.get(&full_name(Some(ns), reference)) {
                    return Some(found.clone());
                }
            }
        }
        self.named.get(reference).cloned()
    }

    /// Pass 2: resolve a node
    fn resolve(&self, json: &Value, namespace: Option<&str>, context: &str) -> SchemaResult<SchemaType> {
        match json {
            Value::String(name) => {
                if let Some(kind) = PrimitiveKind::from_name(name) {
                    return Ok(SchemaType::Primitive(kind));
                }
                self.lookup(name, namespace)
                    .ok_or_else(|| SchemaError::undefined_type(context, name))
            }
            Value::Array(branches) => self.resolve_union(branches, namespace, context),
            Value::Object(obj) => self.resolve_object(obj, namespace, context),
            other => Err(SchemaError::malformed(
                context,
                format!("expected a schema, found {}", other),
            )),
        }
    }

    fn resolve_union(&self, branches: &[Value], namespace: Option<&str>, context: &str) -> SchemaResult<SchemaType> {
        if branches.is_empty() {
            return Err(SchemaError::malformed(context, "union must have at least one branch"));
        }
        let mut resolved: Vec<SchemaType> = Vec::with_capacity(branches.len());
        for branch in branches {
            let schema = self.resolve(branch, namespace, context)?;
            if matches!(schema, SchemaType::Union(_)) {
                return Err(SchemaError::unsupported_type(context, "union nested in union"));
            }
            let label = schema.type_name();
            if resolved.iter().any(|b| b.type_name() == label) {
                return Err(SchemaError::malformed(
                    context,
                    format!("union declares branch '{}' more than once", label),
                ));
            }
            resolved.push(schema);
        }
        Ok(SchemaType::Union(resolved))
    }

    fn resolve_object(
        &self,
        obj: &serde_json::Map<String, Value>,
        namespace: Option<&str>,
        context: &str,
    ) -> SchemaResult<SchemaType> {
        let tag = obj
            .get("type")
            .ok_or_else(|| SchemaError::malformed(context, "schema object requires a 'type'"))?;
        let tag = match tag {
            Value::String(s) => s.as_str(),
            nested => return self.resolve(nested, namespace, context),
        };

        match tag {
            "record" | "enum" | "fixed" => {
                let raw_name = str_field(obj, "name", context)?;
                let explicit_ns = obj.get("namespace").and_then(Value::as_str);
                let (ns, name) = split_full_name(raw_name, explicit_ns, namespace);
                let full = full_name(ns.as_deref(), &name);
                let declared = self
                    .named
                    .get(&full)
                    .cloned()
                    .ok_or_else(|| SchemaError::undefined_type(context, &full))?;

                if let SchemaType::Record(record) = &declared {
                    if !record.is_defined() {
                        let fields = obj.get("fields").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
                        let mut resolved = Vec::with_capacity(fields.len());
                        for field in fields {
                            let field_obj = field
                                .as_object()
                                .ok_or_else(|| SchemaError::malformed(&full, "field must be an object"))?;
                            let field_name = str_field(field_obj, "name", &full)?;
                            validate_name(&full, None, field_name)?;
                            let field_type = field_obj.get("type").ok_or_else(|| {
                                SchemaError::malformed(&full, format!("field '{}' has no type", field_name))
                            })?;
                            let node = format!("{}.{}", full, field_name);
                            let schema = self.resolve(field_type, ns.as_deref(), &node)?;
                            resolved.push((field_name.to_string(), schema));
                        }
                        record.define(resolved)?;
                    }
                }
                Ok(declared)
            }
            "array" => {
                let items = obj
                    .get("items")
                    .ok_or_else(|| SchemaError::malformed(context, "array requires 'items'"))?;
                Ok(SchemaType::array(self.resolve(items, namespace, context)?))
            }
            "map" => {
                let values = obj
                    .get("values")
                    .ok_or_else(|| SchemaError::malformed(context, "map requires 'values'"))?;
                Ok(SchemaType::map(self.resolve(values, namespace, context)?))
            }
            other => {
                if let Some(kind) = PrimitiveKind::from_name(other) {
                    return Ok(SchemaType::Primitive(kind));
                }
                match self.lookup(other, namespace) {
                    Some(named) => Ok(named),
                    None => Err(SchemaError::unsupported_type(context, other)),
                }
            }
        }
    }
}
