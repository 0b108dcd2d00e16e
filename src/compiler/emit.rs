//! Rust source generation
//!
//! Renders one wrapper struct per compiled record. A wrapper owns a `Record`,
//! exposes one `usize` constant per field ordinal, and one accessor per
//! accessor shape of each field. Enum and fixed schemas become unit structs
//! carrying their symbol ordinals or size.
//!
//! Output depends only on the compiled types, so emitting the same type set
//! twice yields identical source.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use super::graph::CompiledTypes;
use super::descriptor::{Accessor, FieldDescriptor, RecordTypeDescriptor};
use super::naming::{constant_name, method_suffix, unique_name};
use crate::observability::{log_event_with_fields, Event};
use crate::schema::{PrimitiveKind, SchemaType};

/// Identifiers the generated module imports
const RESERVED_NAMES: &[&str] = &[
    "Arc",
    "Persistent",
    "Record",
    "RecordError",
    "RecordResult",
    "RecordTypeDescriptor",
    "Value",
];

/// Associated constants every wrapper declares
const RESERVED_CONSTANTS: &[&str] = &["TYPE_NAME", "FIELD_COUNT"];

/// Renders Rust source for every record, enum and fixed type
pub fn emit_rust(types: &CompiledTypes) -> String {
    let source = Emitter::new(types).emit();
    log_event_with_fields(
        Event::SourceGenerated,
        &[
            ("records", &types.record_count().to_string()),
            ("bytes", &source.len().to_string()),
        ],
    );
    source
}

struct Emitter<'a> {
    types: &'a CompiledTypes,
    output: String,
    used_names: HashSet<String>,
    /// full schema name -> generated identifier
    type_names: HashMap<String, String>,
}

impl<'a> Emitter<'a> {
    fn new(types: &'a CompiledTypes) -> Self {
        Self {
            types,
            output: String::with_capacity(4096),
            used_names: RESERVED_NAMES.iter().map(|s| s.to_string()).collect(),
            type_names: HashMap::new(),
        }
    }

    fn emit(mut self) -> String {
        let types = self.types;
        self.assign_names();
        self.emit_header();
        for e in types.enums() {
            let name = self.type_names[&e.full_name()].clone();
            self.emit_enum(&name, &e.full_name(), &e.symbols);
        }
        for f in types.fixed() {
            let name = self.type_names[&f.full_name()].clone();
            self.emit_fixed(&name, &f.full_name(), f.size);
        }
        for descriptor in types.records() {
            let name = self.type_names[descriptor.full_name()].clone();
            self.emit_record(&name, descriptor);
        }
        self.output
    }

    fn assign_names(&mut self) {
        let types = self.types;
        let mut names: Vec<(String, String)> = Vec::new();
        for e in types.enums() {
            names.push((e.full_name(), e.name.clone()));
        }
        for f in types.fixed() {
            names.push((f.full_name(), f.name.clone()));
        }
        for d in types.records() {
            names.push((d.full_name().to_string(), d.name().to_string()));
        }
        for (full, short) in names {
            let ident = unique_name(&short, &mut self.used_names);
            self.type_names.insert(full, ident);
        }
    }

    fn emit_header(&mut self) {
        self.output.push_str("// Generated by recordc from compiled record schemas. Do not edit.\n\n");
        self.output.push_str("use std::sync::Arc;\n\n");
        self.output.push_str("use recordstate::compiler::RecordTypeDescriptor;\n");
        self.output
            .push_str("use recordstate::record::{Persistent, Record, RecordError, RecordResult, Value};\n");
    }

    fn emit_enum(&mut self, name: &str, full_name: &str, symbols: &[String]) {
        let out = &mut self.output;
        let _ = writeln!(out, "\n/// Symbols of enum `{}`", full_name);
        let _ = writeln!(out, "pub struct {};", name);
        let _ = writeln!(out, "\nimpl {} {{", name);
        for (ordinal, symbol) in symbols.iter().enumerate() {
            let _ = writeln!(out, "    pub const {}: usize = {};", constant_name(symbol), ordinal);
        }
        let quoted: Vec<String> = symbols.iter().map(|s| format!("{:?}", s)).collect();
        let _ = writeln!(out, "    pub const SYMBOLS: &'static [&'static str] = &[{}];", quoted.join(", "));
        out.push_str("}\n");
    }

    fn emit_fixed(&mut self, name: &str, full_name: &str, size: usize) {
        let out = &mut self.output;
        let _ = writeln!(out, "\n/// Fixed `{}`", full_name);
        let _ = writeln!(out, "pub struct {};", name);
        let _ = writeln!(out, "\nimpl {} {{", name);
        let _ = writeln!(out, "    pub const SIZE: usize = {};", size);
        out.push_str("}\n");
    }

    fn emit_record(&mut self, name: &str, descriptor: &RecordTypeDescriptor) {
        let constants = field_constants(descriptor);
        let out = &mut self.output;

        let _ = writeln!(out, "\n/// Record `{}`", descriptor.full_name());
        if let Some(doc) = descriptor.schema().doc() {
            let _ = writeln!(out, "///\n/// {}", doc.replace('\n', " "));
        }
        out.push_str("#[derive(Debug, Clone, PartialEq)]\n");
        let _ = writeln!(out, "pub struct {} {{\n    record: Record,\n}}", name);

        let _ = writeln!(out, "\nimpl {} {{", name);
        let _ = writeln!(out, "    pub const TYPE_NAME: &'static str = {:?};", descriptor.full_name());
        let _ = writeln!(out, "    pub const FIELD_COUNT: usize = {};\n", descriptor.field_count());
        for (field, constant) in descriptor.fields().iter().zip(&constants) {
            let _ = writeln!(out, "    pub const {}: usize = {};", constant, field.index());
        }

        out.push_str(
            "
    pub fn new(descriptor: &Arc<RecordTypeDescriptor>) -> RecordResult<Self> {
        Self::from_record(descriptor.new_instance())
    }

    pub fn from_record(record: Record) -> RecordResult<Self> {
        if record.type_name() != Self::TYPE_NAME {
            return Err(RecordError::DescriptorMismatch {
                expected: Self::TYPE_NAME.to_string(),
                found: record.type_name().to_string(),
            });
        }
        Ok(Self { record })
    }

    pub fn into_record(self) -> Record {
        self.record
    }
",
        );

        for (field, constant) in descriptor.fields().iter().zip(&constants) {
            emit_accessors(out, field, constant);
        }
        out.push_str("}\n");

        let _ = writeln!(out, "\nimpl Persistent for {} {{", name);
        out.push_str(
            "    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn new_instance(&self) -> Self {
        Self {
            record: self.record.new_instance(),
        }
    }
}
",
        );
    }
}

/// Field constants, renamed where they would clash with a reserved constant
fn field_constants(descriptor: &RecordTypeDescriptor) -> Vec<String> {
    let mut used: HashSet<String> = RESERVED_CONSTANTS.iter().map(|s| s.to_string()).collect();
    descriptor
        .fields()
        .iter()
        .map(|field| unique_name(field.constant_name(), &mut used))
        .collect()
}

fn emit_accessors(out: &mut String, field: &FieldDescriptor, constant: &str) {
    let suffix = method_suffix(field.name());
    for accessor in field.accessors() {
        out.push('\n');
        match accessor {
            Accessor::Get => {
                let _ = writeln!(
                    out,
                    "    pub fn get_{}(&self) -> RecordResult<&Value> {{\n        self.record.get(Self::{})\n    }}",
                    suffix, constant
                );
            }
            Accessor::Set => {
                let ty = rust_type(field.schema());
                let _ = writeln!(
                    out,
                    "    pub fn set_{}(&mut self, value: {}) -> RecordResult<()> {{\n        self.record.set(Self::{}, Value::from(value))\n    }}",
                    suffix, ty, constant
                );
            }
            Accessor::Append => {
                let ty = field.element_schema().map_or("Value".to_string(), rust_type);
                let _ = writeln!(
                    out,
                    "    pub fn append_to_{}(&mut self, item: {}) -> RecordResult<()> {{\n        self.record.append(Self::{}, Value::from(item))\n    }}",
                    suffix, ty, constant
                );
            }
            Accessor::GetEntry => {
                let _ = writeln!(
                    out,
                    "    pub fn get_from_{}(&self, key: &str) -> RecordResult<Option<&Value>> {{\n        self.record.map_get(Self::{}, key)\n    }}",
                    suffix, constant
                );
            }
            Accessor::PutEntry => {
                let ty = field.map_value_schema().map_or("Value".to_string(), rust_type);
                let _ = writeln!(
                    out,
                    "    pub fn put_to_{}(&mut self, key: impl Into<String>, value: {}) -> RecordResult<Option<Value>> {{\n        self.record.map_put(Self::{}, key, Value::from(value))\n    }}",
                    suffix, ty, constant
                );
            }
            Accessor::RemoveEntry => {
                let _ = writeln!(
                    out,
                    "    pub fn remove_from_{}(&mut self, key: &str) -> RecordResult<Option<Value>> {{\n        self.record.map_remove(Self::{}, key)\n    }}",
                    suffix, constant
                );
            }
        }
    }
}

/// Rust parameter type for a setter; `Value` where no plain type fits
fn rust_type(schema: &SchemaType) -> String {
    if let Some(inner) = schema.nullable_inner() {
        return match primitive_type(inner) {
            Some(ty) => format!("Option<{}>", ty),
            None => "Value".to_string(),
        };
    }
    primitive_type(schema).unwrap_or("Value").to_string()
}

fn primitive_type(schema: &SchemaType) -> Option<&'static str> {
    match schema {
        SchemaType::Primitive(kind) => match kind {
            PrimitiveKind::Null => None,
            PrimitiveKind::Boolean => Some("bool"),
            PrimitiveKind::Int => Some("i32"),
            PrimitiveKind::Long => Some("i64"),
            PrimitiveKind::Float => Some("f32"),
            PrimitiveKind::Double => Some("f64"),
            PrimitiveKind::Bytes => Some("Vec<u8>"),
            PrimitiveKind::String => Some("String"),
        },
        _ => None,
    }
}
