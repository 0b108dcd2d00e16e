//! Schema model
//!
//! In-memory representation of record shapes and the JSON schema definition
//! language they are read from.
//!
//! # Design Principles
//!
//! - Schemas are immutable once built and shared read-only
//! - Named types are shared through `Arc`; records may be recursive
//! - Construction is pure: no side effects besides reading schema files
//! - Every failure names the schema node that caused it

mod errors;
mod loader;
mod parser;
mod types;

pub use errors::{SchemaError, SchemaErrorCode, SchemaResult, Severity};
pub use loader::SchemaLoader;
pub use parser::SchemaParser;
pub use types::{EnumSchema, FieldSchema, FixedSchema, PrimitiveKind, RecordSchema, SchemaTag, SchemaType};
