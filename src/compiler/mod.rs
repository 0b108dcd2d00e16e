//! Type compiler
//!
//! Turns schema graphs into record type descriptors, once, ahead of use:
//!
//! 1. Breadth-first traversal of every reachable record, enum and fixed schema
//! 2. One descriptor per record: ordered fields, name index, field kinds
//! 3. Nullable-union elision: `[null, T]` becomes an optional `T`
//! 4. Optional Rust source generation for the compiled types
//!
//! Descriptors are immutable after compilation and shared read-only.

mod descriptor;
mod emit;
mod graph;
mod naming;

pub use descriptor::{Accessor, FieldDescriptor, FieldKind, RecordFactory, RecordTypeDescriptor};
pub use emit::emit_rust;
pub use graph::{compile, CompiledTypes};
pub use naming::constant_name;
