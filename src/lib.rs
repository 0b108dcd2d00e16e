//! recordstate - schema-compiled records with field-level change tracking
//!
//! Schema Model → Type Compiler → Record Runtime → Stateful Codec

pub mod cli;
pub mod codec;
pub mod compiler;
pub mod observability;
pub mod record;
pub mod schema;
