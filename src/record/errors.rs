//! Record access errors
//!
//! These are programmer errors: an index or name that does not belong to the
//! record type, or a value that does not fit the field schema.

use thiserror::Error;

use crate::compiler::FieldKind;

/// Record runtime errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("field index {index} out of range for {record} ({count} fields)")]
    InvalidFieldIndex { record: String, index: usize, count: usize },

    #[error("unknown field '{field}' in {record}")]
    UnknownField { record: String, field: String },

    #[error("field '{field}' of {record} is a {kind} field, operation requires {required}")]
    KindMismatch {
        record: String,
        field: String,
        kind: FieldKind,
        required: FieldKind,
    },

    #[error("{found} value does not conform to {expected} for field '{field}'")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    #[error("record type mismatch: expected {expected}, found {found}")]
    DescriptorMismatch { expected: String, found: String },

    #[error("invalid JSON for {path}: {reason}")]
    InvalidJson { path: String, reason: String },
}

impl RecordError {
    /// Returns whether this error signals a descriptor/record mismatch
    pub fn is_layout_error(&self) -> bool {
        matches!(
            self,
            RecordError::InvalidFieldIndex { .. } | RecordError::UnknownField { .. } | RecordError::DescriptorMismatch { .. }
        )
    }
}

/// Result type for record operations
pub type RecordResult<T> = Result<T, RecordError>;
