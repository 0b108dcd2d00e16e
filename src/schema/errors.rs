//! Schema error types
//!
//! Error codes:
//! - REC_SCHEMA_MALFORMED (FATAL)
//! - REC_SCHEMA_DUPLICATE_FIELD (FATAL)
//! - REC_SCHEMA_UNSUPPORTED_TYPE (FATAL)
//! - REC_SCHEMA_IO_ERROR (ERROR)
//!
//! Every schema error stops compilation. Only I/O failures while reading schema
//! files are worth retrying against another path.

use std::fmt;
use std::io;

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, caller may retry with other input
    Error,
    /// Compilation must stop
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Undefined reference, bad name, redefinition or structurally invalid node
    MalformedSchema,
    /// A record declares two fields with the same name
    DuplicateFieldName,
    /// A schema node is not one of the supported kinds
    UnsupportedSchemaType,
    /// Schema file could not be read
    SchemaIo,
}

impl SchemaErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::MalformedSchema => "REC_SCHEMA_MALFORMED",
            SchemaErrorCode::DuplicateFieldName => "REC_SCHEMA_DUPLICATE_FIELD",
            SchemaErrorCode::UnsupportedSchemaType => "REC_SCHEMA_UNSUPPORTED_TYPE",
            SchemaErrorCode::SchemaIo => "REC_SCHEMA_IO_ERROR",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            SchemaErrorCode::SchemaIo => Severity::Error,
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema error with the offending schema node
#[derive(Debug)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    /// Full name of the schema node (or file path) that failed
    node: Option<String>,
    source: Option<io::Error>,
}

impl SchemaError {
    /// Create a malformed schema error
    pub fn malformed(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::MalformedSchema,
            message: reason.into(),
            node: Some(node.into()),
            source: None,
        }
    }

    /// Create an undefined type reference error
    pub fn undefined_type(node: impl Into<String>, reference: &str) -> Self {
        Self::malformed(node, format!("undefined type '{}'", reference))
    }

    /// Create a duplicate field name error
    pub fn duplicate_field(record: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::DuplicateFieldName,
            message: format!("field '{}' declared more than once", field.into()),
            node: Some(record.into()),
            source: None,
        }
    }

    /// Create an unsupported schema type error
    pub fn unsupported_type(node: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::UnsupportedSchemaType,
            message: format!("unsupported schema type '{}'", tag.into()),
            node: Some(node.into()),
            source: None,
        }
    }

    /// Create an error for an unreadable schema file
    pub fn io_error(path: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: SchemaErrorCode::SchemaIo,
            message: format!("failed to read schema: {}", source),
            node: Some(path.into()),
            source: Some(source),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the schema node (or path) that failed, if known
    pub fn node(&self) -> Option<&str> {
        self.node.as_deref()
    }

    /// Returns whether compilation must stop
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)?;
        if let Some(ref node) = self.node {
            write!(f, " (at {})", node)?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
