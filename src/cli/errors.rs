//! CLI-specific error types
//!
//! Every CLI error ends the command with a non-zero exit status.

use std::fmt;
use std::io;

use crate::codec::CodecError;
use crate::record::RecordError;
use crate::schema::SchemaError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Schema file could not be loaded or compiled
    SchemaError,
    /// Codec configuration or payload error
    CodecError,
    /// Input document does not fit the record type
    RecordError,
    /// Unknown record type or log level
    UsageError,
    /// I/O error (stdin/stdout/files)
    IoError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::SchemaError => "REC_CLI_SCHEMA_ERROR",
            Self::CodecError => "REC_CLI_CODEC_ERROR",
            Self::RecordError => "REC_CLI_RECORD_ERROR",
            Self::UsageError => "REC_CLI_USAGE_ERROR",
            Self::IoError => "REC_CLI_IO_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::UsageError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<base64::DecodeError> for CliError {
    fn from(e: base64::DecodeError) -> Self {
        Self::io_error(format!("invalid base64 input: {}", e))
    }
}

impl From<SchemaError> for CliError {
    fn from(e: SchemaError) -> Self {
        Self::new(CliErrorCode::SchemaError, e.to_string())
    }
}

impl From<CodecError> for CliError {
    fn from(e: CodecError) -> Self {
        Self::new(CliErrorCode::CodecError, e.to_string())
    }
}

impl From<RecordError> for CliError {
    fn from(e: RecordError) -> Self {
        Self::new(CliErrorCode::RecordError, e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
