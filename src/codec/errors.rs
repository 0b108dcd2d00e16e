//! Codec error types
//!
//! Error codes:
//! - REC_CODEC_SCHEMA_MISMATCH: bitmap length or record type disagrees with the schema
//! - REC_CODEC_TRUNCATED_STREAM: input ended before the value did
//! - REC_CODEC_MALFORMED_PAYLOAD: bytes present but not a valid encoding
//! - REC_CODEC_VALUE_MISMATCH: encode found a value that does not fit its schema
//! - REC_CODEC_CORRUPTION: frame checksum mismatch
//! - REC_CODEC_INVALID_CONFIG: codec configuration rejected
//! - REC_CODEC_IO_ERROR: caller-supplied sink or source failed
//!
//! Every decode error is fatal for that decode call only: no partial record is
//! returned and nothing is retried here.

use std::fmt;
use std::io;

/// Codec-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecErrorCode {
    SchemaMismatch,
    TruncatedStream,
    MalformedPayload,
    ValueMismatch,
    Corruption,
    InvalidConfig,
    Io,
}

impl CodecErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            CodecErrorCode::SchemaMismatch => "REC_CODEC_SCHEMA_MISMATCH",
            CodecErrorCode::TruncatedStream => "REC_CODEC_TRUNCATED_STREAM",
            CodecErrorCode::MalformedPayload => "REC_CODEC_MALFORMED_PAYLOAD",
            CodecErrorCode::ValueMismatch => "REC_CODEC_VALUE_MISMATCH",
            CodecErrorCode::Corruption => "REC_CODEC_CORRUPTION",
            CodecErrorCode::InvalidConfig => "REC_CODEC_INVALID_CONFIG",
            CodecErrorCode::Io => "REC_CODEC_IO_ERROR",
        }
    }

    /// Returns whether the error was raised while reading input bytes
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            CodecErrorCode::SchemaMismatch
                | CodecErrorCode::TruncatedStream
                | CodecErrorCode::MalformedPayload
                | CodecErrorCode::Corruption
        )
    }
}

impl fmt::Display for CodecErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Codec error with the byte offset at which it was detected
#[derive(Debug)]
pub struct CodecError {
    code: CodecErrorCode,
    message: String,
    offset: Option<usize>,
    source: Option<io::Error>,
}

impl CodecError {
    fn new(code: CodecErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            offset: None,
            source: None,
        }
    }

    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::new(CodecErrorCode::SchemaMismatch, message)
    }

    /// Input ended at `offset` while `needed` more bytes were expected
    pub fn truncated(offset: usize, needed: usize) -> Self {
        Self::new(
            CodecErrorCode::TruncatedStream,
            format!("stream ended, {} more bytes expected", needed),
        )
        .at(offset)
    }

    pub fn malformed(offset: usize, message: impl Into<String>) -> Self {
        Self::new(CodecErrorCode::MalformedPayload, message).at(offset)
    }

    pub fn value_mismatch(message: impl Into<String>) -> Self {
        Self::new(CodecErrorCode::ValueMismatch, message)
    }

    pub fn corruption(message: impl Into<String>) -> Self {
        Self::new(CodecErrorCode::Corruption, message)
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(CodecErrorCode::InvalidConfig, message)
    }

    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        let mut err = Self::new(CodecErrorCode::Io, message);
        err.source = Some(source);
        err
    }

    /// Attaches the byte offset at which the error was detected
    pub fn at(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Prefixes the message with the field or element path being processed
    pub fn within(mut self, path: &str) -> Self {
        self.message = format!("{}: {}", path, self.message);
        self
    }

    pub fn code(&self) -> CodecErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn offset(&self) -> Option<usize> {
        self.offset
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ERROR] {}: {}", self.code.code(), self.message)?;
        if let Some(offset) = self.offset {
            write!(f, " (at byte {})", offset)?;
        }
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;
