//! Observable events
//!
//! Events are explicit and typed. Each event carries the severity it is
//! logged at.

use std::fmt;

use super::logger::Severity;

/// Observable events of the schema compiler and the record codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Schema
    /// Schema files parsed into the registry
    SchemaLoaded,

    // Compiler
    /// Schema graph traversal begins
    CompileStart,
    /// Descriptors built for every reachable record
    CompileComplete,
    /// Rust source rendered for a compiled type set
    SourceGenerated,

    // Codec
    /// Codec configuration loaded from file
    ConfigLoaded,
    /// Record encoded to bytes
    RecordEncoded,
    /// Record decoded from bytes
    RecordDecoded,
    /// Decode rejected its input
    DecodeFailed,
    /// Frame checksum mismatch
    FrameCorrupt,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::SchemaLoaded => "SCHEMA_LOADED",
            Event::CompileStart => "COMPILE_BEGIN",
            Event::CompileComplete => "COMPILE_COMPLETE",
            Event::SourceGenerated => "SOURCE_GENERATED",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::RecordEncoded => "RECORD_ENCODED",
            Event::RecordDecoded => "RECORD_DECODED",
            Event::DecodeFailed => "DECODE_FAILED",
            Event::FrameCorrupt => "FRAME_CORRUPT",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::RecordEncoded | Event::RecordDecoded => Severity::Trace,
            Event::DecodeFailed => Severity::Warn,
            Event::FrameCorrupt => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::SchemaLoaded,
            Event::CompileStart,
            Event::CompileComplete,
            Event::SourceGenerated,
            Event::ConfigLoaded,
            Event::RecordEncoded,
            Event::RecordDecoded,
            Event::DecodeFailed,
            Event::FrameCorrupt,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_per_record_events_are_trace() {
        assert_eq!(Event::RecordEncoded.severity(), Severity::Trace);
        assert_eq!(Event::RecordDecoded.severity(), Severity::Trace);
        assert_eq!(Event::FrameCorrupt.severity(), Severity::Error);
        assert_eq!(Event::CompileComplete.severity(), Severity::Info);
    }

    #[test]
    fn test_event_display() {
        assert_eq!(format!("{}", Event::CompileStart), "COMPILE_BEGIN");
    }
}
