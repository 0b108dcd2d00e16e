//! Observability subsystem
//!
//! Structured logging of compiler and codec lifecycle events.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on compile, encode or decode results
//! 3. No async or background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use recordstate::observability::{log_event_with_fields, Event, Logger, Severity};
//!
//! Logger::set_min_severity(Severity::Trace);
//! log_event_with_fields(Event::CompileComplete, &[("records", "3")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log a lifecycle event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

/// Sets the process-wide minimum severity
pub fn set_min_severity(severity: Severity) {
    Logger::set_min_severity(severity);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        // Verifies no panic
        log_event(Event::CompileStart);
        log_event(Event::RecordEncoded);
    }

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::SchemaLoaded, &[("path", "/tmp/schemas")]);
    }

    #[test]
    fn test_trace_disabled_by_default() {
        assert!(!Logger::enabled(Severity::Trace));
        assert!(Logger::enabled(Severity::Error));
    }
}
