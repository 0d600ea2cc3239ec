//! Observability subsystem
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle events
//! - Validation counters
//!
//! Observability is read-only: it never changes a validation outcome.
//!
//! # Usage
//!
//! ```ignore
//! use docgate::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::ModelWarning, &[("model", "users"), ("path", "age")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsSnapshot, ValidationMetrics};

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_warning() {
        Severity::Warn
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        // This just verifies no panic
        log_event(Event::ConfigLoaded);
        log_event(Event::ValidationBegin);
    }

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::ModelWarning, &[("model", "users"), ("message", "x")]);
    }
}
