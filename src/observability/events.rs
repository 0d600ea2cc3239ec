//! Observable events emitted by docgate
//!
//! Events are explicit and typed.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration file loaded
    ConfigLoaded,
    /// Model descriptors loaded from disk
    ModelsLoaded,
    /// Model descriptor defect detected (unknown tag, malformed clause)
    ModelWarning,

    // Validation
    /// Validation run begins
    ValidationBegin,
    /// Validation run finished with an empty report
    ValidationComplete,
    /// Validation run finished with at least one error entry
    ValidationRejected,
    /// A duplicate lookup failed, aborting the run
    LookupFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ModelsLoaded => "MODELS_LOADED",
            Event::ModelWarning => "MODEL_WARNING",
            Event::ValidationBegin => "VALIDATION_BEGIN",
            Event::ValidationComplete => "VALIDATION_COMPLETE",
            Event::ValidationRejected => "VALIDATION_REJECTED",
            Event::LookupFailed => "LOOKUP_FAILED",
        }
    }

    /// Returns true if the event reports a problem an operator should see
    pub fn is_warning(&self) -> bool {
        matches!(self, Event::ModelWarning | Event::LookupFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
