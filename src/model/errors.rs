//! Model registry error types
//!
//! Error codes:
//! - DOCGATE_UNKNOWN_MODEL (REJECT)
//! - DOCGATE_MODEL_IMMUTABLE (REJECT)
//! - DOCGATE_MALFORMED_MODEL (FATAL)

use std::fmt;

/// Severity levels for model errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Caller request rejected
    Reject,
    /// Startup must abort
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Model-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelErrorCode {
    /// No model registered under the requested name
    UnknownModel,
    /// Attempt to replace a registered model
    ModelImmutable,
    /// Model file unreadable or not a valid descriptor
    MalformedModel,
}

impl ModelErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ModelErrorCode::UnknownModel => "DOCGATE_UNKNOWN_MODEL",
            ModelErrorCode::ModelImmutable => "DOCGATE_MODEL_IMMUTABLE",
            ModelErrorCode::MalformedModel => "DOCGATE_MALFORMED_MODEL",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            ModelErrorCode::MalformedModel => Severity::Fatal,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for ModelErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Model error with context
#[derive(Debug)]
pub struct ModelError {
    code: ModelErrorCode,
    message: String,
    model: Option<String>,
}

impl ModelError {
    /// Create an unknown model error
    pub fn unknown_model(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            code: ModelErrorCode::UnknownModel,
            message: format!("Model '{}' not found", name),
            model: Some(name),
        }
    }

    /// Create a model immutable error
    pub fn model_immutable(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            code: ModelErrorCode::ModelImmutable,
            message: format!("Model '{}' is already registered and cannot be replaced", name),
            model: Some(name),
        }
    }

    /// Create an error for a malformed model file
    pub fn malformed_model(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: ModelErrorCode::MalformedModel,
            message: format!("Malformed model file '{}': {}", path.into(), reason.into()),
            model: None,
        }
    }

    pub fn code(&self) -> ModelErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the model name if applicable
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for ModelError {}

/// Result type for model registry operations
pub type ModelResult<T> = Result<T, ModelError>;
