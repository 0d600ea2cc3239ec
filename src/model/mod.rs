//! Model descriptors
//!
//! A model descriptor carries the field rules of one repository (users,
//! files, generic objects). Descriptors are loaded once at startup and are
//! read-only afterwards.

mod errors;
mod loader;
mod types;

pub use errors::{ModelError, ModelErrorCode, ModelResult, Severity};
pub use loader::ModelLoader;
pub(crate) use types::is_valid_path;
pub use types::{
    Condition, ConditionOperation, ConditionalRequirement, FormatKind, FormatRule, ModelDescriptor,
    DEFAULT_CONTEXT, MAX_SAFE_INTEGER, MIN_SAFE_INTEGER,
};
