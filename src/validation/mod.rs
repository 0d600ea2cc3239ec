//! Document validation
//!
//! Checks a JSON document against a [`ModelDescriptor`](crate::model::ModelDescriptor)
//! and produces an [`ErrorReport`] together with a normalized copy of the
//! document.
//!
//! A run goes through three stages over one flattened view of the document:
//! 1. Requirements (unconditional, creation context, conditional, policy)
//! 2. Formats (email, phone, trigram, oneOf, date, time, int)
//! 3. Uniqueness (concurrent duplicate lookups)
//!
//! Each path carries at most one error: the first stage to flag it wins.
//! Model defects never become document errors; they surface as
//! [`ConfigWarning`]s.

mod checker;
mod errors;
mod flatten;
mod format;
mod phone;
mod pipeline;
mod report;
mod resolver;
mod unique;

pub use checker::{apply_policy_formats, check_formats};
pub use errors::{LookupError, ValidationError, ValidationResult};
pub use flatten::{is_absent, json_type_name, FlatDocument, PathError, PathResult};
pub use format::{categorical_match, display_value, FormatFailure, FormatOptions, FormatResult};
pub use phone::{normalize_phone, PhoneRegion};
pub use pipeline::{
    FormatStage, RequirementStage, UniquenessStage, ValidationContext, ValidationOutcome,
    ValidationStage, Validator, ValidatorBuilder,
};
pub use report::{ConfigWarning, ErrorEntry, ErrorKind, ErrorReport, StageOutput};
pub use resolver::resolve_required;
pub use unique::{check_unique, DuplicateList, DuplicateLookup, MemoryLookup, UniqueCheck};
