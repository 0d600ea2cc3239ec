//! docgate - document validation and normalization for schema-described repositories
//!
//! A document (JSON object) is checked against the model descriptor of its
//! repository: required fields, creation-context and conditional
//! requirements, policy requirements, typed formats and uniqueness. The
//! result is an error report keyed by field path plus a normalized copy of
//! the document.

pub mod cli;
pub mod model;
pub mod observability;
pub mod validation;
