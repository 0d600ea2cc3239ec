//! CLI module for docgate
//!
//! Provides command-line interface for:
//! - check: Load models and report configuration warnings
//! - validate: One-shot document validation
//! - normalize: One-shot policy-format normalization

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    check, check_report, load_lookup, normalize, normalize_request, run, run_command, validate,
    validate_request, Config, ValidationRequest,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{error_response, ok_response, read_request, write_json, write_response};
