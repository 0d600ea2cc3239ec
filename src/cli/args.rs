//! CLI argument definitions using clap
//!
//! Commands:
//! - docgate check --config <path>
//! - docgate validate --config <path> --model <name>
//! - docgate normalize --config <path> --model <name>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docgate - document validation and normalization against model descriptors
#[derive(Parser, Debug)]
#[command(name = "docgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load every model and report configuration warnings
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./docgate.json")]
        config: PathBuf,
    },

    /// Validate one document read from stdin
    Validate {
        /// Path to configuration file
        #[arg(long, default_value = "./docgate.json")]
        config: PathBuf,

        /// Model (repository) name
        #[arg(long)]
        model: String,
    },

    /// Apply unconditional and policy format rules to one document read from stdin
    Normalize {
        /// Path to configuration file
        #[arg(long, default_value = "./docgate.json")]
        config: PathBuf,

        /// Model (repository) name
        #[arg(long)]
        model: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
