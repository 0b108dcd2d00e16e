//! CLI argument definitions using clap
//!
//! Commands:
//! - recordc compile --schema <path>
//! - recordc generate --schema <path> [--out <file>]
//! - recordc encode --schema <path> --record <name> [--config <file>] [--framed]
//! - recordc decode --schema <path> --record <name> [--config <file>] [--framed]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// recordc - compile record schemas and encode change-tracked records
#[derive(Parser, Debug)]
#[command(name = "recordc")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Minimum severity of log lines written to stderr
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile schemas and print a descriptor summary as JSON
    Compile {
        /// Schema file or directory of *.json schema files
        #[arg(long)]
        schema: PathBuf,
    },

    /// Generate Rust source for the compiled record types
    Generate {
        /// Schema file or directory of *.json schema files
        #[arg(long)]
        schema: PathBuf,

        /// Output file (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Encode a JSON document read from stdin; prints base64
    Encode {
        /// Schema file or directory of *.json schema files
        #[arg(long)]
        schema: PathBuf,

        /// Full name of the record type
        #[arg(long)]
        record: String,

        /// Codec configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Wrap the payload in a checksummed frame
        #[arg(long)]
        framed: bool,
    },

    /// Decode a base64 payload read from stdin; prints values and state as JSON
    Decode {
        /// Schema file or directory of *.json schema files
        #[arg(long)]
        schema: PathBuf,

        /// Full name of the record type
        #[arg(long)]
        record: String,

        /// Codec configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Expect a checksummed frame
        #[arg(long)]
        framed: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
