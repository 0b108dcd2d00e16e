//! CLI module for recordc
//!
//! Provides command-line interface for:
//! - compile: Load and compile schemas, print the descriptor summary
//! - generate: Emit Rust source for the compiled record types
//! - encode: JSON document on stdin to a base64 payload on stdout
//! - decode: base64 payload on stdin to values and state bits on stdout

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{compile, decode, decoded_summary, encode, generate, load_types, run, run_command, types_summary};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_input, read_json, write_json, write_line};
