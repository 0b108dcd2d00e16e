//! Stdin/stdout handling for CLI
//!
//! - Input: one document (JSON or base64) read whole from the source
//! - Output: one JSON document or one text block per command
//! - UTF-8 only

use std::io::{Read, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Reads the whole input as trimmed UTF-8 text
pub fn read_input<R: Read>(input: &mut R) -> CliResult<String> {
    let mut text = String::new();
    input.read_to_string(&mut text)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CliError::io_error("Empty input"));
    }
    Ok(trimmed.to_string())
}

/// Reads one JSON document from the input
pub fn read_json<R: Read>(input: &mut R) -> CliResult<Value> {
    let text = read_input(input)?;
    Ok(serde_json::from_str(&text)?)
}

/// Writes a JSON document followed by a newline
pub fn write_json<W: Write>(output: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer_pretty(&mut *output, value)?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

/// Writes one line of text
pub fn write_line<W: Write>(output: &mut W, line: &str) -> CliResult<()> {
    writeln!(output, "{}", line)?;
    output.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_rejected() {
        let mut input: &[u8] = b"  \n";
        assert!(read_input(&mut input).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let mut input: &[u8] = b"{\"a\": 1}\n";
        let value = read_json(&mut input).unwrap();
        let mut output = Vec::new();
        write_json(&mut output, &value).unwrap();
        let parsed: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(parsed, value);
    }
}
