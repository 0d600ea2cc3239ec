//! JSON I/O handling for CLI
//!
//! - Input: single JSON object via stdin
//! - Output: single JSON object per line via stdout
//! - UTF-8 only

use std::io::{self, BufRead, Write};

use serde_json::{json, Value};

use super::errors::{CliError, CliResult};

/// Read a JSON request from stdin
pub fn read_request() -> CliResult<Value> {
    let stdin = io::stdin();
    read_request_from(&mut stdin.lock())
}

/// Read one JSON request line from `reader`
pub fn read_request_from<R: BufRead>(reader: &mut R) -> CliResult<Value> {
    let mut line = String::new();
    reader.read_line(&mut line)?;

    if line.trim().is_empty() {
        return Err(CliError::io_error("Empty input"));
    }

    let value: Value = serde_json::from_str(&line)?;
    Ok(value)
}

/// Success envelope
pub fn ok_response(data: Value) -> Value {
    json!({
        "status": "ok",
        "data": data
    })
}

/// Error envelope
pub fn error_response(code: &str, message: &str) -> Value {
    json!({
        "status": "error",
        "code": code,
        "message": message
    })
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_json(&ok_response(data))
}

/// Write one JSON value as a line to stdout
pub fn write_json(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_request_from() {
        let mut input = Cursor::new("{\"document\":{\"a\":1}}\n");
        let value = read_request_from(&mut input).unwrap();
        assert_eq!(value["document"]["a"], 1);
    }

    #[test]
    fn test_empty_input_rejected() {
        let mut input = Cursor::new("\n");
        assert!(read_request_from(&mut input).is_err());
    }

    #[test]
    fn test_envelopes() {
        assert_eq!(ok_response(json!(1))["status"], "ok");

        let err = error_response("DOCGATE_CLI_IO_ERROR", "boom");
        assert_eq!(err["status"], "error");
        assert_eq!(err["code"], "DOCGATE_CLI_IO_ERROR");
    }
}
