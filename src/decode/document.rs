//! Whole-document decoding
//!
//! The SIMD parser handles the common case. On failure the document is
//! re-parsed with `serde_json` to obtain a precise error position.

use serde_json::Value;

use crate::error::ParseError;

use super::{offset_of, parse_error_at, strip_position, UTF8_BOM};

/// Containers nested this deep are rejected, matching `serde_json`'s own
/// recursion limit so both parse paths agree.
pub const MAX_NESTING: usize = 128;

/// Decode a complete JSON document.
pub fn decode(bytes: &[u8]) -> Result<Value, ParseError> {
    let (skipped, body) = match bytes.strip_prefix(UTF8_BOM) {
        Some(rest) => (UTF8_BOM.len(), rest),
        None => (0, bytes),
    };

    decode_body(body).map_err(|mut err| {
        err.offset += skipped;
        err
    })
}

fn decode_body(bytes: &[u8]) -> Result<Value, ParseError> {
    // simd-json has no recursion limit of its own.
    check_nesting(bytes)?;

    let mut scratch = bytes.to_vec();
    match simd_json::serde::from_slice::<Value>(&mut scratch) {
        Ok(value) => Ok(value),
        Err(err) => {
            tracing::trace!(error = %err, "simd decode failed, re-parsing with serde_json");
            decode_with_serde(bytes)
        }
    }
}

fn decode_with_serde(bytes: &[u8]) -> Result<Value, ParseError> {
    serde_json::from_slice(bytes).map_err(|err| ParseError {
        offset: offset_of(bytes, err.line(), err.column()),
        line: err.line(),
        column: err.column(),
        message: strip_position(&err),
    })
}

/// Reject documents nested `MAX_NESTING` or more containers deep.
fn check_nesting(bytes: &[u8]) -> Result<(), ParseError> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' | b'{' => {
                depth += 1;
                if depth >= MAX_NESTING {
                    return Err(parse_error_at(bytes, idx, "recursion limit exceeded"));
                }
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}
