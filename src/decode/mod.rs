//! JSON decoding: whole documents and incremental root-array streams.

pub mod document;
pub mod stream;

pub use document::{decode, MAX_NESTING};
pub use stream::ElementReader;

use crate::error::ParseError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Line and column (both 1-based) reached after walking `bytes` from `base`.
fn advance_position(bytes: &[u8], base: (usize, usize)) -> (usize, usize) {
    let (mut line, mut column) = base;
    for &b in bytes {
        if b == b'\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

/// Byte offset within `bytes` of a `serde_json` error position.
fn offset_of(bytes: &[u8], line: usize, column: usize) -> usize {
    let mut line_start = 0;
    let mut current = 1;
    while current < line {
        match bytes[line_start..].iter().position(|&b| b == b'\n') {
            Some(nl) => {
                line_start += nl + 1;
                current += 1;
            }
            None => break,
        }
    }
    (line_start + column.saturating_sub(1)).min(bytes.len())
}

/// Build a [`ParseError`] for `offset` in a fully buffered document.
fn parse_error_at(bytes: &[u8], offset: usize, message: impl Into<String>) -> ParseError {
    let offset = offset.min(bytes.len());
    let (line, column) = advance_position(&bytes[..offset], (1, 1));
    ParseError {
        offset,
        line,
        column,
        message: message.into(),
    }
}

/// `serde_json` appends " at line L column C" to its messages; the
/// position is carried separately.
fn strip_position(err: &serde_json::Error) -> String {
    let text = err.to_string();
    match text.rfind(" at line ") {
        Some(idx) => text[..idx].to_string(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_of() {
        let text = b"{\n  \"a\": }";
        // `}` sits on line 2, column 8
        assert_eq!(offset_of(text, 2, 8), 9);
        assert_eq!(text[9], b'}');
        assert_eq!(offset_of(text, 1, 0), 0);
    }

    #[test]
    fn test_parse_error_at() {
        let err = parse_error_at(b"[1,\n2,]", 6, "trailing comma");
        assert_eq!((err.line, err.column, err.offset), (2, 3, 6));
    }
}
