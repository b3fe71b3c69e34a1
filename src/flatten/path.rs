//! Flat path names: `address.city`, `items[0].sku`, `matrix[1][0]`.

use std::fmt;

/// One step of a flat path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(idx) => write!(f, "[{idx}]"),
        }
    }
}

/// Extend `prefix` with an object key.
pub fn push_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Extend `prefix` with an array index.
pub fn push_index(prefix: &str, index: usize) -> String {
    format!("{prefix}[{index}]")
}

/// Split a flat path back into segments.
///
/// Parsing is lenient: a `[` that does not open a well-formed index is kept
/// as part of the key text.
pub fn parse_path(path: &str) -> Vec<PathSegment> {
    parse_path_bounded(path, usize::MAX)
}

/// Like [`parse_path`], but an index of `index_limit` or more is kept as key
/// text instead of becoming an array position.
pub fn parse_path_bounded(path: &str, index_limit: usize) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    let mut key = String::new();
    let mut rest = path;

    while let Some(ch) = rest.chars().next() {
        match ch {
            '.' => {
                if !key.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut key)));
                }
                rest = &rest[1..];
            }
            '[' => match parse_index(rest).filter(|(index, _)| *index < index_limit) {
                Some((index, consumed)) => {
                    if !key.is_empty() {
                        segments.push(PathSegment::Key(std::mem::take(&mut key)));
                    }
                    segments.push(PathSegment::Index(index));
                    rest = &rest[consumed..];
                }
                None => {
                    key.push('[');
                    rest = &rest[1..];
                }
            },
            _ => {
                key.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }
    }
    if !key.is_empty() {
        segments.push(PathSegment::Key(key));
    }
    segments
}

/// Parse `[digits]` at the start of `text`, returning the index and the
/// number of bytes consumed.
fn parse_index(text: &str) -> Option<(usize, usize)> {
    let close = text.find(']')?;
    let digits = &text[1..close];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index = digits.parse().ok()?;
    Some((index, close + 1))
}
