//! Per-column type inference
//!
//! A [`TypeAccumulator`] records what kinds of values were observed at one flat
//! path and resolves them to a [`TypeTag`] plus nullability. Accumulators only
//! ever gain evidence, so a resolved type can widen but never narrow.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::coerce::integral;
use super::TypeTag;

static ISO_DATETIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?$")
        .expect("valid date-time pattern")
});

static ISO_DATE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date pattern"));

static ISO_TIME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}:\d{2}:\d{2}(\.\d+)?$").expect("valid time pattern"));

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email pattern")
});

static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("valid uuid pattern")
});

static IPV4_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,3}\.){3}\d{1,3}$").expect("valid ipv4 pattern"));

static IPV6_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(([0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}",
        r"|([0-9a-fA-F]{1,4}:){1,7}:",
        r"|([0-9a-fA-F]{1,4}:){1,6}:[0-9a-fA-F]{1,4})$"
    ))
    .expect("valid ipv6 pattern")
});

/// Well-known string shapes reported as a hint on String columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StringFormat {
    Date,
    DateTime,
    Time,
    Email,
    Uuid,
    Uri,
    Ipv4,
    Ipv6,
}

/// Detect if a string matches a known format
pub fn detect_format(value: &str) -> Option<StringFormat> {
    let len = value.len();
    if len == 0 {
        return None;
    }
    let bytes = value.as_bytes();

    if len > 6
        && (value.starts_with("http://")
            || value.starts_with("https://")
            || value.starts_with("ftp://")
            || value.starts_with("file://"))
    {
        return Some(StringFormat::Uri);
    }

    if len == 10 && bytes[4] == b'-' && bytes[7] == b'-' && ISO_DATE_REGEX.is_match(value) {
        return Some(StringFormat::Date);
    }

    if len > 5 && len < 255 && value.contains('@') && EMAIL_REGEX.is_match(value) {
        return Some(StringFormat::Email);
    }

    if len == 36 && bytes[8] == b'-' && UUID_REGEX.is_match(&value.to_lowercase()) {
        return Some(StringFormat::Uuid);
    }

    if len >= 19 && bytes[10] == b'T' && ISO_DATETIME_REGEX.is_match(value) {
        return Some(StringFormat::DateTime);
    }

    if len >= 8 && value.contains(':') && ISO_TIME_REGEX.is_match(value) {
        return Some(StringFormat::Time);
    }

    if len < 16
        && value.contains('.')
        && IPV4_REGEX.is_match(value)
        && value.split('.').all(|part| part.parse::<u8>().is_ok())
    {
        return Some(StringFormat::Ipv4);
    }

    if value.contains(':') && IPV6_REGEX.is_match(value) {
        return Some(StringFormat::Ipv6);
    }

    None
}

/// Evidence gathered for one column.
#[derive(Debug, Clone, Default)]
pub struct TypeAccumulator {
    samples: usize,
    nulls: usize,
    booleans: usize,
    integers: usize,
    floats: usize,
    strings: usize,
    nested: usize,
    formats: HashMap<StringFormat, usize>,
    detect_formats: bool,
}

impl TypeAccumulator {
    pub fn new(detect_formats: bool) -> Self {
        TypeAccumulator {
            detect_formats,
            ..Default::default()
        }
    }

    /// Record one observed value.
    pub fn observe(&mut self, value: &Value) {
        self.samples += 1;
        match value {
            Value::Null => self.nulls += 1,
            Value::Bool(_) => self.booleans += 1,
            Value::Number(n) => {
                if n.is_i64() || n.as_f64().and_then(integral).is_some() {
                    self.integers += 1;
                } else {
                    self.floats += 1;
                }
            }
            Value::String(s) => {
                self.strings += 1;
                if self.detect_formats {
                    if let Some(format) = detect_format(s) {
                        *self.formats.entry(format).or_insert(0) += 1;
                    }
                }
            }
            Value::Array(_) | Value::Object(_) => self.nested += 1,
        }
    }

    /// Number of values observed (absent rows are not counted).
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Fold another accumulator's evidence into this one.
    pub fn merge(&mut self, other: &TypeAccumulator) {
        self.samples += other.samples;
        self.nulls += other.nulls;
        self.booleans += other.booleans;
        self.integers += other.integers;
        self.floats += other.floats;
        self.strings += other.strings;
        self.nested += other.nested;
        for (format, count) in &other.formats {
            *self.formats.entry(*format).or_insert(0) += count;
        }
        self.detect_formats |= other.detect_formats;
    }

    fn non_null(&self) -> usize {
        self.samples - self.nulls
    }

    /// Resolve the observed evidence to a type.
    pub fn type_tag(&self) -> TypeTag {
        let non_null = self.non_null();
        if non_null == 0 {
            // Deferred: nothing but nulls so far.
            return TypeTag::String;
        }
        if self.nested > 0 {
            return TypeTag::Nested;
        }
        if self.booleans == non_null {
            return TypeTag::Boolean;
        }
        if self.integers == non_null {
            return TypeTag::Integer;
        }
        if self.integers + self.floats == non_null {
            return TypeTag::Float;
        }
        TypeTag::String
    }

    /// Whether any observed value was null. Absence is judged by the caller.
    pub fn saw_null(&self) -> bool {
        self.nulls > 0 || self.non_null() == 0
    }

    /// Format shared by every observed string, only for pure String columns.
    pub fn format(&self) -> Option<StringFormat> {
        if self.strings == 0 || self.strings != self.non_null() || self.formats.len() != 1 {
            return None;
        }
        self.formats
            .iter()
            .next()
            .filter(|(_, count)| **count == self.strings)
            .map(|(format, _)| *format)
    }
}

/// Infer a type and nullability from the values observed at one path.
pub fn infer_type(values: &[Value]) -> (TypeTag, bool) {
    let mut acc = TypeAccumulator::new(false);
    for value in values {
        acc.observe(value);
    }
    (acc.type_tag(), acc.saw_null())
}
