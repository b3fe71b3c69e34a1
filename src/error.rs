//! Error types for decoding, flattening, schema resolution and streaming.

use std::fmt;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Location and description of malformed JSON input.
///
/// `offset` is a byte offset from the start of the source; `line` and
/// `column` are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at line {} column {} (byte {})",
            self.message, self.line, self.column, self.offset
        )
    }
}

impl std::error::Error for ParseError {}

/// Every failure the engine can raise.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed JSON syntax, including nesting past the decoder limit.
    #[error("parse error: {0}")]
    Parse(ParseError),

    /// The document root is a bare scalar.
    #[error("unsupported root: expected an object or array, found {found}")]
    UnsupportedRoot { found: &'static str },

    /// Nesting exceeds the configured flatten depth.
    #[error("structure too complex at '{path}': depth {depth} exceeds maximum {max_depth}")]
    StructureTooComplex {
        path: String,
        depth: usize,
        max_depth: usize,
    },

    /// Bad batch size, bad locator, or a read already in flight.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Failure from the byte source, propagated unchanged.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// A value could not be converted even through its string form.
    #[error("cannot coerce value in column '{column}': {message}")]
    Coercion { column: String, message: String },

    /// Failure reported by a batch sink.
    #[error("sink error: {0}")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Short, stable name of the error kind, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Parse(_) => "parse",
            Error::UnsupportedRoot { .. } => "unsupported_root",
            Error::StructureTooComplex { .. } => "structure_too_complex",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::Transport(_) => "transport",
            Error::Coercion { .. } => "coercion",
            Error::Sink(_) => "sink",
        }
    }

    /// Wrap a sink implementation's own error.
    pub fn sink<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Sink(Box::new(err))
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::Parse(err)
    }
}
