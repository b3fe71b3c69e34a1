//! Byte sources a connector can read from.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Where document bytes come from.
pub enum Source {
    Path(PathBuf),
    Bytes(Vec<u8>),
    Reader(Box<dyn Read + Send>),
}

impl Source {
    /// Resolve a locator string: a plain path or a `file://` URI.
    ///
    /// No HTTP client is bundled, so `http://` and `https://` locators fail
    /// with a transport error. Wrap a response body with
    /// [`Source::from_reader`] instead.
    pub fn from_locator(locator: &str) -> Result<Self> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(Error::InvalidArgument("empty source locator".into()));
        }

        if let Some(path) = locator.strip_prefix("file://") {
            if path.is_empty() {
                return Err(Error::InvalidArgument(format!("no path in locator '{locator}'")));
            }
            return Ok(Source::Path(PathBuf::from(path)));
        }

        let lowered = locator.to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            return Err(Error::Transport(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("no HTTP transport available for '{locator}'"),
            )));
        }
        if let Some((scheme, _)) = locator.split_once("://") {
            return Err(Error::InvalidArgument(format!(
                "unsupported locator scheme '{scheme}'"
            )));
        }

        Ok(Source::Path(PathBuf::from(locator)))
    }

    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Self {
        Source::Reader(Box::new(reader))
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Source::Bytes(bytes.into())
    }

    /// Open the source for incremental reading.
    pub fn open(self) -> Result<Box<dyn Read + Send>> {
        Ok(match self {
            Source::Path(path) => Box::new(BufReader::new(File::open(path)?)),
            Source::Bytes(bytes) => Box::new(Cursor::new(bytes)),
            Source::Reader(reader) => reader,
        })
    }

    /// Read the whole source into memory.
    pub fn read_all(self) -> Result<Vec<u8>> {
        match self {
            Source::Path(path) => Ok(std::fs::read(path)?),
            Source::Bytes(bytes) => Ok(bytes),
            Source::Reader(mut reader) => {
                let mut bytes = Vec::new();
                reader.read_to_end(&mut bytes)?;
                Ok(bytes)
            }
        }
    }

    /// Short description for log fields.
    pub fn describe(&self) -> String {
        match self {
            Source::Path(path) => path.display().to_string(),
            Source::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
            Source::Reader(_) => "<reader>".to_string(),
        }
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::Path(path)
    }
}

impl From<Vec<u8>> for Source {
    fn from(bytes: Vec<u8>) -> Self {
        Source::Bytes(bytes)
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Source::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Source::Reader(_) => f.write_str("Reader"),
        }
    }
}
