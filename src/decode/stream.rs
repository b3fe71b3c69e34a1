//! Incremental decoding of a root JSON array
//!
//! [`ElementReader`] pulls one top-level element at a time. Only the element
//! being parsed plus one read chunk is held in memory, so arrays larger than
//! memory can be consumed.

use std::io::{ErrorKind, Read};

use serde_json::Value;

use crate::error::{Error, ParseError, Result};
use crate::flatten::flattener::json_type_name;

use super::{advance_position, offset_of, strip_position, UTF8_BOM};

pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    FirstElement,
    NextElement,
    SingleObject,
    Trailing,
    Done,
}

enum Step {
    Parsed { value: Value, consumed: usize, at_end: bool },
    NeedMore(Option<serde_json::Error>),
    Failed(serde_json::Error),
}

/// Pull-based reader over the elements of a root array.
///
/// An object root is treated as a stream holding that one object.
pub struct ElementReader<R> {
    reader: R,
    buf: Vec<u8>,
    pos: usize,
    // absolute offset and (line, column) of buf[0]
    base_offset: usize,
    base_position: (usize, usize),
    chunk_size: usize,
    eof: bool,
    state: State,
    elements: usize,
}

impl<R: Read> ElementReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        ElementReader {
            reader,
            buf: Vec::new(),
            pos: 0,
            base_offset: 0,
            base_position: (1, 1),
            chunk_size: chunk_size.max(1),
            eof: false,
            state: State::Start,
            elements: 0,
        }
    }

    /// Number of elements returned so far.
    pub fn elements_read(&self) -> usize {
        self.elements
    }

    /// Next top-level element, or `None` once the stream has ended.
    ///
    /// After an error the reader is finished and keeps returning `None`.
    pub fn next_element(&mut self) -> Result<Option<Value>> {
        let result = self.advance();
        if result.is_err() {
            self.state = State::Done;
        }
        result
    }

    fn advance(&mut self) -> Result<Option<Value>> {
        loop {
            match self.state {
                State::Start => {
                    self.skip_bom()?;
                    match self.peek_non_ws()? {
                        None => return Err(self.error_here("EOF while parsing a value")),
                        Some(b'[') => {
                            self.pos += 1;
                            self.state = State::FirstElement;
                        }
                        Some(b'{') => self.state = State::SingleObject,
                        Some(_) => return Err(self.scalar_root()?),
                    }
                }
                State::FirstElement => match self.peek_non_ws()? {
                    None => return Err(self.error_here("EOF while parsing a list")),
                    Some(b']') => {
                        self.pos += 1;
                        self.state = State::Trailing;
                    }
                    Some(_) => {
                        self.state = State::NextElement;
                        return self.read_value().map(Some);
                    }
                },
                State::NextElement => match self.peek_non_ws()? {
                    None => return Err(self.error_here("EOF while parsing a list")),
                    Some(b']') => {
                        self.pos += 1;
                        self.state = State::Trailing;
                    }
                    Some(b',') => {
                        self.pos += 1;
                        return match self.peek_non_ws()? {
                            None => Err(self.error_here("EOF while parsing a list")),
                            Some(b']') => Err(self.error_here("trailing comma")),
                            Some(_) => self.read_value().map(Some),
                        };
                    }
                    Some(_) => return Err(self.error_here("expected `,` or `]`")),
                },
                State::SingleObject => {
                    self.state = State::Trailing;
                    return self.read_value().map(Some);
                }
                State::Trailing => match self.peek_non_ws()? {
                    None => self.state = State::Done,
                    Some(_) => return Err(self.error_here("trailing characters")),
                },
                State::Done => return Ok(None),
            }
        }
    }

    fn read_value(&mut self) -> Result<Value> {
        // Doubling the read size keeps a large element from being
        // re-parsed once per chunk.
        let mut want = self.chunk_size;
        loop {
            let step = {
                let slice = &self.buf[self.pos..];
                let mut stream = serde_json::Deserializer::from_slice(slice).into_iter::<Value>();
                match stream.next() {
                    Some(Ok(value)) => {
                        let consumed = stream.byte_offset();
                        Step::Parsed {
                            value,
                            consumed,
                            at_end: consumed == slice.len(),
                        }
                    }
                    Some(Err(err)) if err.is_eof() => Step::NeedMore(Some(err)),
                    Some(Err(err)) => Step::Failed(err),
                    None => Step::NeedMore(None),
                }
            };

            match step {
                Step::Parsed {
                    value,
                    consumed,
                    at_end,
                } => {
                    // A number ending exactly at the buffer edge may continue
                    // in the next chunk.
                    if at_end && !self.eof && self.fill_by(want)? {
                        want = want.saturating_mul(2);
                        continue;
                    }
                    self.pos += consumed;
                    self.elements += 1;
                    return Ok(value);
                }
                Step::NeedMore(err) => {
                    let more = self.fill_by(want)?;
                    want = want.saturating_mul(2);
                    if !more {
                        return Err(match err {
                            Some(err) => self.serde_error(&err),
                            None => self.error_here("EOF while parsing a value"),
                        });
                    }
                }
                Step::Failed(err) => return Err(self.serde_error(&err)),
            }
        }
    }

    /// The root is neither array nor object: decide between a valid scalar
    /// document and malformed input.
    fn scalar_root(&mut self) -> Result<Error> {
        while self.fill()? {}
        let slice = &self.buf[self.pos..];
        Ok(match serde_json::from_slice::<Value>(slice) {
            Ok(value) => Error::UnsupportedRoot {
                found: json_type_name(&value),
            },
            Err(err) => self.serde_error(&err),
        })
    }

    fn skip_bom(&mut self) -> Result<()> {
        while self.buf.len() - self.pos < UTF8_BOM.len() && self.fill()? {}
        if self.buf[self.pos..].starts_with(UTF8_BOM) {
            self.pos += UTF8_BOM.len();
        }
        Ok(())
    }

    fn peek_non_ws(&mut self) -> Result<Option<u8>> {
        loop {
            while self.pos < self.buf.len()
                && matches!(self.buf[self.pos], b' ' | b'\n' | b'\r' | b'\t')
            {
                self.pos += 1;
            }
            if self.pos < self.buf.len() {
                return Ok(Some(self.buf[self.pos]));
            }
            if !self.fill()? {
                return Ok(None);
            }
        }
    }

    /// Read one more chunk. Returns `false` once the source is exhausted.
    fn fill(&mut self) -> Result<bool> {
        self.fill_by(self.chunk_size)
    }

    /// Read up to `size` more bytes.
    fn fill_by(&mut self, size: usize) -> Result<bool> {
        if self.eof {
            return Ok(false);
        }
        self.compact();

        let start = self.buf.len();
        self.buf.resize(start + size, 0);
        let read = loop {
            match self.reader.read(&mut self.buf[start..]) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.buf.truncate(start);
                    return Err(Error::Transport(err));
                }
            }
        };
        self.buf.truncate(start + read);

        if read == 0 {
            self.eof = true;
            return Ok(false);
        }
        Ok(true)
    }

    /// Drop consumed bytes, keeping the absolute position bookkeeping.
    fn compact(&mut self) {
        if self.pos == 0 {
            return;
        }
        self.base_position = advance_position(&self.buf[..self.pos], self.base_position);
        self.base_offset += self.pos;
        self.buf.drain(..self.pos);
        self.pos = 0;
    }

    fn parse_error(&self, index: usize, message: String) -> Error {
        let index = index.min(self.buf.len());
        let (line, column) = advance_position(&self.buf[..index], self.base_position);
        Error::Parse(ParseError {
            offset: self.base_offset + index,
            line,
            column,
            message,
        })
    }

    fn error_here(&self, message: &str) -> Error {
        self.parse_error(self.pos, message.to_string())
    }

    fn serde_error(&self, err: &serde_json::Error) -> Error {
        let relative = offset_of(&self.buf[self.pos..], err.line(), err.column());
        self.parse_error(self.pos + relative, strip_position(err))
    }
}
