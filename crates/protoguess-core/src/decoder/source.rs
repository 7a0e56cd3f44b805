//! Byte sources the decoder reads from.
//!
//! The decoder only needs four things from its input: the current offset,
//! single bytes for varints, exact-size chunks for payloads, and an
//! end-of-input test between fields. [`Source`] captures those so the same
//! decode loop runs over an in-memory buffer and over a streaming reader.

use crate::error::{Error, Result};
use bytes::{Bytes, BytesMut};
use std::io::{self, BufRead, Read};

/// A byte source for one message scope
pub trait Source {
    /// Number of bytes consumed so far
    fn position(&self) -> usize;

    /// Reads a single byte, failing with [`Error::EndOfInput`] when exhausted
    fn read_byte(&mut self) -> Result<u8>;

    /// Reads exactly `len` bytes, failing with [`Error::LengthMismatch`] if fewer remain
    fn read_chunk(&mut self, len: u64) -> Result<Bytes>;

    /// Returns true when no bytes are left for another tag
    fn at_end(&mut self) -> Result<bool>;
}

/// An in-memory buffer. Exhausted when the position reaches the length.
#[derive(Debug, Clone)]
pub struct SliceSource {
    data: Bytes,
    position: usize,
}

impl SliceSource {
    /// Creates a source over `data`
    pub fn new(data: Bytes) -> Self {
        Self { data, position: 0 }
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// The whole original buffer, regardless of how much was consumed
    pub fn into_raw(self) -> Bytes {
        self.data
    }
}

impl Source for SliceSource {
    fn position(&self) -> usize {
        self.position
    }

    fn read_byte(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.position)
            .ok_or(Error::end_of_input(self.position))?;
        self.position += 1;
        Ok(byte)
    }

    fn read_chunk(&mut self, len: u64) -> Result<Bytes> {
        let available = self.remaining();
        let len = usize::try_from(len)
            .ok()
            .filter(|&len| len <= available)
            .ok_or(Error::length_mismatch(len, available as u64))?;

        let chunk = self.data.slice(self.position..self.position + len);
        self.position += len;
        Ok(chunk)
    }

    fn at_end(&mut self) -> Result<bool> {
        Ok(self.position == self.data.len())
    }
}

/// A streaming reader. Exhausted when a peek returns zero bytes.
///
/// Every consumed byte is kept so a failed scope can still hand back the
/// complete input through [`ReaderSource::into_raw`].
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
    consumed: BytesMut,
}

impl<R: BufRead> ReaderSource<R> {
    /// Creates a source over `reader`
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            consumed: BytesMut::new(),
        }
    }

    /// Everything consumed so far followed by the unread remainder of the stream
    pub fn into_raw(mut self) -> Result<Bytes> {
        let mut rest = Vec::new();
        self.reader.read_to_end(&mut rest)?;
        self.consumed.extend_from_slice(&rest);
        Ok(self.consumed.freeze())
    }

    fn peek(&mut self) -> io::Result<Option<u8>> {
        loop {
            match self.reader.fill_buf() {
                Ok(buf) => return Ok(buf.first().copied()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: BufRead> Source for ReaderSource<R> {
    fn position(&self) -> usize {
        self.consumed.len()
    }

    fn read_byte(&mut self) -> Result<u8> {
        let byte = self
            .peek()?
            .ok_or(Error::end_of_input(self.consumed.len()))?;
        self.reader.consume(1);
        self.consumed.extend_from_slice(&[byte]);
        Ok(byte)
    }

    fn read_chunk(&mut self, len: u64) -> Result<Bytes> {
        let mut chunk = Vec::new();
        let read = (&mut self.reader).take(len).read_to_end(&mut chunk)?;
        self.consumed.extend_from_slice(&chunk);

        if (read as u64) < len {
            return Err(Error::length_mismatch(len, read as u64));
        }
        Ok(Bytes::from(chunk))
    }

    fn at_end(&mut self) -> Result<bool> {
        Ok(self.peek()?.is_none())
    }
}
