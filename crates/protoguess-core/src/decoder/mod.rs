//! Heuristic message decoder.
//!
//! ## Algorithm Overview
//!
//! Each scope (the whole input, or one length-delimited payload) runs the
//! same loop:
//!
//! 1. Read a tag varint and classify it with [`Tag::classify`]
//! 2. Read the payload for the inferred wire type
//! 3. For length-delimited payloads, decode the payload as a nested scope
//! 4. Record the value under its field number, then stop once the scope is
//!    exhausted
//!
//! Any failure inside a scope throws away whatever that scope had decoded
//! and returns its original bytes instead. A nested failure only affects
//! the one field it belongs to; the parent keeps going.
//!
//! Payloads that parse cleanly are always taken as nested messages, so
//! short strings frequently come back as small messages. Only byte ranges
//! that fail the heuristic outright come back as bytes or text.

mod source;

use crate::error::{Error, Result};
use crate::text::TextEncoding;
use crate::value::{Message, Value};
use crate::varint;
use crate::wire::{Tag, WireType};
use bytes::{Buf, Bytes};
use std::io::BufRead;
use tracing::{debug, trace};

pub use source::{ReaderSource, SliceSource, Source};

/// Default limit on message nesting
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Configuration for the decoder
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Deepest nested scope that is still decoded (the top level is depth 0)
    pub max_depth: usize,
    /// Encoding applied to fallback bytes; `None` keeps them as bytes
    pub text_encoding: Option<TextEncoding>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            text_encoding: None,
        }
    }
}

impl DecoderConfig {
    /// Creates a new decoder config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum nesting depth
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets the encoding used to turn fallback bytes into text
    pub fn text_encoding(mut self, encoding: impl Into<Option<TextEncoding>>) -> Self {
        self.text_encoding = encoding.into();
        self
    }
}

/// Schema-less protobuf decoder
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    /// Creates a new decoder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new decoder with custom configuration
    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// Returns the decoder configuration
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decodes `data` as one top-level message, or returns it as a raw fallback
    pub fn decode(&self, data: &[u8]) -> Value {
        self.decode_bytes(Bytes::copy_from_slice(data))
    }

    /// Same as [`Decoder::decode`], without copying the input. Fallback
    /// values share the input buffer.
    pub fn decode_bytes(&self, data: Bytes) -> Value {
        self.decode_scope(data, 0)
    }

    /// Decodes a streaming source as one top-level message.
    ///
    /// Parse failures fall back to the complete stream contents exactly like
    /// [`Decoder::decode`]. Only I/O errors are returned.
    pub fn decode_reader<R: BufRead>(&self, reader: R) -> Result<Value> {
        let mut source = ReaderSource::new(reader);

        match self.read_message(&mut source, 0) {
            Ok(message) => Ok(Value::Message(message)),
            Err(e) if e.is_recoverable() => {
                debug!("Top-level stream is not a message, falling back: {}", e);
                Ok(self.fallback(source.into_raw()?))
            }
            Err(e) => Err(e),
        }
    }

    fn decode_scope(&self, data: Bytes, depth: usize) -> Value {
        let mut source = SliceSource::new(data);

        match self.read_message(&mut source, depth) {
            Ok(message) => Value::Message(message),
            Err(e) => {
                debug!(
                    "Scope of {} bytes at depth {} is not a message, falling back: {}",
                    source.remaining() + source.position(),
                    depth,
                    e
                );
                self.fallback(source.into_raw())
            }
        }
    }

    /// Runs the tag/value loop until the source is exhausted.
    fn read_message<S: Source>(&self, source: &mut S, depth: usize) -> Result<Message> {
        if depth > self.config.max_depth {
            return Err(Error::DepthExceeded {
                max_depth: self.config.max_depth,
            });
        }

        let mut message = Message::new();
        let mut last_field = 1;

        loop {
            let flag = varint::decode(source)?;
            let tag = Tag::classify(flag, last_field)?;

            let value = match tag.wire_type {
                WireType::Varint => Value::Integer(varint::decode(source)?),
                WireType::Fixed32 => Value::Float(source.read_chunk(4)?.get_f32_le()),
                WireType::Fixed64 => Value::Double(source.read_chunk(8)?.get_f64_le()),
                WireType::LengthDelimited => {
                    let len = varint::decode(source)?;
                    let payload = source.read_chunk(len)?;
                    self.decode_scope(payload, depth + 1)
                }
            };

            trace!(
                "Accepted field {} ({:?}) at depth {}: {}",
                tag.field,
                tag.wire_type,
                depth,
                value.kind()
            );

            last_field = tag.field;
            message.push(tag.field, value);

            if source.at_end()? {
                return Ok(message);
            }
        }
    }

    fn fallback(&self, raw: Bytes) -> Value {
        self.config
            .text_encoding
            .and_then(|encoding| encoding.decode(&raw))
            .map(Value::Text)
            .unwrap_or(Value::Bytes(raw))
    }
}
