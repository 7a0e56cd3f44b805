//! # protoguess-core
//!
//! A schema-less codec for Protocol Buffer wire data.
//!
//! Given bytes that are only *suspected* to be protobuf, the decoder makes a
//! best-effort guess at their structure without a `.proto` file, and the
//! encoder turns such a guess back into bytes. This is a forensic tool: the
//! result is an approximation meant for humans, not a faithful decode.
//!
//! ## Architecture
//!
//! - [`varint`]: base-128 varint codec
//! - [`wire`]: wire-type inference from tag bits and field-number checks
//! - [`decoder`]: recursive decoder with per-scope fallback to raw bytes
//! - [`encoder`]: value-driven encoder mirroring the decoder's conventions
//! - [`value`]: the decoded value model
//! - [`text`]: text encodings for fallback bytes and text values
//! - [`error`]: error types and handling
//!
//! ## Example
//!
//! ```
//! use protoguess_core::{decode, encode, Message, Value};
//!
//! let value = decode(&[0x12, 0x02, 0x08, 0x05]);
//! let expected = Message::new().with(2, Message::new().with(1, 5u64));
//! assert_eq!(value, Value::Message(expected));
//!
//! // Bytes that do not parse come back unchanged
//! assert_eq!(decode(&[0x18, 0x01, 0x08, 0x01]), Value::from(vec![0x18u8, 0x01, 0x08, 0x01]));
//!
//! assert_eq!(encode(&value)?.as_ref(), &[0x12, 0x02, 0x08, 0x05]);
//! # Ok::<(), protoguess_core::Error>(())
//! ```
//!
//! ## Heuristics
//!
//! Tags are classified from their low bits alone, and field numbers must
//! never decrease within a message. Every length-delimited payload is first
//! tried as a nested message; only payloads that fail that attempt come
//! back as bytes or text. Decoding never fails: the worst case is the
//! whole input returned as raw bytes.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod text;
pub mod value;
pub mod varint;
pub mod wire;

use bytes::Bytes;

// Re-export primary types for convenience
pub use decoder::{Decoder, DecoderConfig, DEFAULT_MAX_DEPTH};
pub use encoder::Encoder;
pub use error::{Error, Result};
pub use text::TextEncoding;
pub use value::{Message, Value};
pub use wire::{Tag, WireType};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Decodes `data` with the default configuration. Fallbacks stay as bytes.
pub fn decode(data: &[u8]) -> Value {
    Decoder::new().decode(data)
}

/// Decodes `data`, turning fallbacks into text where they are valid in `encoding`
pub fn decode_with_encoding(data: &[u8], encoding: TextEncoding) -> Value {
    Decoder::with_config(DecoderConfig::new().text_encoding(encoding)).decode(data)
}

/// Encodes `value` with UTF-8 text
pub fn encode(value: &Value) -> Result<Bytes> {
    Encoder::new().encode(value)
}
