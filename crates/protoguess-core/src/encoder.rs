//! Value-driven message encoder.
//!
//! The inverse of the decoder: the wire type of each field follows from the
//! kind of its value, using the same conventions the decoder produces.
//!
//! | Value      | Wire type        |
//! |------------|------------------|
//! | `Integer`  | VARINT           |
//! | `Float`    | FIXED32          |
//! | `Double`   | FIXED64          |
//! | `Bytes`    | LENGTH_DELIMITED |
//! | `Text`     | LENGTH_DELIMITED |
//! | `Message`  | LENGTH_DELIMITED |
//! | `Repeated` | one entry per element, same field number |

use crate::error::{Error, Result};
use crate::text::TextEncoding;
use crate::value::{Message, Value};
use crate::varint;
use crate::wire::{Tag, WireType};
use bytes::{BufMut, Bytes, BytesMut};

/// Schema-less protobuf encoder
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    text_encoding: TextEncoding,
}

impl Encoder {
    /// Creates a new encoder writing text as UTF-8
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new encoder writing text in `encoding`
    pub fn with_text_encoding(encoding: TextEncoding) -> Self {
        Self {
            text_encoding: encoding,
        }
    }

    /// Returns the encoding used for text values
    pub fn text_encoding(&self) -> TextEncoding {
        self.text_encoding
    }

    /// Encodes a top-level value.
    ///
    /// Messages are serialized field by field. Bytes pass through unchanged
    /// and text is converted with the configured encoding, so a raw
    /// fallback from the decoder encodes back to the original input. Scalars
    /// and repeated values have no top-level form.
    pub fn encode(&self, value: &Value) -> Result<Bytes> {
        match value {
            Value::Message(message) => self.encode_message(message),
            Value::Bytes(bytes) => Ok(bytes.clone()),
            Value::Text(text) => Ok(Bytes::from(self.text_encoding.encode(text)?)),
            other => Err(Error::unsupported(other.kind())),
        }
    }

    /// Encodes the fields of `message`
    pub fn encode_message(&self, message: &Message) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.write_message(message, &mut buf)?;
        Ok(buf.freeze())
    }

    fn write_message(&self, message: &Message, buf: &mut BytesMut) -> Result<()> {
        for (field, value) in message.iter() {
            match value {
                Value::Repeated(values) => {
                    for element in values {
                        self.write_field(field, element, buf)?;
                    }
                }
                _ => self.write_field(field, value, buf)?,
            }
        }
        Ok(())
    }

    fn write_field(&self, field: u64, value: &Value, buf: &mut BytesMut) -> Result<()> {
        match value {
            Value::Integer(v) => {
                Tag::new(field, WireType::Varint)?.encode(buf);
                varint::encode(*v, buf);
            }
            Value::Float(v) => {
                Tag::new(field, WireType::Fixed32)?.encode(buf);
                buf.put_f32_le(*v);
            }
            Value::Double(v) => {
                Tag::new(field, WireType::Fixed64)?.encode(buf);
                buf.put_f64_le(*v);
            }
            Value::Bytes(bytes) => write_length_delimited(field, bytes, buf)?,
            Value::Text(text) => {
                let encoded = self.text_encoding.encode(text)?;
                write_length_delimited(field, &encoded, buf)?;
            }
            Value::Message(message) => {
                let mut nested = BytesMut::new();
                self.write_message(message, &mut nested)?;
                write_length_delimited(field, &nested, buf)?;
            }
            // a repeated value inside a repeated value has no wire form
            Value::Repeated(_) => return Err(Error::unsupported("nested repeated")),
        }
        Ok(())
    }
}

fn write_length_delimited(field: u64, payload: &[u8], buf: &mut BytesMut) -> Result<()> {
    Tag::new(field, WireType::LengthDelimited)?.encode(buf);
    varint::encode(payload.len() as u64, buf);
    buf.put_slice(payload);
    Ok(())
}
