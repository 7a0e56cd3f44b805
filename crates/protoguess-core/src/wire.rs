//! Tag classification without a schema.
//!
//! A tag is the varint `(field_number << 3) | wire_type`. Without a schema
//! there is no way to tell a real tag from payload bytes that happen to be
//! read as one, so the classifier only looks at the low bits and requires
//! field numbers to be non-decreasing within a message.
//!
//! | Low bits of the tag | Wire type         | Code |
//! |---------------------|-------------------|------|
//! | `1 x 1`             | FIXED32           | 5    |
//! | `0 x 1`             | FIXED64           | 1    |
//! | `x 1 0`             | LENGTH_DELIMITED  | 2    |
//! | `0 0 0`             | VARINT            | 0    |
//! | `1 0 0`             | invalid           |      |

use crate::error::{Error, Result};
use crate::varint;
use bytes::BufMut;

/// Largest field number whose tag still fits in 64 bits
pub const MAX_FIELD_NUMBER: u64 = u64::MAX >> 3;

/// Wire types the heuristic recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer
    Varint = 0,
    /// 64-bit fixed width, read as a double
    Fixed64 = 1,
    /// Length-delimited payload, decoded as a nested message
    LengthDelimited = 2,
    /// 32-bit fixed width, read as a float
    Fixed32 = 5,
}

impl WireType {
    /// Infers the wire type from the low bits of a tag
    pub fn infer(flag: u64) -> Result<Self> {
        if flag & 1 != 0 {
            if flag & 0b101 == 0b101 {
                Ok(WireType::Fixed32)
            } else {
                Ok(WireType::Fixed64)
            }
        } else if flag & 2 != 0 {
            Ok(WireType::LengthDelimited)
        } else if flag & 0b111 == 0 {
            Ok(WireType::Varint)
        } else {
            Err(Error::InvalidTag { tag: flag })
        }
    }

    /// Numeric code used in tags
    pub fn code(self) -> u64 {
        self as u64
    }
}

/// A classified tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    /// Field number
    pub field: u64,
    /// Wire type
    pub wire_type: WireType,
}

impl Tag {
    /// Builds a tag for encoding, rejecting field numbers that cannot appear on the wire
    pub fn new(field: u64, wire_type: WireType) -> Result<Self> {
        if field == 0 || field > MAX_FIELD_NUMBER {
            return Err(Error::InvalidFieldNumber { number: field });
        }
        Ok(Self { field, wire_type })
    }

    /// Classifies a raw tag read from the wire.
    ///
    /// `last_field` is the field number of the previously accepted field in
    /// the same message (1 at message start). The candidate field number may
    /// equal it but never be smaller.
    pub fn classify(flag: u64, last_field: u64) -> Result<Self> {
        let wire_type = WireType::infer(flag)?;
        let field = (flag ^ wire_type.code()) >> 3;

        if field < last_field {
            return Err(Error::NonMonotonicField { field, last_field });
        }

        Ok(Self { field, wire_type })
    }

    /// The raw tag value
    pub fn to_raw(self) -> u64 {
        self.field << 3 | self.wire_type.code()
    }

    /// Appends the tag varint to `buf`
    pub fn encode(self, buf: &mut impl BufMut) {
        varint::encode(self.to_raw(), buf);
    }
}
