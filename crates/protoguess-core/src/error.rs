//! Error types for the protoguess-core library.
//!
//! Decode-path variants never reach callers of [`crate::decode`]: they are
//! caught at the boundary of the scope being decoded and turned into a raw
//! fallback value. Encode-path variants are returned to the caller as-is.

use crate::text::TextEncoding;
use thiserror::Error;

/// Result type alias for protoguess operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all protoguess operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The source ran out of bytes in the middle of a varint
    #[error("unexpected end of input at offset {offset}")]
    EndOfInput {
        /// Byte offset where more input was expected
        offset: usize,
    },

    /// The low bits of a tag match no recognized wire type
    #[error("invalid tag {tag:#x}: low bits match no wire type")]
    InvalidTag {
        /// The raw tag value
        tag: u64,
    },

    /// A field number went backwards within one message scope
    #[error("field number {field} follows field number {last_field}")]
    NonMonotonicField {
        /// The candidate field number
        field: u64,
        /// The last accepted field number in the scope
        last_field: u64,
    },

    /// A declared length exceeds the bytes left in the scope
    #[error("declared length {expected} exceeds the {available} bytes available")]
    LengthMismatch {
        /// Number of bytes the field declared
        expected: u64,
        /// Number of bytes actually available
        available: u64,
    },

    /// Nested messages went deeper than the configured limit
    #[error("nesting depth exceeds the maximum of {max_depth}")]
    DepthExceeded {
        /// Configured maximum depth
        max_depth: usize,
    },

    /// A varint carries payload bits beyond 64 bits
    #[error("varint at offset {offset} overflows 64 bits")]
    VarintOverflow {
        /// Byte offset of the offending varint byte
        offset: usize,
    },

    /// A value kind with no wire representation in its position
    #[error("cannot encode a {kind} value here")]
    UnsupportedValueType {
        /// Name of the offending value kind
        kind: &'static str,
    },

    /// A field number that cannot appear in a tag
    #[error("invalid field number {number}")]
    InvalidFieldNumber {
        /// The invalid field number
        number: u64,
    },

    /// A character the selected text encoding cannot represent
    #[error("character {character:?} cannot be encoded as {encoding}")]
    UnencodableText {
        /// The selected encoding
        encoding: TextEncoding,
        /// The first offending character
        character: char,
    },

    /// Unrecognized text encoding label
    #[error("unknown text encoding '{label}'")]
    UnknownEncoding {
        /// The label as given
        label: String,
    },

    /// I/O failure while reading a streaming source
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates a new end-of-input error
    pub fn end_of_input(offset: usize) -> Self {
        Self::EndOfInput { offset }
    }

    /// Creates a new length mismatch error
    pub fn length_mismatch(expected: u64, available: u64) -> Self {
        Self::LengthMismatch {
            expected,
            available,
        }
    }

    /// Creates a new unsupported value type error
    pub fn unsupported(kind: &'static str) -> Self {
        Self::UnsupportedValueType { kind }
    }

    /// Creates a new unknown encoding error
    pub fn unknown_encoding(label: impl Into<String>) -> Self {
        Self::UnknownEncoding {
            label: label.into(),
        }
    }

    /// Returns true if this is a parse failure that the decoder absorbs by
    /// falling back to raw bytes
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::EndOfInput { .. }
                | Self::InvalidTag { .. }
                | Self::NonMonotonicField { .. }
                | Self::LengthMismatch { .. }
                | Self::DepthExceeded { .. }
                | Self::VarintOverflow { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NonMonotonicField {
            field: 1,
            last_field: 3,
        };
        assert_eq!(err.to_string(), "field number 1 follows field number 3");

        let err = Error::unsupported("repeated");
        assert!(err.to_string().contains("repeated"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::end_of_input(0).is_recoverable());
        assert!(Error::length_mismatch(5, 2).is_recoverable());
        assert!(Error::DepthExceeded { max_depth: 4 }.is_recoverable());
        assert!(Error::InvalidTag { tag: 0x0c }.is_recoverable());
        assert!(Error::NonMonotonicField {
            field: 1,
            last_field: 3
        }
        .is_recoverable());
        assert!(Error::VarintOverflow { offset: 9 }.is_recoverable());
        assert!(!Error::unsupported("integer").is_recoverable());

        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        assert!(!Error::from(io).is_recoverable());
    }
}
