//! Text encodings used for fallback bytes and text values.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A text encoding the codec can apply to raw byte ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// Strict UTF-8
    #[default]
    Utf8,
    /// 7-bit ASCII
    Ascii,
    /// ISO-8859-1, every byte maps to the code point of the same value
    Latin1,
}

impl TextEncoding {
    /// Returns the canonical label
    pub fn as_str(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Ascii => "ascii",
            TextEncoding::Latin1 => "iso-8859-1",
        }
    }

    /// Interprets `data` as text, or `None` if it is not valid in this encoding
    pub fn decode(&self, data: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(data).ok().map(str::to_owned),
            TextEncoding::Ascii => data
                .is_ascii()
                .then(|| data.iter().map(|&b| char::from(b)).collect()),
            TextEncoding::Latin1 => Some(data.iter().map(|&b| char::from(b)).collect()),
        }
    }

    /// Converts `text` to bytes in this encoding
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        let limit = match self {
            TextEncoding::Utf8 => return Ok(text.as_bytes().to_vec()),
            TextEncoding::Ascii => 0x7F,
            TextEncoding::Latin1 => 0xFF,
        };

        text.chars()
            .map(|c| {
                u8::try_from(u32::from(c))
                    .ok()
                    .filter(|&b| u32::from(b) <= limit)
                    .ok_or(Error::UnencodableText {
                        encoding: *self,
                        character: c,
                    })
            })
            .collect()
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextEncoding {
    type Err = Error;

    fn from_str(label: &str) -> Result<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "ascii" | "us-ascii" => Ok(TextEncoding::Ascii),
            "latin1" | "latin-1" | "iso-8859-1" | "iso8859-1" => Ok(TextEncoding::Latin1),
            _ => Err(Error::unknown_encoding(label)),
        }
    }
}
