//! Unsigned base-128 varint codec.
//!
//! Each byte carries 7 payload bits, least-significant group first; a set
//! high bit means more bytes follow.
//!
//! | Value   | Encoded bytes        |
//! |---------|----------------------|
//! | 0       | `[0x00]`             |
//! | 127     | `[0x7F]`             |
//! | 128     | `[0x80, 0x01]`       |
//! | 150     | `[0x96, 0x01]`       |
//! | 300     | `[0xAC, 0x02]`       |

use crate::decoder::Source;
use crate::error::{Error, Result};
use bytes::BufMut;

/// Read one varint from `source`.
///
/// Groups beyond the tenth are accepted as long as they carry no payload,
/// so over-long zero-padded encodings still decode. Payload bits past bit
/// 63 fail with [`Error::VarintOverflow`].
pub fn decode<S: Source + ?Sized>(source: &mut S) -> Result<u64> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    loop {
        let offset = source.position();
        let byte = source.read_byte()?;
        let payload = u64::from(byte & 0x7F);

        if shift < 64 {
            if shift == 63 && payload > 1 {
                return Err(Error::VarintOverflow { offset });
            }
            result |= payload << shift;
        } else if payload != 0 {
            return Err(Error::VarintOverflow { offset });
        }

        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift = shift.saturating_add(7);
    }
}

/// Append the varint encoding of `value` to `buf`. Always writes at least one byte.
pub fn encode(mut value: u64, buf: &mut impl BufMut) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;

        if value == 0 {
            buf.put_u8(byte);
            return;
        }
        buf.put_u8(byte | 0x80);
    }
}

/// Number of bytes [`encode`] writes for `value`
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    (bits + 6) / 7
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::SliceSource;
    use bytes::Bytes;

    fn decode_all(data: &[u8]) -> Result<u64> {
        decode(&mut SliceSource::new(Bytes::copy_from_slice(data)))
    }

    fn encode_vec(value: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        encode(value, &mut buf);
        buf
    }

    #[test]
    fn test_encode_small_values() {
        assert_eq!(encode_vec(0), vec![0x00]);
        assert_eq!(encode_vec(1), vec![0x01]);
        assert_eq!(encode_vec(127), vec![0x7F]);
        assert_eq!(encode_vec(128), vec![0x80, 0x01]);
        assert_eq!(encode_vec(300), vec![0xAC, 0x02]);
    }

    #[test]
    fn test_decode_multi_byte() {
        assert_eq!(decode_all(&[0x96, 0x01]).unwrap(), 150);
        assert_eq!(decode_all(&[0xAC, 0x02]).unwrap(), 300);
    }

    #[test]
    fn test_decode_stops_at_terminator() {
        let mut source = SliceSource::new(Bytes::from_static(&[0x08, 0x96, 0x01]));
        assert_eq!(decode(&mut source).unwrap(), 8);
        assert_eq!(source.position(), 1);
        assert_eq!(decode(&mut source).unwrap(), 150);
        assert_eq!(source.position(), 3);
    }

    #[test]
    fn test_decode_max() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        assert_eq!(decode_all(&data).unwrap(), u64::MAX);
        assert_eq!(encode_vec(u64::MAX), data.to_vec());
    }

    #[test]
    fn test_decode_truncated() {
        let err = decode_all(&[0x96]).unwrap_err();
        assert!(matches!(err, Error::EndOfInput { offset: 1 }));

        let err = decode_all(&[]).unwrap_err();
        assert!(matches!(err, Error::EndOfInput { offset: 0 }));
    }

    #[test]
    fn test_decode_overflow() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02];
        assert!(matches!(
            decode_all(&data).unwrap_err(),
            Error::VarintOverflow { offset: 9 }
        ));

        let data = [0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert!(matches!(
            decode_all(&data).unwrap_err(),
            Error::VarintOverflow { offset: 10 }
        ));
    }

    #[test]
    fn test_decode_zero_padded() {
        let data = [0x81, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x00];
        assert_eq!(decode_all(&data).unwrap(), 1);
    }

    #[test]
    fn test_roundtrip_boundaries() {
        for shift in 0..64 {
            for value in [1u64 << shift, (1u64 << shift) - 1, (1u64 << shift) + 1] {
                let encoded = encode_vec(value);
                assert_eq!(encoded.len(), encoded_len(value), "length of {}", value);
                let decoded = decode(&mut SliceSource::new(Bytes::from(encoded))).unwrap();
                assert_eq!(decoded, value);
            }
        }
    }
}
