//! Wire-level encoding primitives shared by every packet type.
//!
//! MQTT prefixes each control packet with a variable-length "remaining length"
//! field: base-128 digits, least significant first, with bit 7 of each byte
//! acting as a continuation flag. Valid values span `0..=2_097_151` and encode
//! to one to four bytes. Everything past the fixed header is read and written
//! through the bounds-checked cursors in [`cursor`].

pub mod cursor;

use crate::error::Error;

/// Largest value representable by a four-byte remaining-length field.
pub const MAX_REMAINING_LENGTH: u32 = 2_097_151;

/// A remaining-length field in its encoded form, at most four bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedLength {
    bytes: [u8; 4],
    len: usize,
}

impl EncodedLength {
    /// The encoded bytes, ready to be written after the fixed header byte.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Number of bytes the encoding occupies (1..=4).
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; an encoded length occupies at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Encode `value` as a remaining-length field.
///
/// Returns [`Error::Overflow`] for values that would need a fifth byte.
pub fn encode_remaining_length(mut value: u32) -> Result<EncodedLength, Error> {
    if value > MAX_REMAINING_LENGTH {
        return Err(Error::Overflow);
    }
    let mut bytes = [0u8; 4];
    let mut len = 0;
    loop {
        let mut byte = (value % 128) as u8;
        value /= 128;
        if value > 0 {
            byte |= 0x80;
        }
        bytes[len] = byte;
        len += 1;
        if value == 0 {
            break;
        }
    }
    Ok(EncodedLength { bytes, len })
}

/// Decode a remaining-length field from the start of `bytes`.
///
/// Returns the decoded value and the number of bytes consumed. A fourth
/// byte with its continuation bit still set, or a value above
/// [`MAX_REMAINING_LENGTH`], yields [`Error::Overflow`]; input that ends
/// mid-field yields [`Error::Truncated`]. Callers must not ignore either
/// condition.
pub fn decode_remaining_length(bytes: &[u8]) -> Result<(u32, usize), Error> {
    let mut value = 0u32;
    let mut multiplier = 1u32;
    for (i, &byte) in bytes.iter().enumerate() {
        if i == 4 {
            return Err(Error::Overflow);
        }
        value += (byte as u32 & 0x7f) * multiplier;
        if byte & 0x80 == 0 {
            if value > MAX_REMAINING_LENGTH {
                return Err(Error::Overflow);
            }
            return Ok((value, i + 1));
        }
        multiplier *= 128;
    }
    if bytes.len() >= 4 {
        Err(Error::Overflow)
    } else {
        Err(Error::Truncated)
    }
}
