//! Variable-length integer code.
//!
//! Three forms, selected by the top bits of the first byte:
//!
//! * `0xxxxxxx`: 7-bit payload.
//! * `10xxxxxx yyyyyyyy`: 14-bit payload `y << 6 | x`.
//! * `11nnnnnn` + `n` bytes: `8n`-bit little-endian payload.
//!
//! Signed readers sign-extend the payload from its own width, unsigned
//! readers take it as a magnitude.

use crate::error::CodecError;

/// Longest encoding produced by the writers: marker plus 8 bytes.
pub const MAX_ENCODED_LEN: usize = 9;

/// Append the shortest encoding of `value` that a signed reader maps back
/// to `value`.
pub fn encode_signed(value: i64, out: &mut Vec<u8>) {
    if (-64..=63).contains(&value) {
        out.push(value as u8 & 0x7f);
    } else if (-8192..=8191).contains(&value) {
        out.push(0x80 | (value as u8 & 0x3f));
        out.push((value >> 6) as u8);
    } else {
        let mut n = 2;
        while n < 8 {
            let bound = 1i64 << (8 * n - 1);
            if (-bound..bound).contains(&value) {
                break;
            }
            n += 1;
        }
        push_extended(value as u64, n, out);
    }
}

/// Append the shortest encoding of `value` whose payload, read as a
/// magnitude, is `value`.
pub fn encode_unsigned(value: u64, out: &mut Vec<u8>) {
    if value < 0x80 {
        out.push(value as u8);
    } else if value < 0x4000 {
        out.push(0x80 | (value as u8 & 0x3f));
        out.push((value >> 6) as u8);
    } else {
        let n = (64 - value.leading_zeros() as usize).div_ceil(8);
        push_extended(value, n, out);
    }
}

fn push_extended(value: u64, n: usize, out: &mut Vec<u8>) {
    out.push(0xc0 | n as u8);
    out.extend_from_slice(&value.to_le_bytes()[..n]);
}

/// Size of `encode_unsigned(value)` without encoding it.
pub fn unsigned_len(value: u64) -> usize {
    if value < 0x80 {
        1
    } else if value < 0x4000 {
        2
    } else {
        1 + (64 - value.leading_zeros() as usize).div_ceil(8)
    }
}

/// The raw payload and its width in bits, plus the number of bytes read.
/// Payloads wider than 64 bits have their extension bytes returned as a
/// slice for the caller to check.
struct Raw<'a> {
    payload: u64,
    width: u32,
    extension: &'a [u8],
    len: usize,
}

fn read_raw(bytes: &[u8]) -> Result<Raw<'_>, CodecError> {
    let first = *bytes.first().ok_or(CodecError::Truncated { need: 1, have: 0 })?;
    if first & 0x80 == 0 {
        return Ok(Raw {
            payload: (first & 0x7f) as u64,
            width: 7,
            extension: &[],
            len: 1,
        });
    }
    if first & 0x40 == 0 {
        let second = *bytes.get(1).ok_or(CodecError::Truncated {
            need: 2,
            have: bytes.len(),
        })?;
        return Ok(Raw {
            payload: ((second as u64) << 6) | (first & 0x3f) as u64,
            width: 14,
            extension: &[],
            len: 2,
        });
    }

    let n = (first & 0x3f) as usize;
    if bytes.len() < 1 + n {
        return Err(CodecError::Truncated {
            need: 1 + n,
            have: bytes.len(),
        });
    }
    let body = &bytes[1..1 + n];
    let (low, extension) = body.split_at(n.min(8));
    let mut le = [0u8; 8];
    le[..low.len()].copy_from_slice(low);
    Ok(Raw {
        payload: u64::from_le_bytes(le),
        width: 8 * low.len() as u32,
        extension,
        len: 1 + n,
    })
}

/// Decode a signed integer that must fit in `bits` (8..=64).
pub fn decode_signed(bytes: &[u8], bits: u32) -> Result<(i64, usize), CodecError> {
    let raw = read_raw(bytes)?;
    let value = if raw.width == 0 {
        0
    } else {
        let shift = 64 - raw.width;
        ((raw.payload << shift) as i64) >> shift
    };

    let fill = if value < 0 { 0xff } else { 0x00 };
    if raw.extension.iter().any(|&b| b != fill) {
        return Err(CodecError::Overflow { bits });
    }
    if bits < 64 {
        let bound = 1i64 << (bits - 1);
        if !(-bound..bound).contains(&value) {
            return Err(CodecError::Overflow { bits });
        }
    }
    Ok((value, raw.len))
}

/// Decode an unsigned integer that must fit in `bits` (8..=64).
pub fn decode_unsigned(bytes: &[u8], bits: u32) -> Result<(u64, usize), CodecError> {
    let raw = read_raw(bytes)?;
    if raw.extension.iter().any(|&b| b != 0) {
        return Err(CodecError::Overflow { bits });
    }
    if bits < 64 && raw.payload >> bits != 0 {
        return Err(CodecError::Overflow { bits });
    }
    Ok((raw.payload, raw.len))
}
