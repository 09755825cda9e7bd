//! Modified UTF-8, the text encoding of the native interface.
//!
//! Differs from standard UTF-8 in two ways: U+0000 is encoded as the two
//! bytes `C0 80`, and characters outside the basic multilingual plane are
//! encoded as two three-byte surrogates rather than one four-byte sequence.
//! Both directions work on UTF-16 code units, which is how guest strings
//! store text.

use thiserror::Error;

/// Malformed modified UTF-8 input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed modified UTF-8 at byte {offset}")]
pub struct Mutf8Error {
    /// Offset of the first byte of the bad sequence
    pub offset: usize,
}

/// Number of bytes `units` occupies once encoded (without a terminator).
pub fn encoded_len(units: &[u16]) -> usize {
    units.iter().map(|&u| unit_len(u)).sum()
}

fn unit_len(unit: u16) -> usize {
    match unit {
        0x0001..=0x007f => 1,
        0x0000 | 0x0080..=0x07ff => 2,
        _ => 3,
    }
}

/// Encodes UTF-16 code units as modified UTF-8.
///
/// # Examples
///
/// ```
/// use core_types::mutf8;
///
/// assert_eq!(mutf8::encode(&[0x41, 0x0000]), vec![0x41, 0xc0, 0x80]);
/// ```
pub fn encode(units: &[u16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(units));
    for &unit in units {
        encode_unit(unit, &mut out);
    }
    out
}

fn encode_unit(unit: u16, out: &mut Vec<u8>) {
    match unit_len(unit) {
        1 => out.push(unit as u8),
        2 => {
            out.push(0xc0 | ((unit >> 6) & 0x1f) as u8);
            out.push(0x80 | (unit & 0x3f) as u8);
        }
        _ => {
            out.push(0xe0 | ((unit >> 12) & 0x0f) as u8);
            out.push(0x80 | ((unit >> 6) & 0x3f) as u8);
            out.push(0x80 | (unit & 0x3f) as u8);
        }
    }
}

/// Decodes modified UTF-8 into UTF-16 code units.
///
/// Standard four-byte sequences are accepted as well and split into a
/// surrogate pair.
pub fn decode(bytes: &[u8]) -> Result<Vec<u16>, Mutf8Error> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i];
        let cont = |n: usize| -> Result<u16, Mutf8Error> {
            match bytes.get(i + n) {
                Some(&b) if b & 0xc0 == 0x80 => Ok((b & 0x3f) as u16),
                _ => Err(Mutf8Error { offset: i }),
            }
        };
        match b0 {
            0x01..=0x7f => {
                out.push(b0 as u16);
                i += 1;
            }
            0xc0..=0xdf => {
                out.push(((b0 as u16 & 0x1f) << 6) | cont(1)?);
                i += 2;
            }
            0xe0..=0xef => {
                out.push(((b0 as u16 & 0x0f) << 12) | (cont(1)? << 6) | cont(2)?);
                i += 3;
            }
            0xf0..=0xf4 => {
                let cp = ((b0 as u32 & 0x07) << 18)
                    | ((cont(1)? as u32) << 12)
                    | ((cont(2)? as u32) << 6)
                    | cont(3)? as u32;
                let ch = char::from_u32(cp).ok_or(Mutf8Error { offset: i })?;
                let mut pair = [0u16; 2];
                out.extend_from_slice(ch.encode_utf16(&mut pair));
                i += 4;
            }
            _ => return Err(Mutf8Error { offset: i }),
        }
    }
    Ok(out)
}

/// Decodes modified UTF-8, substituting U+FFFD for malformed sequences.
pub fn decode_lossy(bytes: &[u8]) -> Vec<u16> {
    match decode(bytes) {
        Ok(units) => units,
        Err(err) => {
            let mut units = decode(&bytes[..err.offset]).unwrap_or_default();
            units.push(0xfffd);
            units.extend(decode_lossy(&bytes[err.offset + 1..]));
            units
        }
    }
}
