//! Varint, zigzag and unknown-field skipping primitives.

use crate::DecodeError;

/// Append the varint encoding of `v` to `b`.
pub fn append_varint(b: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        b.push((v as u8) | 0x80);
        v >>= 7;
    }
    b.push(v as u8);
}

/// Write the varint encoding of `v` so that it ends right before `offset`,
/// returning the index of its first byte.
///
/// The buffer is filled from the back, so the caller must have reserved
/// [`size_of_varint`] bytes in front of `offset`.
///
/// # Panics
///
/// Panics if `offset < size_of_varint(v)` or `offset > buf.len()`.
pub fn encode_varint(buf: &mut [u8], offset: usize, mut v: u64) -> usize {
    let base = offset - size_of_varint(v);
    let mut i = base;
    while v >= 0x80 {
        buf[i] = (v as u8) | 0x80;
        v >>= 7;
        i += 1;
    }
    buf[i] = v as u8;
    base
}

/// Decode a varint starting at `offset`, returning the value and the number of
/// bytes it occupied.
pub fn decode_varint(buf: &[u8], offset: usize) -> Result<(u64, usize), DecodeError> {
    let mut v = 0u64;
    let mut i = offset;
    let mut shift = 0u32;
    loop {
        if shift >= 64 {
            return Err(DecodeError::IntOverflow);
        }
        let b = *buf.get(i).ok_or(DecodeError::UnexpectedEof)?;
        i += 1;
        v |= u64::from(b & 0x7F) << shift;
        if b < 0x80 {
            return Ok((v, i - offset));
        }
        shift += 7;
    }
}

/// Number of bytes needed to encode `x` as a varint.
#[inline]
pub fn size_of_varint(x: u64) -> usize {
    ((64 - (x | 1).leading_zeros()) as usize + 6) / 7
}

/// Number of bytes needed to encode `x` as a zigzag varint.
#[inline]
pub fn size_of_zigzag(x: u64) -> usize {
    size_of_varint((x << 1) ^ ((x as i64 >> 63) as u64))
}

/// Zigzag-encode a 32-bit signed integer.
#[inline]
pub fn encode_zigzag32(v: i32) -> u32 {
    ((v << 1) ^ (v >> 31)) as u32
}

/// Zigzag-decode a 32-bit value.
#[inline]
pub fn decode_zigzag32(v: u32) -> i32 {
    ((v >> 1) as i32) ^ -((v & 1) as i32)
}

/// Zigzag-encode a 64-bit signed integer.
#[inline]
pub fn encode_zigzag64(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

/// Zigzag-decode a 64-bit value.
#[inline]
pub fn decode_zigzag64(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

/// Return the length of the field starting at the beginning of `data`,
/// including its key. Groups are skipped as a whole.
pub fn skip(data: &[u8]) -> Result<usize, DecodeError> {
    let l = data.len();
    let mut i = 0usize;
    let mut depth = 0usize;
    while i < l {
        let (wire, n) = decode_varint(data, i)?;
        i += n;
        match wire & 0x7 {
            0 => {
                let (_, n) = decode_varint(data, i)?;
                i += n;
            }
            1 => i = i.checked_add(8).ok_or(DecodeError::InvalidLength)?,
            2 => {
                let (length, n) = decode_varint(data, i)?;
                i += n;
                if (length as i64) < 0 {
                    return Err(DecodeError::InvalidLength);
                }
                i = i.checked_add(length as usize).ok_or(DecodeError::InvalidLength)?;
            }
            3 => depth += 1,
            4 => {
                if depth == 0 {
                    return Err(DecodeError::UnexpectedEndOfGroup);
                }
                depth -= 1;
            }
            5 => i = i.checked_add(4).ok_or(DecodeError::InvalidLength)?,
            wire_type => return Err(DecodeError::IllegalWireType(wire_type)),
        }
        if i > l {
            return Err(DecodeError::UnexpectedEof);
        }
        if depth == 0 {
            return Ok(i);
        }
    }
    Err(DecodeError::UnexpectedEof)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_boundaries() {
        for (v, len) in [
            (0u64, 1),
            (1, 1),
            (127, 1),
            (128, 2),
            (16_383, 2),
            (16_384, 3),
            (u32::MAX as u64, 5),
            (u64::MAX, 10),
        ] {
            let mut buf = Vec::new();
            append_varint(&mut buf, v);
            assert_eq!(buf.len(), len, "{}", v);
            assert_eq!(size_of_varint(v), len);
            assert_eq!(decode_varint(&buf, 0), Ok((v, len)));
        }
    }

    #[test]
    fn encode_backwards_matches_append() {
        let v = 300u64;
        let mut buf = [0u8; 8];
        let start = encode_varint(&mut buf, 8, v);
        assert_eq!(start, 6);
        assert_eq!(&buf[6..], &[0xAC, 0x02]);
    }

    #[test]
    fn decode_rejects_overlong_and_truncated() {
        assert_eq!(decode_varint(&[0xFF; 11], 0), Err(DecodeError::IntOverflow));
        assert_eq!(decode_varint(&[0x80, 0x80], 0), Err(DecodeError::UnexpectedEof));
    }

    #[test]
    fn zigzag() {
        assert_eq!(encode_zigzag32(0), 0);
        assert_eq!(encode_zigzag32(-1), 1);
        assert_eq!(encode_zigzag32(1), 2);
        assert_eq!(encode_zigzag32(i32::MIN), u32::MAX);
        assert_eq!(decode_zigzag32(u32::MAX), i32::MIN);
        assert_eq!(decode_zigzag64(encode_zigzag64(-123_456_789)), -123_456_789);
        assert_eq!(size_of_zigzag(-1i64 as u64), 1);
        assert_eq!(size_of_zigzag(i64::MIN as u64), 10);
    }

    #[test]
    fn skip_wire_types() {
        // field 1 varint 150
        assert_eq!(skip(&[0x08, 0x96, 0x01, 0xFF]), Ok(3));
        // field 2 fixed64
        assert_eq!(skip(&[0x11, 0, 0, 0, 0, 0, 0, 0, 0]), Ok(9));
        // field 3 length-delimited "ab"
        assert_eq!(skip(&[0x1A, 0x02, b'a', b'b']), Ok(4));
        // field 4 fixed32
        assert_eq!(skip(&[0x25, 1, 2, 3, 4]), Ok(5));
        // group 5 containing field 1 varint, then end group 5
        assert_eq!(skip(&[0x2B, 0x08, 0x01, 0x2C]), Ok(4));
    }

    #[test]
    fn skip_errors() {
        assert_eq!(skip(&[0x0C]), Err(DecodeError::UnexpectedEndOfGroup));
        assert_eq!(skip(&[0x0E]), Err(DecodeError::IllegalWireType(6)));
        assert_eq!(skip(&[0x1A, 0x05, b'a']), Err(DecodeError::UnexpectedEof));
        assert_eq!(skip(&[0x2B, 0x08, 0x01]), Err(DecodeError::UnexpectedEof));
        assert_eq!(
            skip(&[0x1A, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]),
            Err(DecodeError::InvalidLength)
        );
    }
}
