use crate::varint::{decode_varint, skip};
use crate::{DecodeError, WireType};

/// Largest field number allowed by the protobuf language.
pub const MAX_TAG: u64 = (1 << 29) - 1;

/// How many length-delimited records a top-level message may nest.
pub const RECURSION_LIMIT: u32 = 128;

/// Forward reader over an encoded message.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    depth: u32,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            depth: RECURSION_LIMIT,
        }
    }

    /// Read a length-delimited record and return a reader over it, one
    /// nesting level deeper than `self`.
    pub fn read_nested(&mut self) -> Result<ByteReader<'a>, DecodeError> {
        if self.depth == 0 {
            return Err(DecodeError::RecursionLimitExceeded);
        }
        Ok(ByteReader {
            data: self.read_length_delimited()?,
            pos: 0,
            depth: self.depth - 1,
        })
    }

    /// Offset of the next unread byte.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes that have not been read yet.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Whether every byte has been consumed.
    pub fn eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn read<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        let end = self.pos.checked_add(N).ok_or(DecodeError::UnexpectedEof)?;
        let src = self.data.get(self.pos..end).ok_or(DecodeError::UnexpectedEof)?;
        out.copy_from_slice(src);
        self.pos = end;
        Ok(out)
    }

    /// Read a little-endian 32-bit value.
    pub fn read_fixed32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read()?))
    }

    /// Read a little-endian 64-bit value.
    pub fn read_fixed64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.read()?))
    }

    /// Read a varint.
    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let (v, n) = decode_varint(self.data, self.pos)?;
        self.pos += n;
        Ok(v)
    }

    /// Read a field key, returning the field number and wire type.
    pub fn read_key(&mut self) -> Result<(u32, WireType), DecodeError> {
        let key = self.read_varint()?;
        let wire_type = WireType::try_from(key & 0x7)?;
        let tag = key >> 3;
        if tag == 0 || tag > MAX_TAG {
            return Err(DecodeError::IllegalTag {
                tag,
                wire_type: wire_type as u8,
            });
        }
        if wire_type == WireType::EndGroup {
            return Err(DecodeError::UnexpectedEndOfGroup);
        }
        Ok((tag as u32, wire_type))
    }

    /// Read `len` raw bytes.
    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(len).ok_or(DecodeError::InvalidLength)?;
        if end > self.data.len() {
            return Err(DecodeError::UnexpectedEof);
        }
        let res = &self.data[self.pos..end];
        self.pos = end;
        Ok(res)
    }

    /// Read a length prefix followed by that many bytes.
    pub fn read_length_delimited(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_varint()?;
        if (len as i64) < 0 || len > usize::MAX as u64 {
            return Err(DecodeError::InvalidLength);
        }
        self.read_slice(len as usize)
    }

    /// Read a length-delimited UTF-8 string without copying it.
    pub fn read_str(&mut self) -> Result<&'a str, DecodeError> {
        core::str::from_utf8(self.read_length_delimited()?).map_err(|_| DecodeError::InvalidUtf8)
    }

    /// Rewind to the key at `start` and consume the whole field that begins
    /// there, returning its raw bytes (key included).
    pub fn read_unknown_field(&mut self, start: usize) -> Result<&'a [u8], DecodeError> {
        let n = skip(&self.data[start..])?;
        self.pos = start + n;
        Ok(&self.data[start..self.pos])
    }
}
