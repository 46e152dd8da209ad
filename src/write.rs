use crate::varint::{encode_varint, size_of_varint};
use crate::{EncodeError, WireType};

/// Writer for protobuf messages.
///
/// The buffer is filled from the end towards the start, so nested
/// length-delimited values can be written before their length prefix without
/// computing sizes twice. Fields must therefore be written in reverse order.
pub struct ByteWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> ByteWriter<'a> {
    /// Create a new [`ByteWriter`] that fills `buf` from the back.
    pub fn new(buf: &'a mut [u8]) -> Self {
        let pos = buf.len();
        Self { buf, pos }
    }

    /// Get the bytes written so far.
    pub fn bytes(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    /// Number of bytes still free in front of the written region.
    pub fn remaining(&self) -> usize {
        self.pos
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn reserve(&self, needed: usize) -> Result<(), EncodeError> {
        if self.pos < needed {
            return Err(EncodeError::InsufficientSpace {
                needed,
                available: self.pos,
            });
        }
        Ok(())
    }

    /// Prepend `bytes`.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.reserve(bytes.len())?;
        self.pos -= bytes.len();
        self.buf[self.pos..][..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Prepend a little-endian u32.
    pub fn write_fixed32(&mut self, val: u32) -> Result<(), EncodeError> {
        self.write(&val.to_le_bytes())
    }

    /// Prepend a little-endian u64.
    pub fn write_fixed64(&mut self, val: u64) -> Result<(), EncodeError> {
        self.write(&val.to_le_bytes())
    }

    /// Prepend a varint.
    pub fn write_varint(&mut self, val: u64) -> Result<(), EncodeError> {
        self.reserve(size_of_varint(val))?;
        self.pos = encode_varint(self.buf, self.pos, val);
        Ok(())
    }

    /// Prepend a field key.
    pub fn write_key(&mut self, tag: u32, wire_type: WireType) -> Result<(), EncodeError> {
        self.write_varint(u64::from(tag << 3 | wire_type as u32))
    }

    /// Write length-delimited data: `f` writes the payload, then its length
    /// is prepended.
    pub fn write_length_delimited(
        &mut self,
        f: impl FnOnce(&mut ByteWriter) -> Result<(), EncodeError>,
    ) -> Result<(), EncodeError> {
        let end = self.pos;
        f(self)?;
        let len = end - self.pos;
        self.write_varint(len as u64)
    }
}
