//! Lite protocol buffers runtime.
//!
//! Message types derive their binary codec with `#[derive(Message)]` and their
//! protobuf-JSON codec with `#[derive(ProtoJson)]`. The generated code drives
//! the primitives in [`encoding`] and the state machines in [`json`]; no
//! reflection is involved at run time.
//!
//! ```ignore
//! #[derive(Clone, Debug, Default, PartialEq, Message, ProtoJson)]
//! #[protolite(name = "example.Greeting")]
//! pub struct Greeting {
//!     #[protolite(tag = 1, string)]
//!     pub text: String,
//!     #[protolite(tag = 2, int64, repeated)]
//!     pub ids: Vec<i64>,
//!     #[protolite(unknown)]
//!     pub unknown_fields: Vec<u8>,
//! }
//!
//! let greeting = Greeting { text: "hi".into(), ..Default::default() };
//! let bytes = greeting.marshal_vt()?;
//! let json = protolite::json::marshal(&greeting)?;
//! println!("{greeting:?}");
//! ```
//!
//! There is no protobuf text format. The human-readable form of a message is
//! its `Debug` output, so message types derive `Debug` alongside `Message`;
//! the well-known types in [`wkt`] all do.
#![warn(missing_docs)]

extern crate self as protolite;

mod error;
pub mod field;
pub mod fieldmask;
mod impls;
pub mod json;
pub mod kind;
mod read;
pub mod varint;
pub mod wkt;
mod write;

pub use error::{DecodeError, EncodeError};
pub use impls::{MapField, RepeatedField};
pub use read::ByteReader;
pub use write::ByteWriter;

pub mod encoding {
    //! Encoding and decoding of primitive types.
    pub use crate::read::*;
    pub use crate::varint::*;
    pub use crate::write::*;
}

// Re-export #[derive(Message, Enumeration, Oneof, ProtoJson)].
#[doc(hidden)]
pub use protolite_derive::*;

/// Wire type of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    /// Varint.
    Varint = 0,
    /// Little-endian 64-bit value.
    SixtyFourBit = 1,
    /// Length-delimited.
    LengthDelimited = 2,
    /// Start of a group (deprecated).
    StartGroup = 3,
    /// End of a group (deprecated).
    EndGroup = 4,
    /// Little-endian 32-bit value.
    ThirtyTwoBit = 5,
}

impl TryFrom<u64> for WireType {
    type Error = DecodeError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::SixtyFourBit),
            2 => Ok(WireType::LengthDelimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::ThirtyTwoBit),
            _ => Err(DecodeError::IllegalWireType(value)),
        }
    }
}

/// A protobuf message.
///
/// `marshal_to_sized_buffer_vt`, `size_vt`, `merge_field` and `equal_vt` are
/// generated by `#[derive(Message)]`; everything else is provided.
pub trait Message: Default {
    /// Exact number of bytes [`Message::marshal_vt`] produces.
    fn size_vt(&self) -> usize;

    /// Serialize the message into the free space in front of the writer's
    /// position. Fields are written last to first.
    fn marshal_to_sized_buffer_vt(&self, w: &mut ByteWriter) -> Result<(), EncodeError>;

    /// Merge one field whose key has already been read. Returns `false` if
    /// `tag` is not a field of this message.
    fn merge_field(&mut self, tag: u32, wire_type: WireType, r: &mut ByteReader) -> Result<bool, DecodeError>;

    /// Storage for the raw bytes of fields this message does not know, if the
    /// message keeps them.
    fn unknown_fields_mut(&mut self) -> Option<&mut Vec<u8>> {
        None
    }

    /// Field-by-field equality. Missing sub-messages equal empty ones.
    fn equal_vt(&self, other: &Self) -> bool;

    /// Serialize the message into a new buffer.
    fn marshal_vt(&self) -> Result<Vec<u8>, EncodeError> {
        let mut buf = vec![0; self.size_vt()];
        self.marshal_to_vt(&mut buf)?;
        Ok(buf)
    }

    /// Serialize the message into the front of `buf`, returning the number of
    /// bytes written.
    fn marshal_to_vt(&self, buf: &mut [u8]) -> Result<usize, EncodeError> {
        let size = self.size_vt();
        if buf.len() < size {
            return Err(EncodeError::InsufficientSpace {
                needed: size,
                available: buf.len(),
            });
        }
        let mut w = ByteWriter::new(&mut buf[..size]);
        self.marshal_to_sized_buffer_vt(&mut w)?;
        if w.remaining() != 0 {
            return Err(EncodeError::SizeMismatch {
                expected: size,
                written: w.len(),
            });
        }
        Ok(size)
    }

    /// Merge the encoded message in `data` into `self`.
    fn unmarshal_vt(&mut self, data: &[u8]) -> Result<(), DecodeError> {
        self.merge_from(&mut ByteReader::new(data))
    }

    /// Merge every remaining field of `r` into `self`. Embedded messages are
    /// read with [`ByteReader::read_nested`], which bounds their depth.
    fn merge_from(&mut self, r: &mut ByteReader) -> Result<(), DecodeError> {
        while !r.eof() {
            let start = r.pos();
            let (tag, wire_type) = r.read_key()?;
            if self.merge_field(tag, wire_type, r)? {
                continue;
            }
            let raw = r.read_unknown_field(start)?;
            match self.unknown_fields_mut() {
                Some(unknown) => {
                    tracing::trace!(tag, ?wire_type, len = raw.len(), "preserving unknown field");
                    unknown.extend_from_slice(raw);
                }
                None => tracing::trace!(tag, ?wire_type, "dropping unknown field"),
            }
        }
        Ok(())
    }

    /// Reset the message to its empty state.
    fn reset(&mut self) {
        *self = Self::default();
    }

    /// Deep copy of the message, unknown fields included.
    fn clone_vt(&self) -> Self
    where
        Self: Clone,
    {
        self.clone()
    }
}

/// A oneof: an enum with one variant per alternative field.
pub trait Oneof: Sized {
    /// Encoded size of the set alternative, key included.
    fn encoded_len(&self) -> usize;
    /// Serialize the set alternative.
    fn encode(&self, w: &mut ByteWriter) -> Result<(), EncodeError>;
    /// Merge the field `tag` into `this`, replacing a different alternative.
    fn merge(this: &mut Option<Self>, tag: u32, wire_type: WireType, r: &mut ByteReader) -> Result<(), DecodeError>;
    /// Whether both hold the same alternative with equal values.
    fn equal_vt(&self, other: &Self) -> bool;
}

/// A protobuf enum, as generated by `#[derive(Enumeration)]`.
pub trait Enumeration: Sized {
    /// Number to canonical name.
    const NUMBER_TO_NAME: &'static [(i32, &'static str)];
    /// Name (canonical names and aliases) to number.
    const NAME_TO_NUMBER: &'static [(&'static str, i32)];

    /// The variant with number `value`, if any.
    fn from_i32(value: i32) -> Option<Self>;
    /// The variant's number.
    fn as_i32(&self) -> i32;
    /// The variant's canonical name.
    fn as_str_name(&self) -> &'static str;
}

/// Fully-qualified protobuf name of a message type.
pub trait Name {
    /// Full name, e.g. `google.protobuf.Duration`.
    const FULL_NAME: &'static str;

    /// Type URL used when packing the message into `google.protobuf.Any`.
    fn type_url() -> String {
        format!("type.googleapis.com/{}", Self::FULL_NAME)
    }
}

/// Serialize a protobuf message to the front of a buffer.
pub fn write<M: Message>(msg: &M, buf: &mut [u8]) -> Result<usize, EncodeError> {
    msg.marshal_to_vt(buf)
}

/// Serialize a protobuf message to a new buffer.
pub fn to_vec<M: Message>(msg: &M) -> Result<Vec<u8>, EncodeError> {
    msg.marshal_vt()
}

/// Deserialize a protobuf message from a buffer.
pub fn read<M: Message>(buf: &[u8]) -> Result<M, DecodeError> {
    let mut msg = M::default();
    msg.unmarshal_vt(buf)?;
    Ok(msg)
}
