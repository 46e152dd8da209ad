//! Codecs for individual protobuf values.
//!
//! Each protobuf field kind has a unit type here. Generated code names the
//! kind of a field and lets the Rust storage type be inferred, e.g.
//! `field::single::encode::<kind::Sint64, _>(3, &self.offset, w)`.

use core::marker::PhantomData;

use crate::varint::{
    decode_zigzag32, decode_zigzag64, encode_zigzag32, encode_zigzag64, size_of_varint, size_of_zigzag,
};
use crate::{ByteReader, ByteWriter, DecodeError, EncodeError, Enumeration, Message, WireType};

/// Encoding of one protobuf value stored as a `V`.
pub trait ValueCodec<V> {
    /// Wire type of an unpacked value.
    const WIRE_TYPE: WireType;

    /// Encoded size of the value without its key. Length-delimited values
    /// include their length prefix.
    fn encoded_len(value: &V) -> usize;
    /// Prepend the value (without key) to `w`.
    fn encode(value: &V, w: &mut ByteWriter) -> Result<(), EncodeError>;
    /// Read one value (without key) from `r` into `value`. Scalars are
    /// replaced, messages are merged.
    fn merge(value: &mut V, r: &mut ByteReader) -> Result<(), DecodeError>;
    /// Whether a singular field holding `value` is omitted from the output.
    fn is_default(value: &V) -> bool;
    /// Value equality as used by `equal_vt`.
    fn equal(a: &V, b: &V) -> bool;
}

/// Kinds that may appear as the key of a map field.
pub trait MapKey<V>: ValueCodec<V> {}

macro_rules! varint_kind {
    ($(#[$doc:meta])* $kind:ident, $ty:ty, |$e:ident| $encode:expr, |$d:ident| $decode:expr, |$s:ident| $size:expr) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug)]
        pub struct $kind;

        impl ValueCodec<$ty> for $kind {
            const WIRE_TYPE: WireType = WireType::Varint;

            #[inline]
            fn encoded_len($s: &$ty) -> usize {
                $size
            }

            #[inline]
            fn encode($e: &$ty, w: &mut ByteWriter) -> Result<(), EncodeError> {
                w.write_varint($encode)
            }

            #[inline]
            fn merge(value: &mut $ty, r: &mut ByteReader) -> Result<(), DecodeError> {
                let $d = r.read_varint()?;
                *value = $decode;
                Ok(())
            }

            #[inline]
            fn is_default(value: &$ty) -> bool {
                *value == <$ty>::default()
            }

            #[inline]
            fn equal(a: &$ty, b: &$ty) -> bool {
                a == b
            }
        }

        impl MapKey<$ty> for $kind {}
    };
}

varint_kind!(
    /// `int32`: sign-extended to 64 bits, so negative values take 10 bytes.
    Int32, i32,
    |v| *v as i64 as u64,
    |x| x as i32,
    |v| size_of_varint(*v as i64 as u64)
);
varint_kind!(
    /// `int64`.
    Int64, i64,
    |v| *v as u64,
    |x| x as i64,
    |v| size_of_varint(*v as u64)
);
varint_kind!(
    /// `uint32`.
    Uint32, u32,
    |v| u64::from(*v),
    |x| x as u32,
    |v| size_of_varint(u64::from(*v))
);
varint_kind!(
    /// `uint64`.
    Uint64, u64,
    |v| *v,
    |x| x,
    |v| size_of_varint(*v)
);
varint_kind!(
    /// `sint32`: zigzag encoded.
    Sint32, i32,
    |v| u64::from(encode_zigzag32(*v)),
    |x| decode_zigzag32(x as u32),
    |v| size_of_varint(u64::from(encode_zigzag32(*v)))
);
varint_kind!(
    /// `sint64`: zigzag encoded.
    Sint64, i64,
    |v| encode_zigzag64(*v),
    |x| decode_zigzag64(x),
    |v| size_of_zigzag(*v as u64)
);
varint_kind!(
    /// `bool`. Any non-zero varint decodes as `true`.
    Bool, bool,
    |v| u64::from(*v),
    |x| x != 0,
    |_v| 1
);

macro_rules! fixed_kind {
    ($(#[$doc:meta])* $kind:ident, $ty:ty, $wire:ident, $size:expr, $write:ident, $read:ident, $to:expr, $from:expr) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug)]
        pub struct $kind;

        impl ValueCodec<$ty> for $kind {
            const WIRE_TYPE: WireType = WireType::$wire;

            #[inline]
            fn encoded_len(_value: &$ty) -> usize {
                $size
            }

            #[inline]
            fn encode(value: &$ty, w: &mut ByteWriter) -> Result<(), EncodeError> {
                w.$write($to(*value))
            }

            #[inline]
            fn merge(value: &mut $ty, r: &mut ByteReader) -> Result<(), DecodeError> {
                *value = $from(r.$read()?);
                Ok(())
            }

            #[inline]
            fn is_default(value: &$ty) -> bool {
                *value == <$ty>::default()
            }

            #[inline]
            fn equal(a: &$ty, b: &$ty) -> bool {
                a == b
            }
        }
    };
}

fixed_kind!(
    /// `fixed32`.
    Fixed32, u32, ThirtyTwoBit, 4, write_fixed32, read_fixed32, |v: u32| v, |v: u32| v
);
fixed_kind!(
    /// `fixed64`.
    Fixed64, u64, SixtyFourBit, 8, write_fixed64, read_fixed64, |v: u64| v, |v: u64| v
);
fixed_kind!(
    /// `sfixed32`.
    Sfixed32, i32, ThirtyTwoBit, 4, write_fixed32, read_fixed32, |v: i32| v as u32, |v: u32| v as i32
);
fixed_kind!(
    /// `sfixed64`.
    Sfixed64, i64, SixtyFourBit, 8, write_fixed64, read_fixed64, |v: i64| v as u64, |v: u64| v as i64
);
fixed_kind!(
    /// `float`.
    Float, f32, ThirtyTwoBit, 4, write_fixed32, read_fixed32, f32::to_bits, f32::from_bits
);
fixed_kind!(
    /// `double`.
    Double, f64, SixtyFourBit, 8, write_fixed64, read_fixed64, f64::to_bits, f64::from_bits
);

impl MapKey<u32> for Fixed32 {}
impl MapKey<u64> for Fixed64 {}
impl MapKey<i32> for Sfixed32 {}
impl MapKey<i64> for Sfixed64 {}

/// `string`, stored as `String` or `heapless::String<N>`.
#[derive(Clone, Copy, Debug)]
pub struct Str;

impl ValueCodec<String> for Str {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn encoded_len(value: &String) -> usize {
        size_of_varint(value.len() as u64) + value.len()
    }

    fn encode(value: &String, w: &mut ByteWriter) -> Result<(), EncodeError> {
        w.write_length_delimited(|w| w.write(value.as_bytes()))
    }

    fn merge(value: &mut String, r: &mut ByteReader) -> Result<(), DecodeError> {
        let s = r.read_str()?;
        value.clear();
        value.push_str(s);
        Ok(())
    }

    fn is_default(value: &String) -> bool {
        value.is_empty()
    }

    fn equal(a: &String, b: &String) -> bool {
        a == b
    }
}

impl MapKey<String> for Str {}

impl<const N: usize> ValueCodec<heapless::String<N>> for Str {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn encoded_len(value: &heapless::String<N>) -> usize {
        size_of_varint(value.len() as u64) + value.len()
    }

    fn encode(value: &heapless::String<N>, w: &mut ByteWriter) -> Result<(), EncodeError> {
        w.write_length_delimited(|w| w.write(value.as_bytes()))
    }

    fn merge(value: &mut heapless::String<N>, r: &mut ByteReader) -> Result<(), DecodeError> {
        let s = r.read_str()?;
        value.clear();
        value.push_str(s).map_err(|_| DecodeError::CapacityExceeded)
    }

    fn is_default(value: &heapless::String<N>) -> bool {
        value.is_empty()
    }

    fn equal(a: &heapless::String<N>, b: &heapless::String<N>) -> bool {
        a == b
    }
}

impl<const N: usize> MapKey<heapless::String<N>> for Str {}

/// `bytes`, stored as `Vec<u8>` or `heapless::Vec<u8, N>`.
#[derive(Clone, Copy, Debug)]
pub struct Bytes;

impl ValueCodec<Vec<u8>> for Bytes {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn encoded_len(value: &Vec<u8>) -> usize {
        size_of_varint(value.len() as u64) + value.len()
    }

    fn encode(value: &Vec<u8>, w: &mut ByteWriter) -> Result<(), EncodeError> {
        w.write_length_delimited(|w| w.write(value))
    }

    fn merge(value: &mut Vec<u8>, r: &mut ByteReader) -> Result<(), DecodeError> {
        let data = r.read_length_delimited()?;
        value.clear();
        value.extend_from_slice(data);
        Ok(())
    }

    fn is_default(value: &Vec<u8>) -> bool {
        value.is_empty()
    }

    fn equal(a: &Vec<u8>, b: &Vec<u8>) -> bool {
        a == b
    }
}

impl<const N: usize> ValueCodec<heapless::Vec<u8, N>> for Bytes {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn encoded_len(value: &heapless::Vec<u8, N>) -> usize {
        size_of_varint(value.len() as u64) + value.len()
    }

    fn encode(value: &heapless::Vec<u8, N>, w: &mut ByteWriter) -> Result<(), EncodeError> {
        w.write_length_delimited(|w| w.write(value))
    }

    fn merge(value: &mut heapless::Vec<u8, N>, r: &mut ByteReader) -> Result<(), DecodeError> {
        let data = r.read_length_delimited()?;
        value.clear();
        value.extend_from_slice(data).map_err(|_| DecodeError::CapacityExceeded)
    }

    fn is_default(value: &heapless::Vec<u8, N>) -> bool {
        value.is_empty()
    }

    fn equal(a: &heapless::Vec<u8, N>, b: &heapless::Vec<u8, N>) -> bool {
        a == b
    }
}

/// An enum field of type `E`, stored as its `i32` number so that unknown
/// numbers survive a round trip.
pub struct Enum<E>(PhantomData<E>);

impl<E: Enumeration> ValueCodec<i32> for Enum<E> {
    const WIRE_TYPE: WireType = WireType::Varint;

    fn encoded_len(value: &i32) -> usize {
        Int32::encoded_len(value)
    }

    fn encode(value: &i32, w: &mut ByteWriter) -> Result<(), EncodeError> {
        Int32::encode(value, w)
    }

    fn merge(value: &mut i32, r: &mut ByteReader) -> Result<(), DecodeError> {
        Int32::merge(value, r)
    }

    fn is_default(value: &i32) -> bool {
        *value == 0
    }

    fn equal(a: &i32, b: &i32) -> bool {
        a == b
    }
}

/// An embedded message.
#[derive(Clone, Copy, Debug)]
pub struct Msg;

impl<M: Message> ValueCodec<M> for Msg {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn encoded_len(value: &M) -> usize {
        let n = value.size_vt();
        size_of_varint(n as u64) + n
    }

    fn encode(value: &M, w: &mut ByteWriter) -> Result<(), EncodeError> {
        w.write_length_delimited(|w| value.marshal_to_sized_buffer_vt(w))
    }

    fn merge(value: &mut M, r: &mut ByteReader) -> Result<(), DecodeError> {
        value.merge_from(&mut r.read_nested()?)
    }

    /// Messages stored without `Option` are always written.
    fn is_default(_value: &M) -> bool {
        false
    }

    fn equal(a: &M, b: &M) -> bool {
        a.equal_vt(b)
    }
}
