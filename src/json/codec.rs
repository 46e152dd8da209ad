//! JSON forms of the value kinds in [`crate::kind`].

use super::{JsonErrorKind, MarshalProtoJson, MarshalState, UnmarshalProtoJson, UnmarshalState};
use crate::kind::{
    Bool, Bytes, Double, Enum, Fixed32, Fixed64, Float, Int32, Int64, Msg, Sfixed32, Sfixed64, Sint32, Sint64, Str,
    Uint32, Uint64,
};
use crate::{DecodeError, Enumeration};

/// JSON encoding of one value stored as a `V`.
pub trait JsonCodec<V> {
    /// Whether the value is a message, which is read and written with the
    /// field appended to the path.
    const NESTED: bool = false;

    /// Whether a singular field holding `value` is written without a mask.
    fn is_set(value: &V) -> bool;
    /// Write the value.
    fn write(value: &V, s: &mut MarshalState);
    /// Write the value of a singular field. Differs from `write` only for
    /// kinds whose empty value is written as `null`.
    fn write_field(value: &V, s: &mut MarshalState) {
        Self::write(value, s)
    }
    /// Read the value, replacing scalars and merging messages.
    fn read(value: &mut V, s: &mut UnmarshalState<'_>);
    /// Whether `null` is read as a value instead of clearing the field.
    fn null_is_value() -> bool {
        false
    }
}

/// Kinds that can be the key of a map, written as JSON object keys.
pub trait JsonMapKey<V> {
    /// Object key of `value`.
    fn key_string(value: &V) -> String;
    /// Parse an object key.
    fn parse_key(key: &str) -> Result<V, String>;
}

macro_rules! json_number {
    ($kind:ident, $ty:ty, $write:ident, $read:ident) => {
        impl JsonCodec<$ty> for $kind {
            fn is_set(value: &$ty) -> bool {
                *value != <$ty>::default()
            }

            fn write(value: &$ty, s: &mut MarshalState) {
                s.$write(*value)
            }

            fn read(value: &mut $ty, s: &mut UnmarshalState<'_>) {
                *value = s.$read();
            }
        }
    };
}

macro_rules! json_integer_key {
    ($kind:ident, $ty:ty) => {
        impl JsonMapKey<$ty> for $kind {
            fn key_string(value: &$ty) -> String {
                value.to_string()
            }

            fn parse_key(key: &str) -> Result<$ty, String> {
                key.parse().map_err(|_| format!("{:?} is not a valid {}", key, stringify!($ty)))
            }
        }
    };
}

json_number!(Int32, i32, write_int32, read_int32);
json_number!(Sint32, i32, write_int32, read_int32);
json_number!(Sfixed32, i32, write_int32, read_int32);
json_number!(Int64, i64, write_int64, read_int64);
json_number!(Sint64, i64, write_int64, read_int64);
json_number!(Sfixed64, i64, write_int64, read_int64);
json_number!(Uint32, u32, write_uint32, read_uint32);
json_number!(Fixed32, u32, write_uint32, read_uint32);
json_number!(Uint64, u64, write_uint64, read_uint64);
json_number!(Fixed64, u64, write_uint64, read_uint64);
json_number!(Float, f32, write_float32, read_float32);
json_number!(Double, f64, write_float64, read_float64);
json_number!(Bool, bool, write_bool, read_bool);

json_integer_key!(Int32, i32);
json_integer_key!(Sint32, i32);
json_integer_key!(Sfixed32, i32);
json_integer_key!(Int64, i64);
json_integer_key!(Sint64, i64);
json_integer_key!(Sfixed64, i64);
json_integer_key!(Uint32, u32);
json_integer_key!(Fixed32, u32);
json_integer_key!(Uint64, u64);
json_integer_key!(Fixed64, u64);

impl JsonMapKey<bool> for Bool {
    fn key_string(value: &bool) -> String {
        value.to_string()
    }

    fn parse_key(key: &str) -> Result<bool, String> {
        match key {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(format!("{:?} is not a valid bool", key)),
        }
    }
}

impl JsonCodec<String> for Str {
    fn is_set(value: &String) -> bool {
        !value.is_empty()
    }

    fn write(value: &String, s: &mut MarshalState) {
        s.write_string(value)
    }

    fn read(value: &mut String, s: &mut UnmarshalState<'_>) {
        *value = s.read_string();
    }
}

impl JsonMapKey<String> for Str {
    fn key_string(value: &String) -> String {
        value.clone()
    }

    fn parse_key(key: &str) -> Result<String, String> {
        Ok(key.to_owned())
    }
}

impl<const N: usize> JsonCodec<heapless::String<N>> for Str {
    fn is_set(value: &heapless::String<N>) -> bool {
        !value.is_empty()
    }

    fn write(value: &heapless::String<N>, s: &mut MarshalState) {
        s.write_string(value)
    }

    fn read(value: &mut heapless::String<N>, s: &mut UnmarshalState<'_>) {
        let read = s.read_string();
        value.clear();
        if value.push_str(&read).is_err() {
            s.set_error(JsonErrorKind::Decode(DecodeError::CapacityExceeded));
        }
    }
}

impl<const N: usize> JsonMapKey<heapless::String<N>> for Str {
    fn key_string(value: &heapless::String<N>) -> String {
        value.as_str().to_owned()
    }

    fn parse_key(key: &str) -> Result<heapless::String<N>, String> {
        let mut out = heapless::String::new();
        out.push_str(key)
            .map_err(|_| format!("key {:?} exceeds capacity {}", key, N))?;
        Ok(out)
    }
}

impl JsonCodec<Vec<u8>> for Bytes {
    fn is_set(value: &Vec<u8>) -> bool {
        !value.is_empty()
    }

    fn write(value: &Vec<u8>, s: &mut MarshalState) {
        s.write_bytes(value)
    }

    fn write_field(value: &Vec<u8>, s: &mut MarshalState) {
        if value.is_empty() {
            s.write_nil()
        } else {
            s.write_bytes(value)
        }
    }

    fn read(value: &mut Vec<u8>, s: &mut UnmarshalState<'_>) {
        *value = s.read_bytes();
    }
}

impl<const N: usize> JsonCodec<heapless::Vec<u8, N>> for Bytes {
    fn is_set(value: &heapless::Vec<u8, N>) -> bool {
        !value.is_empty()
    }

    fn write(value: &heapless::Vec<u8, N>, s: &mut MarshalState) {
        s.write_bytes(value)
    }

    fn write_field(value: &heapless::Vec<u8, N>, s: &mut MarshalState) {
        if value.is_empty() {
            s.write_nil()
        } else {
            s.write_bytes(value)
        }
    }

    fn read(value: &mut heapless::Vec<u8, N>, s: &mut UnmarshalState<'_>) {
        let read = s.read_bytes();
        value.clear();
        if value.extend_from_slice(&read).is_err() {
            s.set_error(JsonErrorKind::Decode(DecodeError::CapacityExceeded));
        }
    }
}

impl<E: Enumeration> JsonCodec<i32> for Enum<E> {
    fn is_set(value: &i32) -> bool {
        *value != 0
    }

    fn write(value: &i32, s: &mut MarshalState) {
        s.write_enum(*value, &[E::NUMBER_TO_NAME])
    }

    fn read(value: &mut i32, s: &mut UnmarshalState<'_>) {
        *value = s.read_enum(&[E::NAME_TO_NUMBER]);
    }
}

impl<M: MarshalProtoJson + UnmarshalProtoJson> JsonCodec<M> for Msg {
    const NESTED: bool = true;

    fn is_set(_value: &M) -> bool {
        true
    }

    fn write(value: &M, s: &mut MarshalState) {
        value.marshal_protojson(s)
    }

    fn read(value: &mut M, s: &mut UnmarshalState<'_>) {
        value.unmarshal_protojson(s)
    }

    fn null_is_value() -> bool {
        M::NULL_IS_VALUE
    }
}
