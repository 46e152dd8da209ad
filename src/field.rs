//! Field-level encoding helpers called by `#[derive(Message)]` code.
//!
//! One module per field label. Every `encode` prepends (the writer works
//! backwards), so each helper writes its payload before its key.

use crate::kind::ValueCodec;
use crate::varint::size_of_varint;
use crate::{ByteReader, ByteWriter, DecodeError, EncodeError, WireType};

/// Size of the key of field `tag`.
#[inline]
pub fn key_len(tag: u32) -> usize {
    size_of_varint(u64::from(tag << 3))
}

/// Fail unless a field arrived with the wire type its declaration expects.
#[inline]
pub fn check_wire_type(tag: u32, expected: WireType, actual: WireType) -> Result<(), DecodeError> {
    if expected != actual {
        return Err(DecodeError::WrongWireType {
            tag,
            expected: expected as u8,
            actual: actual as u8,
        });
    }
    Ok(())
}

/// Singular fields with implicit presence: default values are not written.
pub mod single {
    use super::*;

    /// Encoded size, key included.
    pub fn encoded_len<C: ValueCodec<V>, V>(tag: u32, value: &V) -> usize {
        if C::is_default(value) {
            return 0;
        }
        key_len(tag) + C::encoded_len(value)
    }

    /// Prepend the field.
    pub fn encode<C: ValueCodec<V>, V>(tag: u32, value: &V, w: &mut ByteWriter) -> Result<(), EncodeError> {
        if C::is_default(value) {
            return Ok(());
        }
        C::encode(value, w)?;
        w.write_key(tag, C::WIRE_TYPE)
    }

    /// Read the field's value.
    pub fn merge<C: ValueCodec<V>, V>(
        tag: u32,
        wire_type: WireType,
        value: &mut V,
        r: &mut ByteReader,
    ) -> Result<(), DecodeError> {
        check_wire_type(tag, C::WIRE_TYPE, wire_type)?;
        C::merge(value, r)
    }

    /// Field equality.
    pub fn equal<C: ValueCodec<V>, V>(a: &V, b: &V) -> bool {
        C::equal(a, b)
    }
}

/// Fields with explicit presence stored as `Option<V>`.
pub mod optional {
    use super::*;

    /// Encoded size, key included.
    pub fn encoded_len<C: ValueCodec<V>, V>(tag: u32, value: &Option<V>) -> usize {
        match value {
            Some(v) => key_len(tag) + C::encoded_len(v),
            None => 0,
        }
    }

    /// Prepend the field if it is present.
    pub fn encode<C: ValueCodec<V>, V>(tag: u32, value: &Option<V>, w: &mut ByteWriter) -> Result<(), EncodeError> {
        if let Some(v) = value {
            C::encode(v, w)?;
            w.write_key(tag, C::WIRE_TYPE)?;
        }
        Ok(())
    }

    /// Read the field's value, merging into an already present message.
    pub fn merge<C: ValueCodec<V>, V: Default>(
        tag: u32,
        wire_type: WireType,
        value: &mut Option<V>,
        r: &mut ByteReader,
    ) -> Result<(), DecodeError> {
        check_wire_type(tag, C::WIRE_TYPE, wire_type)?;
        C::merge(value.get_or_insert_with(V::default), r)
    }

    /// Presence-aware equality.
    pub fn equal<C: ValueCodec<V>, V>(a: &Option<V>, b: &Option<V>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => C::equal(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

/// Nullable message fields stored as `Option<M>`.
pub mod message {
    use super::*;

    /// Equality where a missing message equals an empty one.
    pub fn equal<C: ValueCodec<V>, V: Default>(a: &Option<V>, b: &Option<V>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => C::equal(a, b),
            (Some(x), None) | (None, Some(x)) => C::equal(x, &V::default()),
            (None, None) => true,
        }
    }
}

/// Repeated fields. Scalar numeric kinds may be packed.
pub mod repeated {
    use super::*;
    use crate::RepeatedField;

    fn packed_payload_len<C: ValueCodec<V>, V>(values: &[V]) -> usize {
        values.iter().map(C::encoded_len).sum()
    }

    /// Encoded size, keys included.
    pub fn encoded_len<C: ValueCodec<V>, V, R: RepeatedField<Item = V>>(tag: u32, values: &R, packed: bool) -> usize {
        let values = values.items();
        if values.is_empty() {
            return 0;
        }
        if packed {
            let n = packed_payload_len::<C, V>(values);
            key_len(tag) + size_of_varint(n as u64) + n
        } else {
            key_len(tag) * values.len() + packed_payload_len::<C, V>(values)
        }
    }

    /// Prepend every element.
    pub fn encode<C: ValueCodec<V>, V, R: RepeatedField<Item = V>>(
        tag: u32,
        values: &R,
        packed: bool,
        w: &mut ByteWriter,
    ) -> Result<(), EncodeError> {
        let values = values.items();
        if values.is_empty() {
            return Ok(());
        }
        if packed {
            w.write_length_delimited(|w| {
                for v in values.iter().rev() {
                    C::encode(v, w)?;
                }
                Ok(())
            })?;
            return w.write_key(tag, WireType::LengthDelimited);
        }
        for v in values.iter().rev() {
            C::encode(v, w)?;
            w.write_key(tag, C::WIRE_TYPE)?;
        }
        Ok(())
    }

    /// Append one element, or every element of a packed run.
    pub fn merge<C: ValueCodec<V>, V: Default, R: RepeatedField<Item = V>>(
        tag: u32,
        wire_type: WireType,
        values: &mut R,
        r: &mut ByteReader,
    ) -> Result<(), DecodeError> {
        if wire_type == WireType::LengthDelimited && C::WIRE_TYPE != WireType::LengthDelimited {
            let mut packed = ByteReader::new(r.read_length_delimited()?);
            while !packed.eof() {
                let mut v = V::default();
                C::merge(&mut v, &mut packed)?;
                values.push_item(v)?;
            }
            return Ok(());
        }
        check_wire_type(tag, C::WIRE_TYPE, wire_type)?;
        let mut v = V::default();
        C::merge(&mut v, r)?;
        values.push_item(v)
    }

    /// Element-wise equality.
    pub fn equal<C: ValueCodec<V>, V, R: RepeatedField<Item = V>>(a: &R, b: &R) -> bool {
        let (a, b) = (a.items(), b.items());
        a.len() == b.len() && a.iter().zip(b).all(|(a, b)| C::equal(a, b))
    }
}

/// Map fields, encoded as one `MapEntry { key = 1; value = 2; }` per entry.
pub mod map {
    use super::*;
    use crate::kind::MapKey;
    use crate::MapField;

    fn entry_len<KC: ValueCodec<K>, VC: ValueCodec<V>, K, V>(key: &K, value: &V) -> usize {
        key_len(1) + KC::encoded_len(key) + key_len(2) + VC::encoded_len(value)
    }

    /// Encoded size, keys included.
    pub fn encoded_len<KC, VC, M>(tag: u32, map: &M) -> usize
    where
        M: MapField,
        KC: MapKey<M::Key>,
        VC: ValueCodec<M::Value>,
    {
        map.sorted_entries()
            .into_iter()
            .map(|(k, v)| {
                let n = entry_len::<KC, VC, _, _>(k, v);
                key_len(tag) + size_of_varint(n as u64) + n
            })
            .sum()
    }

    /// Prepend every entry, so that they appear in ascending key order.
    pub fn encode<KC, VC, M>(tag: u32, map: &M, w: &mut ByteWriter) -> Result<(), EncodeError>
    where
        M: MapField,
        KC: MapKey<M::Key>,
        VC: ValueCodec<M::Value>,
    {
        for (k, v) in map.sorted_entries().into_iter().rev() {
            w.write_length_delimited(|w| {
                VC::encode(v, w)?;
                w.write_key(2, VC::WIRE_TYPE)?;
                KC::encode(k, w)?;
                w.write_key(1, KC::WIRE_TYPE)
            })?;
            w.write_key(tag, WireType::LengthDelimited)?;
        }
        Ok(())
    }

    /// Read one entry. Missing keys or values take their default.
    pub fn merge<KC, VC, M>(tag: u32, wire_type: WireType, map: &mut M, r: &mut ByteReader) -> Result<(), DecodeError>
    where
        M: MapField,
        M::Key: Default,
        M::Value: Default,
        KC: MapKey<M::Key>,
        VC: ValueCodec<M::Value>,
    {
        check_wire_type(tag, WireType::LengthDelimited, wire_type)?;
        let mut entry = r.read_nested()?;
        let mut key = M::Key::default();
        let mut value = M::Value::default();
        while !entry.eof() {
            let start = entry.pos();
            match entry.read_key()? {
                (1, wire_type) => single::merge::<KC, _>(1, wire_type, &mut key, &mut entry)?,
                (2, wire_type) => single::merge::<VC, _>(2, wire_type, &mut value, &mut entry)?,
                _ => {
                    entry.read_unknown_field(start)?;
                }
            }
        }
        map.insert_entry(key, value);
        Ok(())
    }

    /// Entry-wise equality, independent of iteration order.
    pub fn equal<KC, VC, M>(a: &M, b: &M) -> bool
    where
        M: MapField,
        KC: MapKey<M::Key>,
        VC: ValueCodec<M::Value>,
    {
        a.len() == b.len()
            && a.sorted_entries()
                .into_iter()
                .all(|(k, v)| b.get_value(k).map_or(false, |w| VC::equal(v, w)))
    }
}

/// Oneof fields stored as `Option<E>` where `E: Oneof`.
pub mod oneof {
    use super::*;
    use crate::Oneof;

    /// Encoded size of the set alternative.
    pub fn encoded_len<O: Oneof>(value: &Option<O>) -> usize {
        value.as_ref().map_or(0, O::encoded_len)
    }

    /// Prepend the set alternative.
    pub fn encode<O: Oneof>(value: &Option<O>, w: &mut ByteWriter) -> Result<(), EncodeError> {
        match value {
            Some(o) => o.encode(w),
            None => Ok(()),
        }
    }

    /// Equality of the set alternatives.
    pub fn equal<O: Oneof>(a: &Option<O>, b: &Option<O>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => a.equal_vt(b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Encoded size of one alternative. Alternatives are written even when
    /// they hold a default value.
    pub fn variant_encoded_len<C: ValueCodec<V>, V>(tag: u32, value: &V) -> usize {
        key_len(tag) + C::encoded_len(value)
    }

    /// Prepend one alternative.
    pub fn variant_encode<C: ValueCodec<V>, V>(tag: u32, value: &V, w: &mut ByteWriter) -> Result<(), EncodeError> {
        C::encode(value, w)?;
        w.write_key(tag, C::WIRE_TYPE)
    }

    /// Read one alternative's value.
    pub fn variant_merge<C: ValueCodec<V>, V>(
        tag: u32,
        wire_type: WireType,
        value: &mut V,
        r: &mut ByteReader,
    ) -> Result<(), DecodeError> {
        single::merge::<C, V>(tag, wire_type, value, r)
    }
}
