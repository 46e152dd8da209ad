//! Field-level JSON helpers called by `#[derive(ProtoJson)]` code.
//!
//! Writers emit only the value; the derived code writes the key and decides
//! whether the field is written at all. Readers record the field in the
//! field mask, then read its value.

use super::codec::{JsonCodec, JsonMapKey};
use super::{JsonErrorKind, MarshalState, UnmarshalState};
use crate::{MapField, RepeatedField};

fn write_value<C: JsonCodec<V>, V>(field: &str, value: &V, s: &mut MarshalState) {
    if C::NESTED {
        s.with_field(field, |s| C::write(value, s))
    } else {
        C::write(value, s)
    }
}

fn read_value<C: JsonCodec<V>, V>(field: &str, value: &mut V, s: &mut UnmarshalState<'_>) {
    if C::NESTED {
        s.with_field(field, false, |s| C::read(value, s))
    } else {
        C::read(value, s)
    }
}

/// Whether a singular field is written without being named by the mask.
pub fn single_is_set<C: JsonCodec<V>, V>(value: &V) -> bool {
    C::is_set(value)
}

/// Write a singular field.
pub fn write_single<C: JsonCodec<V>, V>(field: &str, value: &V, s: &mut MarshalState) {
    if C::NESTED {
        s.with_field(field, |s| C::write_field(value, s))
    } else {
        C::write_field(value, s)
    }
}

/// Write a field with explicit presence; an absent value is `null`.
pub fn write_optional<C: JsonCodec<V>, V>(field: &str, value: &Option<V>, s: &mut MarshalState) {
    match value {
        Some(v) => write_value::<C, V>(field, v, s),
        None => s.write_nil(),
    }
}

/// Write the value of the set alternative of a oneof.
pub fn write_oneof<C: JsonCodec<V>, V>(field: &str, value: &V, s: &mut MarshalState) {
    write_value::<C, V>(field, value, s)
}

/// Write a repeated field as an array.
pub fn write_repeated<C, V, R>(field: &str, values: &R, s: &mut MarshalState)
where
    C: JsonCodec<V>,
    R: RepeatedField<Item = V>,
{
    s.write_array_start();
    let mut wrote = false;
    for v in values.items() {
        s.write_more_if(&mut wrote);
        write_value::<C, V>(field, v, s);
    }
    s.write_array_end();
}

/// Write a map field as an object with entries in key order.
pub fn write_map<KC, VC, M>(field: &str, map: &M, s: &mut MarshalState)
where
    M: MapField,
    KC: JsonMapKey<M::Key>,
    VC: JsonCodec<M::Value>,
{
    s.write_object_start();
    let mut wrote = false;
    for (k, v) in map.sorted_entries() {
        s.write_more_if(&mut wrote);
        s.write_object_field(&KC::key_string(k));
        write_value::<VC, _>(field, v, s);
    }
    s.write_object_end();
}

/// Read a singular field. `null` resets it to its default.
pub fn read_single<C: JsonCodec<V>, V: Default>(field: &str, value: &mut V, s: &mut UnmarshalState<'_>) {
    s.add_field(field);
    if !C::null_is_value() && s.read_nil() {
        *value = V::default();
        return;
    }
    read_value::<C, V>(field, value, s)
}

/// Read a field with explicit presence. `null` clears it.
pub fn read_optional<C: JsonCodec<V>, V: Default>(field: &str, value: &mut Option<V>, s: &mut UnmarshalState<'_>) {
    s.add_field(field);
    if !C::null_is_value() && s.read_nil() {
        *value = None;
        return;
    }
    read_value::<C, V>(field, value.get_or_insert_with(V::default), s)
}

/// Read a oneof alternative. Returns `None` for `null`, which leaves the
/// oneof unchanged.
pub fn read_oneof<C: JsonCodec<V>, V: Default>(field: &str, s: &mut UnmarshalState<'_>) -> Option<V> {
    s.add_field(field);
    if !C::null_is_value() && s.read_nil() {
        return None;
    }
    let mut value = V::default();
    read_value::<C, V>(field, &mut value, s);
    Some(value)
}

/// Read an array into a repeated field, appending. `null` clears the field.
pub fn read_repeated<C, V, R>(field: &str, values: &mut R, s: &mut UnmarshalState<'_>)
where
    C: JsonCodec<V>,
    V: Default,
    R: RepeatedField<Item = V>,
{
    s.add_field(field);
    if s.read_nil() {
        values.clear_items();
        return;
    }
    if !s.enter_array() {
        return;
    }
    while s.next_element() {
        let mut v = V::default();
        read_value::<C, V>(field, &mut v, s);
        if let Err(err) = values.push_item(v) {
            return s.set_error(JsonErrorKind::Decode(err));
        }
    }
}

/// Read an object into a map field, inserting. `null` clears the field.
pub fn read_map<KC, VC, M>(field: &str, map: &mut M, s: &mut UnmarshalState<'_>)
where
    M: MapField,
    M::Value: Default,
    KC: JsonMapKey<M::Key>,
    VC: JsonCodec<M::Value>,
{
    s.add_field(field);
    if s.read_nil() {
        map.clear_entries();
        return;
    }
    if !s.enter_object() {
        return;
    }
    while let Some(key) = s.next_key() {
        let k = match KC::parse_key(&key) {
            Ok(k) => k,
            Err(cause) => return s.set_error(JsonErrorKind::InvalidValue { ty: "map key", cause }),
        };
        let mut v = M::Value::default();
        read_value::<VC, _>(field, &mut v, s);
        map.insert_entry(k, v);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::json::{DEFAULT_MARSHALER_CONFIG, DEFAULT_UNMARSHALER_CONFIG};
    use crate::kind::{Int64, Sint32, Str};

    #[test]
    fn repeated_and_map_round_trip() {
        let values = vec![1i64, -2];
        let mut map = BTreeMap::new();
        map.insert(10i32, "x".to_string());
        map.insert(-1, "y".to_string());

        let mut s = MarshalState::new(DEFAULT_MARSHALER_CONFIG);
        s.write_array_start();
        write_repeated::<Int64, _, _>("values", &values, &mut s);
        s.write_more();
        write_map::<Sint32, Str, _>("map", &map, &mut s);
        s.write_array_end();
        assert_eq!(s.as_str(), r#"[["1","-2"],{"-1":"y","10":"x"}]"#);

        let json = s.into_bytes().unwrap();
        let mut u = UnmarshalState::new(&json, DEFAULT_UNMARSHALER_CONFIG);
        let mut values2: Vec<i64> = Vec::new();
        let mut map2: BTreeMap<i32, String> = BTreeMap::new();
        assert!(u.enter_array());
        assert!(u.next_element());
        read_repeated::<Int64, _, _>("values", &mut values2, &mut u);
        assert!(u.next_element());
        read_map::<Sint32, Str, _>("map", &mut map2, &mut u);
        assert!(!u.next_element());
        u.finish().unwrap();
        assert_eq!(values2, values);
        assert_eq!(map2, map);
        assert_eq!(u.field_mask().paths(), ["values", "map"]);
    }

    #[test]
    fn null_clears() {
        let mut u = UnmarshalState::new(b"[null,null,null]", DEFAULT_UNMARSHALER_CONFIG);
        let mut single = 5i64;
        let mut optional = Some(5i64);
        let mut repeated = vec![1i64];
        assert!(u.enter_array());
        assert!(u.next_element());
        read_single::<Int64, _>("a", &mut single, &mut u);
        assert!(u.next_element());
        read_optional::<Int64, _>("b", &mut optional, &mut u);
        assert!(u.next_element());
        read_repeated::<Int64, _, _>("c", &mut repeated, &mut u);
        assert!(!u.next_element());
        u.finish().unwrap();
        assert_eq!((single, optional, repeated.len()), (0, None, 0));
        assert_eq!(u.field_mask().paths(), ["a", "b", "c"]);
    }

    #[test]
    fn bad_map_key() {
        let mut u = UnmarshalState::new(br#"{"x":"y"}"#, DEFAULT_UNMARSHALER_CONFIG);
        let mut map: BTreeMap<i32, String> = BTreeMap::new();
        read_map::<Sint32, Str, _>("m", &mut map, &mut u);
        let err = u.err().unwrap();
        assert!(matches!(err.kind, JsonErrorKind::InvalidValue { ty: "map key", .. }));
    }
}
