use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

use crate::{ByteReader, ByteWriter, DecodeError, EncodeError, Message, WireType};

/// Storage of a repeated field.
pub trait RepeatedField {
    /// Element type.
    type Item;

    /// The elements in field order.
    fn items(&self) -> &[Self::Item];
    /// Append an element.
    fn push_item(&mut self, item: Self::Item) -> Result<(), DecodeError>;
    /// Remove every element.
    fn clear_items(&mut self);

    /// Whether the field has no elements.
    fn is_empty(&self) -> bool {
        self.items().is_empty()
    }
}

impl<T> RepeatedField for Vec<T> {
    type Item = T;

    fn items(&self) -> &[T] {
        self
    }

    fn push_item(&mut self, item: T) -> Result<(), DecodeError> {
        self.push(item);
        Ok(())
    }

    fn clear_items(&mut self) {
        self.clear()
    }
}

impl<T, const N: usize> RepeatedField for heapless::Vec<T, N> {
    type Item = T;

    fn items(&self) -> &[T] {
        self
    }

    fn push_item(&mut self, item: T) -> Result<(), DecodeError> {
        self.push(item).map_err(|_| DecodeError::CapacityExceeded)
    }

    fn clear_items(&mut self) {
        self.clear()
    }
}

/// Storage of a map field.
///
/// Entries are always visited in ascending key order so that encodings are
/// deterministic regardless of the map implementation.
pub trait MapField {
    /// Key type.
    type Key: Ord;
    /// Value type.
    type Value;

    /// Number of entries.
    fn len(&self) -> usize;
    /// Entries sorted by key.
    fn sorted_entries(&self) -> Vec<(&Self::Key, &Self::Value)>;
    /// Look up a key.
    fn get_value(&self, key: &Self::Key) -> Option<&Self::Value>;
    /// Insert or replace an entry.
    fn insert_entry(&mut self, key: Self::Key, value: Self::Value);
    /// Remove every entry.
    fn clear_entries(&mut self);

    /// Whether the map has no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Ord, V> MapField for BTreeMap<K, V> {
    type Key = K;
    type Value = V;

    fn len(&self) -> usize {
        BTreeMap::len(self)
    }

    fn sorted_entries(&self) -> Vec<(&K, &V)> {
        self.iter().collect()
    }

    fn get_value(&self, key: &K) -> Option<&V> {
        self.get(key)
    }

    fn insert_entry(&mut self, key: K, value: V) {
        self.insert(key, value);
    }

    fn clear_entries(&mut self) {
        self.clear()
    }
}

impl<K: Ord + Hash, V, S: BuildHasher> MapField for HashMap<K, V, S> {
    type Key = K;
    type Value = V;

    fn len(&self) -> usize {
        HashMap::len(self)
    }

    fn sorted_entries(&self) -> Vec<(&K, &V)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }

    fn get_value(&self, key: &K) -> Option<&V> {
        self.get(key)
    }

    fn insert_entry(&mut self, key: K, value: V) {
        self.insert(key, value);
    }

    fn clear_entries(&mut self) {
        self.clear()
    }
}

impl<M: Message> Message for Box<M> {
    fn size_vt(&self) -> usize {
        (**self).size_vt()
    }

    fn marshal_to_sized_buffer_vt(&self, w: &mut ByteWriter) -> Result<(), EncodeError> {
        (**self).marshal_to_sized_buffer_vt(w)
    }

    fn merge_field(&mut self, tag: u32, wire_type: WireType, r: &mut ByteReader) -> Result<bool, DecodeError> {
        (**self).merge_field(tag, wire_type, r)
    }

    fn unknown_fields_mut(&mut self) -> Option<&mut Vec<u8>> {
        (**self).unknown_fields_mut()
    }

    fn equal_vt(&self, other: &Self) -> bool {
        (**self).equal_vt(other)
    }
}
