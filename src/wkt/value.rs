//! `google.protobuf.Struct`, `Value` and `ListValue`: arbitrary JSON.

use std::collections::BTreeMap;

use crate::json::{JsonErrorKind, MarshalProtoJson, MarshalState, UnmarshalProtoJson, UnmarshalState, ValueKind};
use crate::{Enumeration, Message, Oneof};

/// `google.protobuf.NullValue`: the JSON `null`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Enumeration)]
#[repr(i32)]
pub enum NullValue {
    /// `null`
    #[default]
    NullValue = 0,
}

/// `google.protobuf.Struct`: a JSON object.
#[derive(Clone, Debug, Default, PartialEq, Message)]
#[protolite(name = "google.protobuf.Struct")]
pub struct Struct {
    /// Members by key.
    #[protolite(tag = 1, map = "string, message")]
    pub fields: BTreeMap<String, Value>,
}

/// `google.protobuf.Value`: any JSON value.
#[derive(Clone, Debug, Default, PartialEq, Message)]
#[protolite(name = "google.protobuf.Value")]
pub struct Value {
    /// The value; unset reads as `null`.
    #[protolite(oneof, tags = "1, 2, 3, 4, 5, 6")]
    pub kind: Option<Kind>,
}

/// Alternatives of [`Value`].
#[derive(Clone, Debug, PartialEq, Oneof)]
pub enum Kind {
    /// `null`, holding a [`NullValue`] number.
    #[protolite(tag = 1, enumeration = "NullValue")]
    NullValue(i32),
    /// A finite number.
    #[protolite(tag = 2, double)]
    NumberValue(f64),
    /// A string.
    #[protolite(tag = 3, string)]
    StringValue(String),
    /// `true` or `false`.
    #[protolite(tag = 4, bool)]
    BoolValue(bool),
    /// An object.
    #[protolite(tag = 5, message)]
    StructValue(Struct),
    /// An array.
    #[protolite(tag = 6, message)]
    ListValue(ListValue),
}

/// `google.protobuf.ListValue`: a JSON array.
#[derive(Clone, Debug, Default, PartialEq, Message)]
#[protolite(name = "google.protobuf.ListValue")]
pub struct ListValue {
    /// Elements.
    #[protolite(tag = 1, message, repeated)]
    pub values: Vec<Value>,
}

impl Value {
    /// The `null` value.
    pub fn null() -> Self {
        Self {
            kind: Some(Kind::NullValue(NullValue::NullValue.as_i32())),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self {
            kind: Some(Kind::NumberValue(v)),
        }
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self {
            kind: Some(Kind::StringValue(v)),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::from(v.to_owned())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self {
            kind: Some(Kind::BoolValue(v)),
        }
    }
}

impl From<Struct> for Value {
    fn from(v: Struct) -> Self {
        Self {
            kind: Some(Kind::StructValue(v)),
        }
    }
}

impl From<ListValue> for Value {
    fn from(v: ListValue) -> Self {
        Self {
            kind: Some(Kind::ListValue(v)),
        }
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Self::from(ListValue { values })
    }
}

impl FromIterator<(String, Value)> for Struct {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl MarshalProtoJson for Struct {
    fn marshal_protojson(&self, s: &mut MarshalState) {
        s.write_object_start();
        let mut wrote = false;
        for (key, value) in &self.fields {
            s.write_more_if(&mut wrote);
            s.write_object_field(key);
            s.with_field(key, |s| value.marshal_protojson(s));
        }
        s.write_object_end();
    }
}

impl UnmarshalProtoJson for Struct {
    fn unmarshal_protojson(&mut self, s: &mut UnmarshalState<'_>) {
        if !s.enter_object() {
            return;
        }
        while let Some(key) = s.next_key() {
            let mut value = Value::default();
            s.with_field(&key, false, |s| value.unmarshal_protojson(s));
            self.fields.insert(key, value);
        }
    }
}

impl MarshalProtoJson for Value {
    fn marshal_protojson(&self, s: &mut MarshalState) {
        match &self.kind {
            None | Some(Kind::NullValue(_)) => s.write_nil(),
            Some(Kind::NumberValue(v)) if !v.is_finite() => s.set_error(JsonErrorKind::InvalidValue {
                ty: "google.protobuf.Value",
                cause: format!("{} is not a valid JSON number", v),
            }),
            Some(Kind::NumberValue(v)) => s.write_float64(*v),
            Some(Kind::StringValue(v)) => s.write_string(v),
            Some(Kind::BoolValue(v)) => s.write_bool(*v),
            Some(Kind::StructValue(v)) => v.marshal_protojson(s),
            Some(Kind::ListValue(v)) => v.marshal_protojson(s),
        }
    }
}

impl UnmarshalProtoJson for Value {
    const NULL_IS_VALUE: bool = true;

    fn unmarshal_protojson(&mut self, s: &mut UnmarshalState<'_>) {
        let Some(kind) = s.peek_kind() else {
            // Latches a syntax error unless one is latched already.
            return s.skip_value();
        };
        self.kind = Some(match kind {
            ValueKind::Null => {
                s.read_nil();
                Kind::NullValue(NullValue::NullValue.as_i32())
            }
            ValueKind::Bool => Kind::BoolValue(s.read_bool()),
            ValueKind::Number => Kind::NumberValue(s.read_float64()),
            ValueKind::String => Kind::StringValue(s.read_string()),
            ValueKind::Object => {
                let mut v = Struct::default();
                v.unmarshal_protojson(s);
                Kind::StructValue(v)
            }
            ValueKind::Array => {
                let mut v = ListValue::default();
                v.unmarshal_protojson(s);
                Kind::ListValue(v)
            }
        });
    }
}

impl MarshalProtoJson for ListValue {
    fn marshal_protojson(&self, s: &mut MarshalState) {
        s.write_array_start();
        let mut wrote = false;
        for value in &self.values {
            s.write_more_if(&mut wrote);
            value.marshal_protojson(s);
        }
        s.write_array_end();
    }
}

impl UnmarshalProtoJson for ListValue {
    fn unmarshal_protojson(&mut self, s: &mut UnmarshalState<'_>) {
        let values = &mut self.values;
        s.read_array(|s| {
            let mut value = Value::default();
            value.unmarshal_protojson(s);
            values.push(value);
        });
    }
}
