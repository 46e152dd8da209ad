//! Well-known types of `google/protobuf/*.proto`.
//!
//! The binary codecs are derived like any other message. The JSON mappings
//! are written by hand since protobuf JSON gives each of these types a
//! special form.

use std::collections::HashMap;
use std::fmt;

use crate::json::{JsonErrorKind, MarshalProtoJson, MarshalState, UnmarshalProtoJson, UnmarshalState};
use crate::{Message, Name};

mod any;
mod duration;
mod field_mask;
mod timestamp;
pub mod value;
mod wrappers;

pub use any::{Any, AnyError};
pub use duration::Duration;
pub use field_mask::FieldMask;
pub use timestamp::Timestamp;
pub use value::{ListValue, NullValue, Struct, Value};
pub use wrappers::{
    BoolValue, BytesValue, DoubleValue, Empty, FloatValue, Int32Value, Int64Value, StringValue, UInt32Value,
    UInt64Value,
};

/// Full name part of a type URL: everything after the last `/`.
pub fn type_name(type_url: &str) -> &str {
    match type_url.rsplit_once('/') {
        Some((_, name)) => name,
        None => type_url,
    }
}

/// JSON codec of the message packed in an `Any`, working on its binary
/// payload.
#[derive(Clone, Copy)]
pub struct AnyCodec {
    full_name: &'static str,
    marshal: fn(&[u8], &mut MarshalState),
    unmarshal: fn(&mut UnmarshalState<'_>) -> Vec<u8>,
}

impl AnyCodec {
    /// Codec of `M`.
    pub fn of<M>() -> Self
    where
        M: Message + Name + MarshalProtoJson + UnmarshalProtoJson,
    {
        Self {
            full_name: M::FULL_NAME,
            marshal: marshal_payload::<M>,
            unmarshal: unmarshal_payload::<M>,
        }
    }

    /// Full name of the message type.
    pub fn full_name(&self) -> &'static str {
        self.full_name
    }

    /// Decode `payload` and write it as JSON.
    pub fn marshal(&self, payload: &[u8], s: &mut MarshalState) {
        (self.marshal)(payload, s)
    }

    /// Read one JSON value and return its binary encoding.
    pub fn unmarshal(&self, s: &mut UnmarshalState<'_>) -> Vec<u8> {
        (self.unmarshal)(s)
    }
}

impl fmt::Debug for AnyCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AnyCodec").field(&self.full_name).finish()
    }
}

fn marshal_payload<M: Message + MarshalProtoJson>(payload: &[u8], s: &mut MarshalState) {
    match crate::read::<M>(payload) {
        Ok(msg) => msg.marshal_protojson(s),
        Err(err) => s.set_error(err.into()),
    }
}

fn unmarshal_payload<M: Message + UnmarshalProtoJson>(s: &mut UnmarshalState<'_>) -> Vec<u8> {
    let mut msg = M::default();
    msg.unmarshal_protojson(s);
    match msg.marshal_vt() {
        Ok(payload) => payload,
        Err(err) => {
            s.set_error(JsonErrorKind::Encode(err));
            Vec::new()
        }
    }
}

/// The well-known types. Inside `Any` each is written as
/// `{"@type":...,"value":...}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WellKnownType {
    /// `google.protobuf.Any`
    Any,
    /// `google.protobuf.Duration`
    Duration,
    /// `google.protobuf.Timestamp`
    Timestamp,
    /// `google.protobuf.Struct`
    Struct,
    /// `google.protobuf.Value`
    Value,
    /// `google.protobuf.ListValue`
    ListValue,
    /// `google.protobuf.FieldMask`
    FieldMask,
    /// `google.protobuf.Empty`
    Empty,
    /// `google.protobuf.DoubleValue`
    DoubleValue,
    /// `google.protobuf.FloatValue`
    FloatValue,
    /// `google.protobuf.Int64Value`
    Int64Value,
    /// `google.protobuf.UInt64Value`
    UInt64Value,
    /// `google.protobuf.Int32Value`
    Int32Value,
    /// `google.protobuf.UInt32Value`
    UInt32Value,
    /// `google.protobuf.BoolValue`
    BoolValue,
    /// `google.protobuf.StringValue`
    StringValue,
    /// `google.protobuf.BytesValue`
    BytesValue,
}

impl WellKnownType {
    const ALL: [WellKnownType; 17] = [
        WellKnownType::Any,
        WellKnownType::Duration,
        WellKnownType::Timestamp,
        WellKnownType::Struct,
        WellKnownType::Value,
        WellKnownType::ListValue,
        WellKnownType::FieldMask,
        WellKnownType::Empty,
        WellKnownType::DoubleValue,
        WellKnownType::FloatValue,
        WellKnownType::Int64Value,
        WellKnownType::UInt64Value,
        WellKnownType::Int32Value,
        WellKnownType::UInt32Value,
        WellKnownType::BoolValue,
        WellKnownType::StringValue,
        WellKnownType::BytesValue,
    ];

    /// The type with full name `name`, e.g. `google.protobuf.Duration`.
    pub fn from_full_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.full_name() == name)
    }

    /// The type a type URL names.
    pub fn from_type_url(type_url: &str) -> Option<Self> {
        Self::from_full_name(type_name(type_url))
    }

    /// Full protobuf name.
    pub fn full_name(self) -> &'static str {
        self.codec().full_name()
    }

    /// JSON codec of the type.
    pub fn codec(self) -> AnyCodec {
        match self {
            WellKnownType::Any => AnyCodec::of::<Any>(),
            WellKnownType::Duration => AnyCodec::of::<Duration>(),
            WellKnownType::Timestamp => AnyCodec::of::<Timestamp>(),
            WellKnownType::Struct => AnyCodec::of::<Struct>(),
            WellKnownType::Value => AnyCodec::of::<Value>(),
            WellKnownType::ListValue => AnyCodec::of::<ListValue>(),
            WellKnownType::FieldMask => AnyCodec::of::<FieldMask>(),
            WellKnownType::Empty => AnyCodec::of::<Empty>(),
            WellKnownType::DoubleValue => AnyCodec::of::<DoubleValue>(),
            WellKnownType::FloatValue => AnyCodec::of::<FloatValue>(),
            WellKnownType::Int64Value => AnyCodec::of::<Int64Value>(),
            WellKnownType::UInt64Value => AnyCodec::of::<UInt64Value>(),
            WellKnownType::Int32Value => AnyCodec::of::<Int32Value>(),
            WellKnownType::UInt32Value => AnyCodec::of::<UInt32Value>(),
            WellKnownType::BoolValue => AnyCodec::of::<BoolValue>(),
            WellKnownType::StringValue => AnyCodec::of::<StringValue>(),
            WellKnownType::BytesValue => AnyCodec::of::<BytesValue>(),
        }
    }
}

/// Message types that may appear inside `Any`, by full name.
///
/// Well-known types are always known and need not be registered.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<&'static str, AnyCodec>,
}

impl TypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `M`.
    pub fn register<M>(&mut self) -> &mut Self
    where
        M: Message + Name + MarshalProtoJson + UnmarshalProtoJson,
    {
        self.types.insert(M::FULL_NAME, AnyCodec::of::<M>());
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<M>(mut self) -> Self
    where
        M: Message + Name + MarshalProtoJson + UnmarshalProtoJson,
    {
        self.register::<M>();
        self
    }

    /// Codec of the registered type with full name `name`.
    pub fn get(&self, name: &str) -> Option<AnyCodec> {
        self.types.get(name).copied()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no type is registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.types.keys().collect();
        names.sort();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}

/// How an `Any` payload of some type URL is written.
enum Resolved {
    WellKnown(AnyCodec),
    Message(AnyCodec),
}

fn resolve(type_url: &str, registry: Option<&TypeRegistry>) -> Option<Resolved> {
    let name = type_name(type_url);
    if let Some(wkt) = WellKnownType::from_full_name(name) {
        return Some(Resolved::WellKnown(wkt.codec()));
    }
    registry.and_then(|r| r.get(name)).map(Resolved::Message)
}
