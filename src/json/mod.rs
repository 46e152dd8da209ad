//! Protobuf-JSON encoding.
//!
//! `#[derive(ProtoJson)]` implements [`MarshalProtoJson`] and
//! [`UnmarshalProtoJson`] on top of the streaming [`MarshalState`] and
//! [`UnmarshalState`]. Both states latch the first error together with the
//! field path it occurred at; every later operation is a no-op, and the error
//! is reported once by [`MarshalState::into_bytes`] or
//! [`UnmarshalState::finish`].

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::wkt::TypeRegistry;
use crate::{DecodeError, EncodeError};

pub mod codec;
mod datetime;
pub mod field;
mod marshal;
mod path;
mod unmarshal;

pub use datetime::{format_duration, format_timestamp, parse_duration, parse_timestamp};
pub use marshal::{get_enum_string, MarshalState};
pub use path::{FieldPath, PathSet};
pub use unmarshal::{UnmarshalState, ValueKind};

/// Options of the JSON encoder.
#[derive(Clone, Debug)]
pub struct MarshalerConfig {
    /// Write enum values as numbers instead of names.
    pub enums_as_ints: bool,
    /// Write the `json_name` of fields instead of their proto name.
    pub use_json_names: bool,
    /// Write `google.protobuf.FieldMask` as `{"paths":[...]}`.
    pub legacy_field_mask: bool,
    /// Message types that may appear inside `google.protobuf.Any`.
    pub registry: Option<Arc<TypeRegistry>>,
}

/// Encoder options used by [`marshal`].
pub const DEFAULT_MARSHALER_CONFIG: MarshalerConfig = MarshalerConfig {
    enums_as_ints: false,
    use_json_names: false,
    legacy_field_mask: false,
    registry: None,
};

impl Default for MarshalerConfig {
    fn default() -> Self {
        DEFAULT_MARSHALER_CONFIG
    }
}

impl MarshalerConfig {
    /// Encode `msg`.
    pub fn marshal<M: MarshalProtoJson + ?Sized>(&self, msg: &M) -> Result<Vec<u8>, JsonError> {
        self.marshal_with_field_mask(msg, PathSet::new())
    }

    /// Encode `msg`, also writing every field named by `mask` even when it
    /// holds its default value.
    pub fn marshal_with_field_mask<M: MarshalProtoJson + ?Sized>(
        &self,
        msg: &M,
        mask: PathSet,
    ) -> Result<Vec<u8>, JsonError> {
        let mut s = MarshalState::new(self.clone()).with_field_mask(mask);
        msg.marshal_protojson(&mut s);
        s.into_bytes()
    }
}

/// Options of the JSON decoder.
#[derive(Clone, Debug)]
pub struct UnmarshalerConfig {
    /// Message types that may appear inside `google.protobuf.Any`.
    pub registry: Option<Arc<TypeRegistry>>,
}

/// Decoder options used by [`unmarshal`].
pub const DEFAULT_UNMARSHALER_CONFIG: UnmarshalerConfig = UnmarshalerConfig { registry: None };

impl Default for UnmarshalerConfig {
    fn default() -> Self {
        DEFAULT_UNMARSHALER_CONFIG
    }
}

impl UnmarshalerConfig {
    /// Merge the JSON object in `data` into `msg`.
    pub fn unmarshal<M: UnmarshalProtoJson + ?Sized>(&self, data: &[u8], msg: &mut M) -> Result<(), JsonError> {
        self.unmarshal_with_field_mask(data, msg).map(drop)
    }

    /// Merge the JSON object in `data` into `msg`, returning the paths of
    /// every field that was present.
    pub fn unmarshal_with_field_mask<M: UnmarshalProtoJson + ?Sized>(
        &self,
        data: &[u8],
        msg: &mut M,
    ) -> Result<PathSet, JsonError> {
        let mut s = UnmarshalState::new(data, self.clone());
        msg.unmarshal_protojson(&mut s);
        s.finish()?;
        Ok(s.into_field_mask())
    }
}

/// Encode `msg` with [`DEFAULT_MARSHALER_CONFIG`].
pub fn marshal<M: MarshalProtoJson + ?Sized>(msg: &M) -> Result<Vec<u8>, JsonError> {
    DEFAULT_MARSHALER_CONFIG.marshal(msg)
}

/// Encode `msg` with [`DEFAULT_MARSHALER_CONFIG`], forcing the fields in `mask`.
pub fn marshal_with_field_mask<M: MarshalProtoJson + ?Sized>(msg: &M, mask: PathSet) -> Result<Vec<u8>, JsonError> {
    DEFAULT_MARSHALER_CONFIG.marshal_with_field_mask(msg, mask)
}

/// Decode `data` into `msg` with [`DEFAULT_UNMARSHALER_CONFIG`].
pub fn unmarshal<M: UnmarshalProtoJson + ?Sized>(data: &[u8], msg: &mut M) -> Result<(), JsonError> {
    DEFAULT_UNMARSHALER_CONFIG.unmarshal(data, msg)
}

/// Decode `data` into `msg` with [`DEFAULT_UNMARSHALER_CONFIG`], returning the
/// fields that were present.
pub fn unmarshal_with_field_mask<M: UnmarshalProtoJson + ?Sized>(
    data: &[u8],
    msg: &mut M,
) -> Result<PathSet, JsonError> {
    DEFAULT_UNMARSHALER_CONFIG.unmarshal_with_field_mask(data, msg)
}

/// Types that write themselves as protobuf JSON.
pub trait MarshalProtoJson {
    /// Write `self` as one JSON value.
    fn marshal_protojson(&self, s: &mut MarshalState);
}

/// Types that read themselves from protobuf JSON.
pub trait UnmarshalProtoJson {
    /// Whether a JSON `null` is a value of this type rather than the absence
    /// of one. Only `google.protobuf.Value` sets this.
    const NULL_IS_VALUE: bool = false;

    /// Merge one JSON value into `self`.
    fn unmarshal_protojson(&mut self, s: &mut UnmarshalState<'_>);
}

/// Oneof enums: each alternative is a field of the enclosing object.
pub trait OneofProtoJson: Sized {
    /// Write the set alternative as `"name":value`, preceded by a comma if
    /// `wrote_field` is set.
    fn marshal_protojson_fields(&self, s: &mut MarshalState, wrote_field: &mut bool);

    /// Read the value of `key` into `this` if `key` names an alternative.
    /// Returns `false`, consuming nothing, otherwise.
    fn unmarshal_protojson_field(this: &mut Option<Self>, key: &str, s: &mut UnmarshalState<'_>) -> bool;
}

impl<M: MarshalProtoJson + ?Sized> MarshalProtoJson for Box<M> {
    fn marshal_protojson(&self, s: &mut MarshalState) {
        (**self).marshal_protojson(s)
    }
}

impl<M: UnmarshalProtoJson + ?Sized> UnmarshalProtoJson for Box<M> {
    const NULL_IS_VALUE: bool = M::NULL_IS_VALUE;

    fn unmarshal_protojson(&mut self, s: &mut UnmarshalState<'_>) {
        (**self).unmarshal_protojson(s)
    }
}

/// Direction of a failed JSON operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Encoding.
    Marshal,
    /// Decoding.
    Unmarshal,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Marshal => "marshal",
            Operation::Unmarshal => "unmarshal",
        })
    }
}

/// First error of a JSON operation and the field it occurred at.
#[derive(Clone, Debug, PartialEq, Error)]
#[error("{op} error at path {path:?}: {kind}")]
pub struct JsonError {
    /// Encoding or decoding.
    pub op: Operation,
    /// Dotted path of the field being processed.
    pub path: String,
    /// What went wrong.
    pub kind: JsonErrorKind,
}

/// Cause of a [`JsonError`].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum JsonErrorKind {
    /// The JSON token has the wrong type, e.g. an array for a string field.
    #[error("invalid value type for {0}")]
    InvalidValueType(&'static str),
    /// The token has the right type but can not be converted.
    #[error("invalid value for {ty}: {cause}")]
    InvalidValue {
        /// Expected type.
        ty: &'static str,
        /// Conversion failure.
        cause: String,
    },
    /// An enum name that no value map knows.
    #[error("unknown value for enum: {0:?}")]
    UnknownEnumValue(String),
    /// Malformed JSON.
    #[error("syntax error at offset {offset}: {message}")]
    Syntax {
        /// Byte offset into the input.
        offset: usize,
        /// What was expected.
        message: &'static str,
    },
    /// The cursor was advanced past a key or element whose value was not read.
    #[error("value of the previous key or element was not consumed")]
    UnconsumedValue,
    /// Input continues after the top-level value.
    #[error("unexpected data after top-level value")]
    TrailingData,
    /// An `Any` object without `@type`.
    #[error("missing \"@type\" field in Any")]
    MissingAnyType,
    /// `@type` is not the first field of an `Any` object.
    #[error("\"@type\" must be the first field of Any")]
    MisplacedAnyType,
    /// No registered message type has this URL.
    #[error("unable to resolve type URL {0:?}")]
    UnresolvableTypeUrl(String),
    /// The payload was resolved to a different type than expected.
    #[error("type URL {actual:?} does not match {expected:?}")]
    AnyTypeMismatch {
        /// Type the reader expected.
        expected: String,
        /// Type named by the payload.
        actual: String,
    },
    /// A binary `Any` payload failed to decode.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// A binary `Any` payload failed to encode.
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// Any other failure.
    #[error("{0}")]
    Custom(String),
}
