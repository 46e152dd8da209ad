//! Wrapper messages, written in JSON as their bare value.

use crate::json::{MarshalProtoJson, MarshalState, UnmarshalProtoJson, UnmarshalState};
use crate::{Message, ProtoJson};

macro_rules! wrapper {
    ($(#[$doc:meta])* $name:ident, $full_name:tt, $ty:ty, $kind:ident,
     |$s:ident, $v:ident| $write:expr, |$r:ident| $read:expr) => {
        $(#[$doc])*
        #[derive(Clone, Debug, Default, PartialEq, Message)]
        #[protolite(name = $full_name)]
        pub struct $name {
            /// The wrapped value.
            #[protolite(tag = 1, $kind)]
            pub value: $ty,
        }

        impl From<$ty> for $name {
            fn from(value: $ty) -> Self {
                Self { value }
            }
        }

        impl MarshalProtoJson for $name {
            fn marshal_protojson(&self, $s: &mut MarshalState) {
                let $v = &self.value;
                $write
            }
        }

        impl UnmarshalProtoJson for $name {
            fn unmarshal_protojson(&mut self, s: &mut UnmarshalState<'_>) {
                self.value = s.read_wrapped(|$r| $read);
            }
        }
    };
}

wrapper!(
    /// `google.protobuf.DoubleValue`
    DoubleValue, "google.protobuf.DoubleValue", f64, double,
    |s, v| s.write_float64(*v), |s| s.read_float64()
);
wrapper!(
    /// `google.protobuf.FloatValue`
    FloatValue, "google.protobuf.FloatValue", f32, float,
    |s, v| s.write_float32(*v), |s| s.read_float32()
);
wrapper!(
    /// `google.protobuf.Int64Value`
    Int64Value, "google.protobuf.Int64Value", i64, int64,
    |s, v| s.write_int64(*v), |s| s.read_int64()
);
wrapper!(
    /// `google.protobuf.UInt64Value`
    UInt64Value, "google.protobuf.UInt64Value", u64, uint64,
    |s, v| s.write_uint64(*v), |s| s.read_uint64()
);
wrapper!(
    /// `google.protobuf.Int32Value`
    Int32Value, "google.protobuf.Int32Value", i32, int32,
    |s, v| s.write_int32(*v), |s| s.read_int32()
);
wrapper!(
    /// `google.protobuf.UInt32Value`
    UInt32Value, "google.protobuf.UInt32Value", u32, uint32,
    |s, v| s.write_uint32(*v), |s| s.read_uint32()
);
wrapper!(
    /// `google.protobuf.BoolValue`
    BoolValue, "google.protobuf.BoolValue", bool, bool,
    |s, v| s.write_bool(*v), |s| s.read_bool()
);
wrapper!(
    /// `google.protobuf.StringValue`
    StringValue, "google.protobuf.StringValue", String, string,
    |s, v| s.write_string(v), |s| s.read_string()
);
wrapper!(
    /// `google.protobuf.BytesValue`
    BytesValue, "google.protobuf.BytesValue", Vec<u8>, bytes,
    |s, v| s.write_bytes(v), |s| s.read_bytes()
);

/// `google.protobuf.Empty`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Message, ProtoJson)]
#[protolite(name = "google.protobuf.Empty")]
pub struct Empty {}
