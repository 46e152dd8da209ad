#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};

use protolite::wkt::{Any, Duration, Empty, FieldMask, Int64Value, Struct, Timestamp, Value};
use protolite::{Enumeration, Message, Oneof, ProtoJson};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Enumeration)]
#[repr(i32)]
pub enum RegularEnum {
    #[protolite(name = "REGULAR_UNKNOWN")]
    Unknown = 0,
    #[protolite(name = "REGULAR_A", alias = "A")]
    A = 1,
    #[protolite(name = "REGULAR_B")]
    B = 2,
}

#[derive(Clone, Debug, Default, PartialEq, Message, ProtoJson)]
#[protolite(name = "test.MessageWithScalars")]
pub struct MessageWithScalars {
    #[protolite(tag = 1, double)]
    pub double_value: f64,
    #[protolite(tag = 2, double, repeated)]
    pub double_values: Vec<f64>,
    #[protolite(tag = 3, float)]
    pub float_value: f32,
    #[protolite(tag = 4, int32)]
    pub int32_value: i32,
    #[protolite(tag = 5, int64)]
    pub int64_value: i64,
    #[protolite(tag = 6, uint32)]
    pub uint32_value: u32,
    #[protolite(tag = 7, uint64)]
    pub uint64_value: u64,
    #[protolite(tag = 8, sint32)]
    pub sint32_value: i32,
    #[protolite(tag = 9, sint64)]
    pub sint64_value: i64,
    #[protolite(tag = 10, fixed32)]
    pub fixed32_value: u32,
    #[protolite(tag = 11, fixed64)]
    pub fixed64_value: u64,
    #[protolite(tag = 12, sfixed32)]
    pub sfixed32_value: i32,
    #[protolite(tag = 13, sfixed64)]
    pub sfixed64_value: i64,
    #[protolite(tag = 14, bool)]
    pub bool_value: bool,
    #[protolite(tag = 15, string)]
    pub string_value: String,
    #[protolite(tag = 16, bytes)]
    pub bytes_value: Vec<u8>,
    #[protolite(tag = 17, bytes, repeated)]
    pub bytes_values: Vec<Vec<u8>>,
    #[protolite(unknown)]
    pub unknown_fields: Vec<u8>,
}

/// Only the `int32_value` field of [`MessageWithScalars`].
#[derive(Clone, Debug, Default, PartialEq, Message, ProtoJson)]
pub struct PartialScalars {
    #[protolite(tag = 4, int32)]
    pub int32_value: i32,
    #[protolite(unknown)]
    pub unknown_fields: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Message, ProtoJson)]
pub struct MessageWithEnums {
    #[protolite(tag = 1, enumeration = "RegularEnum")]
    pub regular: i32,
    #[protolite(tag = 2, enumeration = "RegularEnum", repeated)]
    pub regulars: Vec<i32>,
    #[protolite(tag = 3, enumeration = "RegularEnum", optional)]
    pub optional_regular: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, Message, ProtoJson)]
pub struct MessageWithSubMessages {
    #[protolite(tag = 1, message, optional)]
    pub a: Option<MessageWithScalars>,
    #[protolite(tag = 2, message, repeated)]
    pub b: Vec<MessageWithScalars>,
    #[protolite(tag = 3, message)]
    pub c: MessageWithEnums,
    #[protolite(tag = 4, message, optional)]
    pub recursive: Option<Box<MessageWithSubMessages>>,
}

#[derive(Clone, Debug, Default, PartialEq, Message, ProtoJson)]
pub struct MessageWithMaps {
    #[protolite(tag = 1, map = "string, int64")]
    pub string_int: BTreeMap<String, i64>,
    #[protolite(tag = 2, map = "sint32, string")]
    pub int_string: HashMap<i32, String>,
    #[protolite(tag = 3, map = "bool, message")]
    pub bool_message: BTreeMap<bool, MessageWithScalars>,
    #[protolite(tag = 4, map = "string, enumeration(RegularEnum)")]
    pub string_enum: BTreeMap<String, i32>,
    #[protolite(tag = 5, map = "uint64, bytes")]
    pub uint_bytes: BTreeMap<u64, Vec<u8>>,
}

#[derive(Clone, Debug, Default, PartialEq, Message, ProtoJson)]
pub struct MessageWithOneofs {
    #[protolite(oneof, tags = "1, 2, 3")]
    pub value: Option<message_with_oneofs::Value>,
    #[protolite(tag = 4, string)]
    pub name: String,
}

pub mod message_with_oneofs {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Oneof, ProtoJson)]
    pub enum Value {
        #[protolite(tag = 1, string)]
        StringValue(String),
        #[protolite(tag = 2, int64)]
        Int64Value(i64),
        #[protolite(tag = 3, message)]
        Sub(Box<MessageWithScalars>),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Message, ProtoJson)]
pub struct MessageWithPacked {
    #[protolite(tag = 1, int32, repeated)]
    pub packed: Vec<i32>,
    #[protolite(tag = 2, int32, repeated, packed = false)]
    pub unpacked: Vec<i32>,
    #[protolite(tag = 3, uint32, repeated)]
    pub bounded: heapless::Vec<u32, 2>,
}

#[derive(Clone, Debug, Default, PartialEq, Message, ProtoJson)]
pub struct MessageWithJsonNames {
    #[protolite(tag = 1, string, json_name = "customName")]
    pub renamed: String,
    #[protolite(tag = 2, int32, name = "proto_name")]
    pub other: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Message, ProtoJson)]
pub struct MessageWithWellKnownTypes {
    #[protolite(tag = 1, message, optional)]
    pub any: Option<Any>,
    #[protolite(tag = 2, message, optional)]
    pub duration: Option<Duration>,
    #[protolite(tag = 3, message, optional)]
    pub timestamp: Option<Timestamp>,
    #[protolite(tag = 4, message, optional)]
    pub field_mask: Option<FieldMask>,
    #[protolite(tag = 5, message, optional)]
    pub value: Option<Value>,
    #[protolite(tag = 6, message, repeated)]
    pub values: Vec<Value>,
    #[protolite(tag = 7, message, optional)]
    pub r#struct: Option<Struct>,
    #[protolite(tag = 8, message, optional)]
    pub int64_value: Option<Int64Value>,
    #[protolite(tag = 9, message, optional)]
    pub empty: Option<Empty>,
}

/// A message with every scalar set to something other than its default.
pub fn populated_scalars() -> MessageWithScalars {
    MessageWithScalars {
        double_value: 1.5,
        double_values: vec![1.0, -0.5],
        float_value: 2.25,
        int32_value: -42,
        int64_value: -42,
        uint32_value: 42,
        uint64_value: u64::MAX,
        sint32_value: -1,
        sint64_value: i64::MIN,
        fixed32_value: 7,
        fixed64_value: 8,
        sfixed32_value: -9,
        sfixed64_value: -10,
        bool_value: true,
        string_value: "a\"b\n".to_owned(),
        bytes_value: b"foob".to_vec(),
        bytes_values: vec![Vec::new(), vec![0]],
        unknown_fields: Vec::new(),
    }
}

/// Compare JSON output structurally.
#[track_caller]
pub fn assert_json_eq(actual: &[u8], expected: &str) {
    let actual: serde_json::Value = serde_json::from_slice(actual).expect("output is not JSON");
    let expected: serde_json::Value = serde_json::from_str(expected).expect("expectation is not JSON");
    assert_eq!(actual, expected);
}
