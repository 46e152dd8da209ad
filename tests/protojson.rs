mod common;

use std::collections::{BTreeMap, HashMap};

use common::*;
use protolite::json::{self, JsonErrorKind, MarshalerConfig, Operation, PathSet, DEFAULT_MARSHALER_CONFIG};

const SCALAR_FIELDS: [&str; 17] = [
    "double_value",
    "double_values",
    "float_value",
    "int32_value",
    "int64_value",
    "uint32_value",
    "uint64_value",
    "sint32_value",
    "sint64_value",
    "fixed32_value",
    "fixed64_value",
    "sfixed32_value",
    "sfixed64_value",
    "bool_value",
    "string_value",
    "bytes_value",
    "bytes_values",
];

const ZERO_SCALARS: &str = r#"{"double_value":0,"double_values":[],"float_value":0,"int32_value":0,"int64_value":"0","uint32_value":0,"uint64_value":"0","sint32_value":0,"sint64_value":"0","fixed32_value":0,"fixed64_value":"0","sfixed32_value":0,"sfixed64_value":"0","bool_value":false,"string_value":"","bytes_value":null,"bytes_values":[]}"#;

fn as_str(json: &[u8]) -> &str {
    std::str::from_utf8(json).unwrap()
}

#[test]
fn empty_message_is_empty_object() {
    assert_eq!(json::marshal(&MessageWithScalars::default()).unwrap(), b"{}");
    assert_eq!(json::marshal(&MessageWithSubMessages::default()).unwrap(), br#"{"c":{}}"#);
}

#[test]
fn zero_scalars_with_full_mask() {
    let mask: PathSet = SCALAR_FIELDS.into_iter().collect();
    let out = json::marshal_with_field_mask(&MessageWithScalars::default(), mask.clone()).unwrap();
    assert_eq!(as_str(&out), ZERO_SCALARS);

    let mut msg = MessageWithScalars::default();
    let read_mask = json::unmarshal_with_field_mask(ZERO_SCALARS.as_bytes(), &mut msg).unwrap();
    assert_eq!(msg, MessageWithScalars::default());
    assert_eq!(read_mask, mask);
}

#[test]
fn zero_scalar_with_partial_mask() {
    let mask: PathSet = ["double_value"].into_iter().collect();
    let out = json::marshal_with_field_mask(&MessageWithScalars::default(), mask).unwrap();
    assert_eq!(as_str(&out), r#"{"double_value":0}"#);
}

#[test]
fn populated_scalars() {
    let msg = common::populated_scalars();
    let out = json::marshal(&msg).unwrap();
    assert_json_eq(
        &out,
        r#"{
            "double_value": 1.5,
            "double_values": [1, -0.5],
            "float_value": 2.25,
            "int32_value": -42,
            "int64_value": "-42",
            "uint32_value": 42,
            "uint64_value": "18446744073709551615",
            "sint32_value": -1,
            "sint64_value": "-9223372036854775808",
            "fixed32_value": 7,
            "fixed64_value": "8",
            "sfixed32_value": -9,
            "sfixed64_value": "-10",
            "bool_value": true,
            "string_value": "a\"b\n",
            "bytes_value": "Zm9vYg==",
            "bytes_values": ["", "AA=="]
        }"#,
    );

    let mut back = MessageWithScalars::default();
    let mask = json::unmarshal_with_field_mask(&out, &mut back).unwrap();
    assert_eq!(back, msg);
    assert_eq!(mask.paths(), SCALAR_FIELDS);
}

#[test]
fn lenient_scalar_input() {
    let mut msg = MessageWithScalars::default();
    json::unmarshal(
        br#"{
            "doubleValue": "NaN",
            "floatValue": "-Infinity",
            "int32Value": "12",
            "uint64Value": 18446744073709551615,
            "boolValue": "true",
            "bytesValue": "-_8"
        }"#,
        &mut msg,
    )
    .unwrap();
    assert!(msg.double_value.is_nan());
    assert_eq!(msg.float_value, f32::NEG_INFINITY);
    assert_eq!(msg.int32_value, 12);
    assert_eq!(msg.uint64_value, u64::MAX);
    assert!(msg.bool_value);
    assert_eq!(msg.bytes_value, [0xfb, 0xff]);
}

#[test]
fn special_floats_are_strings() {
    let msg = MessageWithScalars {
        double_value: f64::INFINITY,
        double_values: vec![f64::NAN, f64::NEG_INFINITY],
        ..Default::default()
    };
    assert_eq!(
        as_str(&json::marshal(&msg).unwrap()),
        r#"{"double_value":"Infinity","double_values":["NaN","-Infinity"]}"#
    );
}

#[test]
fn json_names() {
    let config = MarshalerConfig {
        use_json_names: true,
        ..DEFAULT_MARSHALER_CONFIG
    };
    let msg = MessageWithScalars {
        int32_value: 1,
        bytes_values: vec![vec![1]],
        ..Default::default()
    };
    assert_eq!(
        as_str(&config.marshal(&msg).unwrap()),
        r#"{"int32Value":1,"bytesValues":["AQ=="]}"#
    );

    let msg = MessageWithJsonNames {
        renamed: "x".into(),
        other: 2,
    };
    assert_eq!(as_str(&json::marshal(&msg).unwrap()), r#"{"renamed":"x","proto_name":2}"#);
    assert_eq!(
        as_str(&config.marshal(&msg).unwrap()),
        r#"{"customName":"x","protoName":2}"#
    );

    for input in [r#"{"renamed":"x","proto_name":2}"#, r#"{"customName":"x","protoName":2}"#] {
        let mut back = MessageWithJsonNames::default();
        let mask = json::unmarshal_with_field_mask(input.as_bytes(), &mut back).unwrap();
        assert_eq!(back, msg);
        // The mask always holds proto names.
        assert_eq!(mask.paths(), ["renamed", "proto_name"]);
    }
}

#[test]
fn null_resets_fields() {
    let mut msg = common::populated_scalars();
    let mask = json::unmarshal_with_field_mask(
        br#"{"double_value":null,"double_values":null,"string_value":null,"bytes_value":null}"#,
        &mut msg,
    )
    .unwrap();
    assert_eq!(msg.double_value, 0.0);
    assert!(msg.double_values.is_empty());
    assert_eq!(msg.string_value, "");
    assert!(msg.bytes_value.is_empty());
    assert_eq!(msg.int32_value, -42);
    assert_eq!(mask.len(), 4);
}

#[test]
fn unknown_keys_are_skipped() {
    let mut msg = MessageWithScalars::default();
    let mask = json::unmarshal_with_field_mask(
        br#"{"nope":{"x":[1,2,{"y":null}]},"int32_value":3,"also_nope":"z"}"#,
        &mut msg,
    )
    .unwrap();
    assert_eq!(msg.int32_value, 3);
    assert_eq!(mask.paths(), ["int32_value"]);
}

#[test]
fn enums() {
    let msg = MessageWithEnums {
        regular: RegularEnum::A as i32,
        regulars: vec![RegularEnum::B as i32, 7],
        optional_regular: Some(RegularEnum::Unknown as i32),
    };
    assert_eq!(
        as_str(&json::marshal(&msg).unwrap()),
        r#"{"regular":"REGULAR_A","regulars":["REGULAR_B",7],"optional_regular":"REGULAR_UNKNOWN"}"#
    );

    let config = MarshalerConfig {
        enums_as_ints: true,
        ..DEFAULT_MARSHALER_CONFIG
    };
    assert_eq!(
        as_str(&config.marshal(&msg).unwrap()),
        r#"{"regular":1,"regulars":[2,7],"optional_regular":0}"#
    );

    let mut back = MessageWithEnums::default();
    json::unmarshal(br#"{"regular":"A","regulars":[1,"REGULAR_B","2"],"optionalRegular":null}"#, &mut back).unwrap();
    assert_eq!(
        back,
        MessageWithEnums {
            regular: 1,
            regulars: vec![1, 2, 2],
            optional_regular: None,
        }
    );
}

#[test]
fn unknown_enum_name() {
    let mut msg = MessageWithSubMessages::default();
    let err = json::unmarshal(br#"{"c":{"regular":"NOPE"}}"#, &mut msg).unwrap_err();
    assert_eq!(err.op, Operation::Unmarshal);
    assert_eq!(err.path, "c");
    assert_eq!(err.kind, JsonErrorKind::UnknownEnumValue("NOPE".into()));
    assert_eq!(err.to_string(), r#"unmarshal error at path "c": unknown value for enum: "NOPE""#);
}

#[test]
fn sub_messages() {
    let msg = MessageWithSubMessages {
        a: Some(MessageWithScalars {
            int32_value: 1,
            ..Default::default()
        }),
        b: vec![
            MessageWithScalars::default(),
            MessageWithScalars {
                bool_value: true,
                ..Default::default()
            },
        ],
        c: MessageWithEnums::default(),
        recursive: Some(Box::new(MessageWithSubMessages::default())),
    };
    let out = json::marshal(&msg).unwrap();
    assert_eq!(
        as_str(&out),
        r#"{"a":{"int32_value":1},"b":[{},{"bool_value":true}],"c":{},"recursive":{"c":{}}}"#
    );

    let mut back = MessageWithSubMessages::default();
    let mask = json::unmarshal_with_field_mask(&out, &mut back).unwrap();
    assert_eq!(back, msg);
    assert_eq!(
        mask.paths(),
        ["a", "a.int32_value", "b", "b.bool_value", "c", "recursive", "recursive.c"]
    );
}

#[test]
fn nested_mask_forces_nested_fields() {
    let msg = MessageWithSubMessages {
        a: Some(MessageWithScalars::default()),
        ..Default::default()
    };
    let mask: PathSet = ["a.int32_value", "c.regular", "recursive"].into_iter().collect();
    assert_eq!(
        as_str(&json::marshal_with_field_mask(&msg, mask).unwrap()),
        r#"{"a":{"int32_value":0},"c":{"regular":"REGULAR_UNKNOWN"},"recursive":null}"#
    );
}

#[test]
fn null_clears_optional_message() {
    let mut msg = MessageWithSubMessages {
        a: Some(MessageWithScalars::default()),
        ..Default::default()
    };
    json::unmarshal(br#"{"a":null}"#, &mut msg).unwrap();
    assert_eq!(msg.a, None);
}

#[test]
fn error_path_points_at_enclosing_message() {
    let mut msg = MessageWithSubMessages::default();
    let err = json::unmarshal(br#"{"recursive":{"a":{"int32_value":"x"}}}"#, &mut msg).unwrap_err();
    assert_eq!(err.path, "recursive.a");
    assert!(matches!(err.kind, JsonErrorKind::InvalidValue { ty: "int32", .. }));

    let err = json::unmarshal(br#"{"b":[{},{"bool_value":[]}]}"#, &mut msg).unwrap_err();
    assert_eq!(err.path, "b");
    assert_eq!(err.kind, JsonErrorKind::InvalidValueType("bool"));
}

#[test]
fn syntax_errors() {
    let mut msg = MessageWithScalars::default();
    let inputs: [&[u8]; 5] = [b"{", b"{\"int32_value\":}", b"[]", b"{} {}", b"{\"int32_value\" 1}"];
    for input in inputs {
        assert!(json::unmarshal(input, &mut msg).is_err(), "{:?}", as_str(input));
    }
    let err = json::unmarshal(b"{}x", &mut msg).unwrap_err();
    assert_eq!(err.kind, JsonErrorKind::TrailingData);
}

#[test]
fn maps() {
    let msg = MessageWithMaps {
        string_int: BTreeMap::from([("b".into(), 2), ("a".into(), -1)]),
        int_string: HashMap::from([(10, "x".into()), (-1, "y".into())]),
        bool_message: BTreeMap::from([(
            true,
            MessageWithScalars {
                int32_value: 1,
                ..Default::default()
            },
        )]),
        string_enum: BTreeMap::from([("k".into(), 2)]),
        uint_bytes: BTreeMap::from([(u64::MAX, vec![1, 2])]),
    };
    let out = json::marshal(&msg).unwrap();
    assert_eq!(
        as_str(&out),
        concat!(
            r#"{"string_int":{"a":"-1","b":"2"},"int_string":{"-1":"y","10":"x"},"#,
            r#""bool_message":{"true":{"int32_value":1}},"string_enum":{"k":"REGULAR_B"},"#,
            r#""uint_bytes":{"18446744073709551615":"AQI="}}"#
        )
    );

    let mut back = MessageWithMaps::default();
    json::unmarshal(&out, &mut back).unwrap();
    assert_eq!(back, msg);
}

#[test]
fn invalid_map_key() {
    let mut msg = MessageWithMaps::default();
    let err = json::unmarshal(br#"{"int_string":{"x":"y"}}"#, &mut msg).unwrap_err();
    assert!(matches!(err.kind, JsonErrorKind::InvalidValue { ty: "map key", .. }));
}

#[test]
fn oneofs() {
    use message_with_oneofs::Value;

    let cases = [
        (Value::StringValue("x".into()), r#"{"string_value":"x","name":"n"}"#),
        (Value::Int64Value(0), r#"{"int64_value":"0","name":"n"}"#),
        (
            Value::Sub(Box::new(MessageWithScalars {
                bool_value: true,
                ..Default::default()
            })),
            r#"{"sub":{"bool_value":true},"name":"n"}"#,
        ),
    ];
    for (value, expected) in cases {
        let msg = MessageWithOneofs {
            value: Some(value),
            name: "n".into(),
        };
        let out = json::marshal(&msg).unwrap();
        assert_eq!(as_str(&out), expected);

        let mut back = MessageWithOneofs::default();
        json::unmarshal(&out, &mut back).unwrap();
        assert_eq!(back, msg);
    }

    assert_eq!(json::marshal(&MessageWithOneofs::default()).unwrap(), b"{}");
}

#[test]
fn oneof_input() {
    use message_with_oneofs::Value;

    let mut msg = MessageWithOneofs::default();
    let mask = json::unmarshal_with_field_mask(br#"{"int64Value":"5","name":"n"}"#, &mut msg).unwrap();
    assert_eq!(msg.value, Some(Value::Int64Value(5)));
    assert_eq!(mask.paths(), ["int64_value", "name"]);

    // A null alternative leaves the oneof alone.
    json::unmarshal(br#"{"string_value":null}"#, &mut msg).unwrap();
    assert_eq!(msg.value, Some(Value::Int64Value(5)));

    json::unmarshal(br#"{"sub":{"int32_value":2}}"#, &mut msg).unwrap();
    assert_eq!(
        msg.value,
        Some(Value::Sub(Box::new(MessageWithScalars {
            int32_value: 2,
            ..Default::default()
        })))
    );
}

#[test]
fn repeated_bounded_overflow() {
    let mut msg = MessageWithPacked::default();
    let err = json::unmarshal(br#"{"bounded":[1,2,3]}"#, &mut msg).unwrap_err();
    assert_eq!(err.kind, JsonErrorKind::Decode(protolite::DecodeError::CapacityExceeded));
}
