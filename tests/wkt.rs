mod common;

use std::sync::Arc;

use common::*;
use protolite::json::{self, JsonErrorKind, MarshalerConfig, PathSet, UnmarshalerConfig, DEFAULT_MARSHALER_CONFIG};
use protolite::wkt::{Any, Duration, Empty, FieldMask, Int64Value, Struct, Timestamp, TypeRegistry, Value};
use protolite::Message;

fn registry() -> Arc<TypeRegistry> {
    Arc::new(TypeRegistry::new().with::<MessageWithScalars>())
}

fn marshaler() -> MarshalerConfig {
    MarshalerConfig {
        registry: Some(registry()),
        ..DEFAULT_MARSHALER_CONFIG
    }
}

fn unmarshaler() -> UnmarshalerConfig {
    UnmarshalerConfig {
        registry: Some(registry()),
    }
}

fn sample() -> MessageWithWellKnownTypes {
    MessageWithWellKnownTypes {
        any: Some(
            Any::pack(&MessageWithScalars {
                int32_value: 5,
                ..Default::default()
            })
            .unwrap(),
        ),
        duration: Some(Duration {
            seconds: 1,
            nanos: 500_000_000,
        }),
        timestamp: Some(Timestamp {
            seconds: 1_600_000_000,
            nanos: 120_000_000,
        }),
        field_mask: Some(FieldMask::new(["a.b_c", "d"])),
        value: Some(Value::null()),
        values: vec![Value::from(1.0), Value::from("x")],
        r#struct: Some([("k".to_owned(), Value::from(true))].into_iter().collect()),
        int64_value: Some(Int64Value::from(-3)),
        empty: Some(Empty {}),
    }
}

const SAMPLE_JSON: &str = concat!(
    r#"{"any":{"@type":"type.googleapis.com/test.MessageWithScalars","int32_value":5},"#,
    r#""duration":"1.500s","timestamp":"2020-09-13T12:26:40.120Z","field_mask":"a.bC,d","#,
    r#""value":null,"values":[1,"x"],"struct":{"k":true},"int64_value":"-3","empty":{}}"#
);

#[test]
fn well_known_types_round_trip() {
    let msg = sample();
    let out = marshaler().marshal(&msg).unwrap();
    assert_eq!(std::str::from_utf8(&out).unwrap(), SAMPLE_JSON);

    let mut back = MessageWithWellKnownTypes::default();
    unmarshaler().unmarshal(&out, &mut back).unwrap();
    assert_eq!(back, msg);

    let binary = protolite::read::<MessageWithWellKnownTypes>(&msg.marshal_vt().unwrap()).unwrap();
    assert_eq!(binary, msg);
}

#[test]
fn any_needs_registered_type() {
    let err = json::marshal(&sample()).unwrap_err();
    assert_eq!(err.path, "any");
    assert_eq!(
        err.kind,
        JsonErrorKind::UnresolvableTypeUrl("type.googleapis.com/test.MessageWithScalars".into())
    );

    let mut msg = MessageWithWellKnownTypes::default();
    let err = json::unmarshal(SAMPLE_JSON.as_bytes(), &mut msg).unwrap_err();
    assert_eq!(err.path, "any");
}

#[test]
fn any_with_message_payload() {
    let any = Any::pack(&common::populated_scalars()).unwrap();
    let out = marshaler().marshal(&any).unwrap();
    let text = std::str::from_utf8(&out).unwrap();
    assert!(text.starts_with(r#"{"@type":"type.googleapis.com/test.MessageWithScalars","double_value":1.5,"#));

    let mut back = Any::default();
    unmarshaler().unmarshal(&out, &mut back).unwrap();
    assert_eq!(back.unpack::<MessageWithScalars>().unwrap(), common::populated_scalars());

    // An empty message leaves only the type.
    let any = Any::pack(&MessageWithScalars::default()).unwrap();
    assert_eq!(
        marshaler().marshal(&any).unwrap(),
        br#"{"@type":"type.googleapis.com/test.MessageWithScalars"}"#
    );
}

#[test]
fn outer_mask_does_not_reach_into_any() {
    let msg = MessageWithWellKnownTypes {
        any: Some(Any::pack(&MessageWithScalars::default()).unwrap()),
        ..Default::default()
    };
    let mask: PathSet = ["any", "any.int32_value"].into_iter().collect();
    let out = marshaler().marshal_with_field_mask(&msg, mask).unwrap();
    assert_eq!(
        std::str::from_utf8(&out).unwrap(),
        r#"{"any":{"@type":"type.googleapis.com/test.MessageWithScalars"}}"#
    );

    let msg = MessageWithWellKnownTypes {
        any: Some(Any::pack(&Int64Value::from(0)).unwrap()),
        ..Default::default()
    };
    let mask: PathSet = ["any", "any.value"].into_iter().collect();
    let out = marshaler().marshal_with_field_mask(&msg, mask).unwrap();
    assert_eq!(
        std::str::from_utf8(&out).unwrap(),
        r#"{"any":{"@type":"type.googleapis.com/google.protobuf.Int64Value","value":"0"}}"#
    );
}

#[test]
fn any_with_well_known_payload() {
    let cases = [
        (
            Any::pack(&[("a".to_owned(), Value::from(1.0))].into_iter().collect::<Struct>()).unwrap(),
            r#"{"@type":"type.googleapis.com/google.protobuf.Struct","value":{"a":1}}"#,
        ),
        (
            Any::pack(&Int64Value::from(-3)).unwrap(),
            r#"{"@type":"type.googleapis.com/google.protobuf.Int64Value","value":"-3"}"#,
        ),
        (
            Any::pack(&Empty {}).unwrap(),
            r#"{"@type":"type.googleapis.com/google.protobuf.Empty","value":{}}"#,
        ),
    ];
    for (any, expected) in cases {
        let out = json::marshal(&any).unwrap();
        assert_eq!(std::str::from_utf8(&out).unwrap(), expected);

        let mut back = Any::default();
        json::unmarshal(&out, &mut back).unwrap();
        assert_eq!(back, any);
    }
}

#[test]
fn legacy_field_mask() {
    let config = MarshalerConfig {
        legacy_field_mask: true,
        ..DEFAULT_MARSHALER_CONFIG
    };
    let msg = MessageWithWellKnownTypes {
        field_mask: Some(FieldMask::new(["a.b_c", "d"])),
        ..Default::default()
    };
    let out = config.marshal(&msg).unwrap();
    assert_eq!(out, br#"{"field_mask":{"paths":["a.b_c","d"]}}"#);

    let mut back = MessageWithWellKnownTypes::default();
    json::unmarshal(&out, &mut back).unwrap();
    assert_eq!(back, msg);
}

#[test]
fn time_input() {
    let mut msg = MessageWithWellKnownTypes::default();
    json::unmarshal(
        br#"{"timestamp":"2020-09-13T14:26:40.12+02:00","duration":"-0.5s","int64Value":7}"#,
        &mut msg,
    )
    .unwrap();
    assert_eq!(
        msg.timestamp,
        Some(Timestamp {
            seconds: 1_600_000_000,
            nanos: 120_000_000,
        })
    );
    assert_eq!(
        msg.duration,
        Some(Duration {
            seconds: 0,
            nanos: -500_000_000,
        })
    );
    assert_eq!(msg.int64_value, Some(Int64Value::from(7)));

    let err = json::unmarshal(br#"{"duration":"1m"}"#, &mut msg).unwrap_err();
    assert!(matches!(err.kind, JsonErrorKind::InvalidValue { ty: "duration", .. }));
}

#[test]
fn null_value_is_kept() {
    let mut msg = MessageWithWellKnownTypes::default();
    let mask = json::unmarshal_with_field_mask(br#"{"value":null,"values":[null,{}],"int64_value":null}"#, &mut msg)
        .unwrap();
    assert_eq!(msg.value, Some(Value::null()));
    assert_eq!(msg.values, [Value::null(), Value::from(Struct::default())]);
    assert_eq!(msg.int64_value, None);
    assert_eq!(mask.paths(), ["value", "values", "int64_value"]);
}
