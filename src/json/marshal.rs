use std::borrow::Cow;
use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::{datetime, FieldPath, JsonError, JsonErrorKind, MarshalerConfig, Operation, PathSet};
use crate::fieldmask;

/// Streaming protobuf-JSON writer.
///
/// Writes are no-ops once an error has been latched with
/// [`MarshalState::set_error`]; the error is returned by
/// [`MarshalState::into_bytes`].
pub struct MarshalState {
    buf: String,
    config: Rc<MarshalerConfig>,
    err: Rc<RefCell<Option<JsonError>>>,
    path: FieldPath,
    mask: Rc<PathSet>,
}

impl MarshalState {
    /// A writer with an empty output and an empty field mask.
    pub fn new(config: MarshalerConfig) -> Self {
        Self {
            buf: String::new(),
            config: Rc::new(config),
            err: Rc::new(RefCell::new(None)),
            path: FieldPath::root(),
            mask: Rc::new(PathSet::new()),
        }
    }

    /// Write the fields named by `mask` even when they hold default values.
    pub fn with_field_mask(mut self, mask: PathSet) -> Self {
        self.mask = Rc::new(mask);
        self
    }

    /// Options of this writer.
    pub fn config(&self) -> &MarshalerConfig {
        &self.config
    }

    /// The latched error, if any.
    pub fn err(&self) -> Option<JsonError> {
        self.err.borrow().clone()
    }

    /// Whether an error has been latched.
    pub fn has_error(&self) -> bool {
        self.err.borrow().is_some()
    }

    /// Latch `kind` at the current path unless an error is already latched.
    pub fn set_error(&self, kind: JsonErrorKind) {
        let mut err = self.err.borrow_mut();
        if err.is_some() {
            return;
        }
        let path = self.path.to_string();
        tracing::debug!(%path, error = %kind, "protojson marshal failed");
        *err = Some(JsonError {
            op: Operation::Marshal,
            path,
            kind,
        });
    }

    /// A writer with its own output buffer that shares this writer's error,
    /// path and mask. Used to capture a value before splicing it.
    pub fn sub(&self) -> MarshalState {
        MarshalState {
            buf: String::new(),
            config: self.config.clone(),
            err: self.err.clone(),
            path: self.path.clone(),
            mask: self.mask.clone(),
        }
    }

    /// Like [`sub`](Self::sub), but with an empty field mask, for a message
    /// that is not a field of the current one, such as the payload of an
    /// `Any`. The path is kept so errors still point into the outer message.
    pub fn sub_message(&self) -> MarshalState {
        MarshalState {
            mask: Rc::new(PathSet::new()),
            ..self.sub()
        }
    }

    /// Run `f` with `field` appended to the current path.
    pub fn with_field<R>(&mut self, field: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        let child = self.path.push(field);
        let parent = mem::replace(&mut self.path, child);
        let result = f(self);
        self.path = parent;
        result
    }

    /// Whether the field mask names the child `field` of the current path.
    pub fn has_field(&self, field: &str) -> bool {
        !self.mask.is_empty() && self.mask.contains(&self.path.push(field))
    }

    /// The current path.
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Output written so far.
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// The output, or the latched error.
    pub fn into_bytes(self) -> Result<Vec<u8>, JsonError> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(self.buf.into_bytes()),
        }
    }

    /// Append pre-encoded JSON.
    pub fn write_raw(&mut self, json: &str) {
        if self.has_error() {
            return;
        }
        self.buf.push_str(json);
    }

    fn push(&mut self, c: char) {
        if self.has_error() {
            return;
        }
        self.buf.push(c);
    }

    /// `{`
    pub fn write_object_start(&mut self) {
        self.push('{');
    }

    /// `}`
    pub fn write_object_end(&mut self) {
        self.push('}');
    }

    /// `[`
    pub fn write_array_start(&mut self) {
        self.push('[');
    }

    /// `]`
    pub fn write_array_end(&mut self) {
        self.push(']');
    }

    /// `,`
    pub fn write_more(&mut self) {
        self.push(',');
    }

    /// Write a separator if `wrote` is set, then set it.
    pub fn write_more_if(&mut self, wrote: &mut bool) {
        if *wrote {
            self.write_more();
        }
        *wrote = true;
    }

    /// Write `"name":`.
    pub fn write_object_field(&mut self, name: &str) {
        self.write_string(name);
        self.push(':');
    }

    /// Write the key of a message field, choosing the proto or JSON name
    /// according to the config.
    pub fn write_object_field_name(&mut self, proto_name: &str, json_name: &str) {
        if self.config.use_json_names {
            self.write_object_field(json_name)
        } else {
            self.write_object_field(proto_name)
        }
    }

    /// `null`
    pub fn write_nil(&mut self) {
        self.write_raw("null");
    }

    /// `true` or `false`.
    pub fn write_bool(&mut self, v: bool) {
        self.write_raw(if v { "true" } else { "false" });
    }

    /// A bare number.
    pub fn write_int32(&mut self, v: i32) {
        self.write_raw(&v.to_string());
    }

    /// A quoted number.
    pub fn write_int64(&mut self, v: i64) {
        self.write_quoted(&v.to_string());
    }

    /// A bare number.
    pub fn write_uint32(&mut self, v: u32) {
        self.write_raw(&v.to_string());
    }

    /// A quoted number.
    pub fn write_uint64(&mut self, v: u64) {
        self.write_quoted(&v.to_string());
    }

    /// A number, or `"NaN"`, `"Infinity"` or `"-Infinity"`.
    pub fn write_float32(&mut self, v: f32) {
        match special_float(f64::from(v)) {
            Some(s) => self.write_quoted(s),
            None => self.write_raw(&format_float(&format!("{v:e}"))),
        }
    }

    /// A number, or `"NaN"`, `"Infinity"` or `"-Infinity"`.
    pub fn write_float64(&mut self, v: f64) {
        match special_float(v) {
            Some(s) => self.write_quoted(s),
            None => self.write_raw(&format_float(&format!("{v:e}"))),
        }
    }

    fn write_quoted(&mut self, s: &str) {
        if self.has_error() {
            return;
        }
        self.buf.push('"');
        self.buf.push_str(s);
        self.buf.push('"');
    }

    /// A JSON string with escapes.
    pub fn write_string(&mut self, s: &str) {
        if self.has_error() {
            return;
        }
        escape_into(&mut self.buf, s);
    }

    /// Standard base64 with padding.
    pub fn write_bytes(&mut self, v: &[u8]) {
        if self.has_error() {
            return;
        }
        self.write_quoted(&STANDARD.encode(v));
    }

    /// An enum value: its name from the first map that has one, or its
    /// number if none does or the config asks for numbers.
    pub fn write_enum(&mut self, v: i32, maps: &[&[(i32, &'static str)]]) {
        if self.config.enums_as_ints {
            return self.write_enum_number(v);
        }
        match lookup_enum_name(v, maps) {
            Some(name) => self.write_string(name),
            None => self.write_enum_number(v),
        }
    }

    /// An enum value as a quoted name, or a quoted numeral for unknown values.
    pub fn write_enum_string(&mut self, v: i32, maps: &[&[(i32, &'static str)]]) {
        self.write_string(&get_enum_string(v, maps));
    }

    /// An enum value as a bare number.
    pub fn write_enum_number(&mut self, v: i32) {
        self.write_int32(v);
    }

    /// An RFC 3339 timestamp in UTC.
    pub fn write_time(&mut self, seconds: i64, nanos: i32) {
        if self.has_error() {
            return;
        }
        match datetime::format_timestamp(seconds, nanos) {
            Ok(s) => self.write_quoted(&s),
            Err(cause) => self.set_error(JsonErrorKind::InvalidValue { ty: "timestamp", cause }),
        }
    }

    /// A duration such as `"1.500s"`.
    pub fn write_duration(&mut self, seconds: i64, nanos: i32) {
        if self.has_error() {
            return;
        }
        match datetime::format_duration(seconds, nanos) {
            Ok(s) => self.write_quoted(&s),
            Err(cause) => self.set_error(JsonErrorKind::InvalidValue { ty: "duration", cause }),
        }
    }

    /// A field mask: comma-joined lowerCamelCase paths, or `{"paths":[...]}`
    /// with the paths unchanged if the config asks for the legacy form.
    pub fn write_field_mask(&mut self, paths: &[String]) {
        if self.has_error() {
            return;
        }
        if self.config.legacy_field_mask {
            self.write_object_start();
            self.write_object_field("paths");
            self.write_array_start();
            let mut wrote = false;
            for path in paths {
                self.write_more_if(&mut wrote);
                self.write_string(path);
            }
            self.write_array_end();
            self.write_object_end();
            return;
        }
        let mut joined = String::new();
        for (i, path) in paths.iter().enumerate() {
            match fieldmask::to_camel_case(path) {
                Ok(camel) => {
                    if i > 0 {
                        joined.push(',');
                    }
                    joined.push_str(&camel);
                }
                Err(cause) => return self.set_error(JsonErrorKind::InvalidValue { ty: "field mask", cause }),
            }
        }
        self.write_string(&joined);
    }
}

fn special_float(v: f64) -> Option<&'static str> {
    if v.is_nan() {
        Some("NaN")
    } else if v == f64::INFINITY {
        Some("Infinity")
    } else if v == f64::NEG_INFINITY {
        Some("-Infinity")
    } else {
        None
    }
}

/// Rewrite the shortest round-trip digits in `{:e}` form (`1.5e-7`) the way
/// JavaScript prints numbers: plain decimals for exponents from -7 to 20,
/// otherwise `1.5e-7` or `1e+21`.
fn format_float(sci: &str) -> String {
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci.to_owned();
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return sci.to_owned();
    };
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(m) => ("-", m),
        None => ("", mantissa),
    };
    let digits = mantissa.replace('.', "");

    let mut out = String::from(sign);
    if !(-7 < exp && exp < 21) {
        let (first, rest) = digits.split_at(1);
        out.push_str(first);
        if !rest.is_empty() {
            out.push('.');
            out.push_str(rest);
        }
        out.push('e');
        out.push(if exp < 0 { '-' } else { '+' });
        out.push_str(&exp.unsigned_abs().to_string());
    } else if exp < 0 {
        out.push_str("0.");
        out.push_str(&"0".repeat(exp.unsigned_abs() as usize - 1));
        out.push_str(&digits);
    } else {
        let point = exp as usize + 1;
        if digits.len() > point {
            out.push_str(&digits[..point]);
            out.push('.');
            out.push_str(&digits[point..]);
        } else {
            out.push_str(&digits);
            out.push_str(&"0".repeat(point - digits.len()));
        }
    }
    out
}

fn lookup_enum_name(v: i32, maps: &[&[(i32, &'static str)]]) -> Option<&'static str> {
    maps.iter()
        .find_map(|map| map.iter().find(|(number, _)| *number == v).map(|(_, name)| *name))
}

/// Name of enum value `v` from the first map that has one, or its decimal
/// numeral.
pub fn get_enum_string(v: i32, maps: &[&[(i32, &'static str)]]) -> Cow<'static, str> {
    match lookup_enum_name(v, maps) {
        Some(name) => Cow::Borrowed(name),
        None => Cow::Owned(v.to_string()),
    }
}

fn escape_into(buf: &mut String, s: &str) {
    buf.push('"');
    for c in s.chars() {
        match c {
            '"' => buf.push_str("\\\""),
            '\\' => buf.push_str("\\\\"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            '\t' => buf.push_str("\\t"),
            '\u{8}' => buf.push_str("\\b"),
            '\u{c}' => buf.push_str("\\f"),
            c if c < ' ' => buf.push_str(&format!("\\u{:04x}", c as u32)),
            c => buf.push(c),
        }
    }
    buf.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::DEFAULT_MARSHALER_CONFIG;

    fn state() -> MarshalState {
        MarshalState::new(DEFAULT_MARSHALER_CONFIG)
    }

    #[test]
    fn floats() {
        let f64s = [
            (0.0, "0"),
            (-0.5, "-0.5"),
            (1.5, "1.5"),
            (100.0, "100"),
            (1e20, "100000000000000000000"),
            (1e21, "1e+21"),
            (1e300, "1e+300"),
            (1.5e-6, "0.0000015"),
            (1e-7, "1e-7"),
            (-1e-30, "-1e-30"),
            (f64::MAX, "1.7976931348623157e+308"),
            (5e-324, "5e-324"),
        ];
        for (v, expected) in f64s {
            let mut s = state();
            s.write_float64(v);
            assert_eq!(s.as_str(), expected, "{v:?}");
        }

        let f32s = [
            (0.1, "0.1"),
            (2.25, "2.25"),
            (16777216.0, "16777216"),
            (f32::MAX, "3.4028235e+38"),
            (f32::MIN_POSITIVE, "1.1754944e-38"),
        ];
        for (v, expected) in f32s {
            let mut s = state();
            s.write_float32(v);
            assert_eq!(s.as_str(), expected, "{v:?}");
        }
    }

    #[test]
    fn scalars() {
        let mut s = state();
        s.write_array_start();
        let mut wrote = false;
        s.write_more_if(&mut wrote);
        s.write_int32(-5);
        s.write_more_if(&mut wrote);
        s.write_int64(i64::MIN);
        s.write_more_if(&mut wrote);
        s.write_uint64(u64::MAX);
        s.write_more_if(&mut wrote);
        s.write_float64(1.5);
        s.write_more_if(&mut wrote);
        s.write_float32(0.1);
        s.write_more_if(&mut wrote);
        s.write_bool(true);
        s.write_more_if(&mut wrote);
        s.write_nil();
        s.write_array_end();
        assert_eq!(
            s.as_str(),
            r#"[-5,"-9223372036854775808","18446744073709551615",1.5,0.1,true,null]"#
        );
    }

    #[test]
    fn special_floats() {
        let mut s = state();
        s.write_float64(f64::NAN);
        s.write_float64(f64::INFINITY);
        s.write_float32(f32::NEG_INFINITY);
        assert_eq!(s.as_str(), r#""NaN""Infinity""-Infinity""#);
    }

    #[test]
    fn string_escapes() {
        let mut s = state();
        s.write_string("a\"b\\c\nd\u{1}é");
        assert_eq!(s.as_str(), r#""a\"b\\c\nd\u0001é""#);
    }

    #[test]
    fn bytes_are_padded_standard_base64() {
        let mut s = state();
        s.write_bytes(b"foob");
        s.write_bytes(&[0xfb, 0xff]);
        assert_eq!(s.as_str(), r#""Zm9vYg==""+/8=""#);
    }

    #[test]
    fn enums() {
        const BASE: &[(i32, &str)] = &[(0, "ZERO"), (1, "ONE")];
        const OVERRIDE: &[(i32, &str)] = &[(1, "UNO")];
        let mut s = state();
        s.write_enum(1, &[OVERRIDE, BASE]);
        s.write_enum(0, &[OVERRIDE, BASE]);
        s.write_enum(7, &[BASE]);
        s.write_enum_string(7, &[BASE]);
        assert_eq!(s.as_str(), r#""UNO""ZERO"7"7""#);
        assert_eq!(get_enum_string(1, &[BASE]), "ONE");

        let mut s = MarshalState::new(MarshalerConfig {
            enums_as_ints: true,
            ..DEFAULT_MARSHALER_CONFIG
        });
        s.write_enum(1, &[BASE]);
        assert_eq!(s.as_str(), "1");
    }

    #[test]
    fn time_and_duration() {
        let mut s = state();
        s.write_duration(3723, 100_000_000);
        s.write_time(0, 0);
        assert_eq!(s.as_str(), r#""3723.100s""1970-01-01T00:00:00Z""#);
    }

    #[test]
    fn field_mask_forms() {
        let paths = vec!["foo_bar".to_string(), "baz.qux_quux".to_string()];
        let mut s = state();
        s.write_field_mask(&paths);
        assert_eq!(s.as_str(), r#""fooBar,baz.quxQuux""#);

        let mut s = MarshalState::new(MarshalerConfig {
            legacy_field_mask: true,
            ..DEFAULT_MARSHALER_CONFIG
        });
        s.write_field_mask(&paths);
        assert_eq!(s.as_str(), r#"{"paths":["foo_bar","baz.qux_quux"]}"#);
    }

    #[test]
    fn first_error_is_latched_with_path() {
        let mut s = state();
        s.write_object_start();
        s.with_field("outer", |s| {
            s.with_field("inner", |s| s.write_duration(1, -1));
            s.write_time(i64::MAX, 0);
        });
        s.write_int32(1);
        assert_eq!(s.as_str(), "{");
        let err = s.into_bytes().unwrap_err();
        assert_eq!(err.op, Operation::Marshal);
        assert_eq!(err.path, "outer.inner");
        assert!(matches!(err.kind, JsonErrorKind::InvalidValue { ty: "duration", .. }));
    }

    #[test]
    fn sub_shares_error() {
        let s = state();
        let mut sub = s.sub();
        sub.set_error(JsonErrorKind::Custom("boom".into()));
        assert!(s.has_error());
    }

    #[test]
    fn has_field_uses_current_path() {
        let mask: PathSet = ["a", "b.c"].into_iter().collect();
        let mut s = state().with_field_mask(mask);
        assert!(s.has_field("a"));
        assert!(!s.has_field("c"));
        s.with_field("b", |s| assert!(s.has_field("c")));
    }
}
