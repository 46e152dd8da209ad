use std::borrow::Cow;
use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;

use super::{datetime, FieldPath, JsonError, JsonErrorKind, Operation, PathSet, UnmarshalerConfig};
use crate::fieldmask;

/// Nesting limit of objects and arrays.
const MAX_DEPTH: usize = 128;

/// Type of the next JSON value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    /// `null`
    Null,
    /// `true` or `false`
    Bool,
    /// A number.
    Number,
    /// A string.
    String,
    /// An object.
    Object,
    /// An array.
    Array,
}

struct Frame {
    object: bool,
    first: bool,
}

/// Streaming protobuf-JSON reader.
///
/// Objects and arrays are traversed with a cursor: [`enter_object`] and
/// [`next_key`], or [`enter_array`] and [`next_element`]. After a key or
/// element is returned its value must be read (or skipped) before the cursor
/// moves again; advancing over an unread value latches
/// [`JsonErrorKind::UnconsumedValue`].
///
/// Reads return default values once an error has been latched.
///
/// [`enter_object`]: UnmarshalState::enter_object
/// [`next_key`]: UnmarshalState::next_key
/// [`enter_array`]: UnmarshalState::enter_array
/// [`next_element`]: UnmarshalState::next_element
pub struct UnmarshalState<'a> {
    data: &'a [u8],
    pos: usize,
    config: Rc<UnmarshalerConfig>,
    err: Rc<RefCell<Option<JsonError>>>,
    path: FieldPath,
    mask: PathSet,
    frames: Vec<Frame>,
    pending: bool,
}

impl<'a> UnmarshalState<'a> {
    /// A reader over `data`.
    pub fn new(data: &'a [u8], config: UnmarshalerConfig) -> Self {
        Self {
            data,
            pos: 0,
            config: Rc::new(config),
            err: Rc::new(RefCell::new(None)),
            path: FieldPath::root(),
            mask: PathSet::new(),
            frames: Vec::new(),
            pending: false,
        }
    }

    /// Options of this reader.
    pub fn config(&self) -> &UnmarshalerConfig {
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
        tracing::debug!(%path, error = %kind, "protojson unmarshal failed");
        *err = Some(JsonError {
            op: Operation::Unmarshal,
            path,
            kind,
        });
    }

    /// A reader over `data` that shares this reader's error and path but
    /// collects its own field mask.
    pub fn sub<'b>(&self, data: &'b [u8]) -> UnmarshalState<'b> {
        UnmarshalState {
            data,
            pos: 0,
            config: self.config.clone(),
            err: self.err.clone(),
            path: self.path.clone(),
            mask: PathSet::new(),
            frames: Vec::new(),
            pending: false,
        }
    }

    /// Run `f` with `field` appended to the current path, recording the field
    /// in the mask first if `mask` is set.
    pub fn with_field<R>(&mut self, field: &str, mask: bool, f: impl FnOnce(&mut Self) -> R) -> R {
        if mask {
            self.add_field(field);
        }
        let child = self.path.push(field);
        let parent = mem::replace(&mut self.path, child);
        let result = f(self);
        self.path = parent;
        result
    }

    /// Record the child `field` of the current path as present.
    pub fn add_field(&mut self, field: &str) {
        let path = self.path.push(field);
        self.mask.add(&path);
    }

    /// The current path.
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Fields recorded so far.
    pub fn field_mask(&self) -> &PathSet {
        &self.mask
    }

    /// Consume the reader, returning the recorded fields.
    pub fn into_field_mask(self) -> PathSet {
        self.mask
    }

    /// Check that only whitespace follows the top-level value, and return the
    /// latched error if there is one.
    pub fn finish(&mut self) -> Result<(), JsonError> {
        if !self.has_error() {
            self.skip_ws();
            if self.pos != self.data.len() {
                self.set_error(JsonErrorKind::TrailingData);
            }
        }
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn skip_ws(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.data.get(self.pos) {
            self.pos += 1;
        }
    }

    fn peek_byte(&mut self) -> Option<u8> {
        self.skip_ws();
        self.data.get(self.pos).copied()
    }

    fn syntax_error(&self, message: &'static str) {
        self.set_error(JsonErrorKind::Syntax {
            offset: self.pos,
            message,
        });
    }

    fn expect_byte(&mut self, b: u8, message: &'static str) -> bool {
        if self.peek_byte() == Some(b) {
            self.pos += 1;
            true
        } else {
            self.syntax_error(message);
            false
        }
    }

    /// Start reading a value: fails if an error is latched, and marks the
    /// pending key or element as consumed.
    fn begin_value(&mut self) -> bool {
        if self.has_error() {
            return false;
        }
        self.pending = false;
        self.skip_ws();
        true
    }

    /// Type of the next value, without consuming it.
    pub fn peek_kind(&mut self) -> Option<ValueKind> {
        if self.has_error() {
            return None;
        }
        Some(match self.peek_byte()? {
            b'{' => ValueKind::Object,
            b'[' => ValueKind::Array,
            b'"' => ValueKind::String,
            b't' | b'f' => ValueKind::Bool,
            b'n' => ValueKind::Null,
            b'-' | b'0'..=b'9' => ValueKind::Number,
            _ => return None,
        })
    }

    /// Consume a `null` if it is the next value.
    pub fn read_nil(&mut self) -> bool {
        if self.peek_kind() != Some(ValueKind::Null) {
            return false;
        }
        self.begin_value();
        self.parse_literal(b"null")
    }

    fn parse_literal(&mut self, literal: &[u8]) -> bool {
        if self.data[self.pos..].starts_with(literal) {
            self.pos += literal.len();
            true
        } else {
            self.syntax_error("invalid literal");
            false
        }
    }

    fn parse_number(&mut self) -> Option<&'a str> {
        let data = self.data;
        let start = self.pos;
        while let Some(b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E') = data.get(self.pos) {
            self.pos += 1;
        }
        match std::str::from_utf8(&data[start..self.pos]) {
            Ok(text) if is_json_number(text) => Some(text),
            _ => {
                self.pos = start;
                self.syntax_error("invalid number");
                None
            }
        }
    }

    fn parse_hex4(&mut self) -> Option<u32> {
        let digits = self.data.get(self.pos..self.pos + 4)?;
        let digits = std::str::from_utf8(digits).ok()?;
        let v = u32::from_str_radix(digits, 16).ok()?;
        self.pos += 4;
        Some(v)
    }

    fn parse_escape(&mut self, out: &mut Vec<u8>) -> bool {
        let Some(&c) = self.data.get(self.pos) else {
            self.syntax_error("unterminated string");
            return false;
        };
        self.pos += 1;
        let simple = match c {
            b'"' => b'"',
            b'\\' => b'\\',
            b'/' => b'/',
            b'b' => 0x08,
            b'f' => 0x0c,
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'u' => {
                let Some(hi) = self.parse_hex4() else {
                    self.syntax_error("invalid unicode escape");
                    return false;
                };
                let code = if (0xd800..0xdc00).contains(&hi) {
                    let lo = if self.data[self.pos..].starts_with(b"\\u") {
                        self.pos += 2;
                        self.parse_hex4()
                    } else {
                        None
                    };
                    match lo {
                        Some(lo) if (0xdc00..0xe000).contains(&lo) => 0x10000 + ((hi - 0xd800) << 10) + (lo - 0xdc00),
                        _ => {
                            self.syntax_error("invalid surrogate pair");
                            return false;
                        }
                    }
                } else {
                    hi
                };
                let Some(ch) = char::from_u32(code) else {
                    self.syntax_error("invalid unicode escape");
                    return false;
                };
                let mut tmp = [0; 4];
                out.extend_from_slice(ch.encode_utf8(&mut tmp).as_bytes());
                return true;
            }
            _ => {
                self.syntax_error("invalid escape");
                return false;
            }
        };
        out.push(simple);
        true
    }

    /// Parse the string starting at the current `"`.
    fn parse_string(&mut self) -> Option<String> {
        self.pos += 1;
        let mut out = Vec::new();
        loop {
            let Some(&c) = self.data.get(self.pos) else {
                self.syntax_error("unterminated string");
                return None;
            };
            self.pos += 1;
            match c {
                b'"' => break,
                b'\\' => {
                    if !self.parse_escape(&mut out) {
                        return None;
                    }
                }
                c if c < 0x20 => {
                    self.syntax_error("control character in string");
                    return None;
                }
                c => out.push(c),
            }
        }
        match String::from_utf8(out) {
            Ok(s) => Some(s),
            Err(_) => {
                self.syntax_error("invalid UTF-8 in string");
                None
            }
        }
    }

    /// Step into the object that is the next value.
    pub fn enter_object(&mut self) -> bool {
        self.enter(b'{', true, "object")
    }

    /// Step into the array that is the next value.
    pub fn enter_array(&mut self) -> bool {
        self.enter(b'[', false, "array")
    }

    fn enter(&mut self, open: u8, object: bool, ty: &'static str) -> bool {
        if !self.begin_value() {
            return false;
        }
        if self.data.get(self.pos) != Some(&open) {
            self.set_error(JsonErrorKind::InvalidValueType(ty));
            return false;
        }
        if self.frames.len() >= MAX_DEPTH {
            self.syntax_error("exceeded maximum nesting depth");
            return false;
        }
        self.pos += 1;
        self.frames.push(Frame { object, first: true });
        true
    }

    /// Move to the next element of the current container. Returns `false`
    /// after leaving the container at its closing bracket.
    fn advance(&mut self, object: bool) -> bool {
        if self.has_error() {
            return false;
        }
        if self.pending {
            self.set_error(JsonErrorKind::UnconsumedValue);
            return false;
        }
        let Some(frame) = self.frames.last_mut() else {
            self.set_error(JsonErrorKind::Custom("cursor is not inside a container".into()));
            return false;
        };
        if frame.object != object {
            self.set_error(JsonErrorKind::Custom("cursor is inside a different container type".into()));
            return false;
        }
        let first = mem::replace(&mut frame.first, false);
        let close = if object { b'}' } else { b']' };
        if self.peek_byte() == Some(close) {
            self.pos += 1;
            self.frames.pop();
            return false;
        }
        if !first && !self.expect_byte(b',', "expected ','") {
            return false;
        }
        true
    }

    /// The next key of the current object, or `None` at its end. The key's
    /// value must be read before calling again.
    pub fn next_key(&mut self) -> Option<String> {
        if !self.advance(true) {
            return None;
        }
        if self.peek_byte() != Some(b'"') {
            self.syntax_error("expected object key");
            return None;
        }
        let key = self.parse_string()?;
        if !self.expect_byte(b':', "expected ':'") {
            return None;
        }
        self.pending = true;
        Some(key)
    }

    /// Whether the current array has another element. The element must be
    /// read before calling again.
    pub fn next_element(&mut self) -> bool {
        if !self.advance(false) {
            return false;
        }
        self.pending = true;
        true
    }

    /// Call `f` with each key of the object that is the next value; `f` must
    /// read the key's value.
    pub fn read_object(&mut self, mut f: impl FnMut(&mut Self, &str)) {
        if !self.enter_object() {
            return;
        }
        while let Some(key) = self.next_key() {
            f(self, &key);
        }
    }

    /// Call `f` for each element of the array that is the next value; `f` must
    /// read the element.
    pub fn read_array(&mut self, mut f: impl FnMut(&mut Self)) {
        if !self.enter_array() {
            return;
        }
        while self.next_element() {
            f(self);
        }
    }

    /// Consume the next value, whatever it is.
    pub fn skip_value(&mut self) {
        if self.begin_value() {
            self.skip_inner(0);
        }
    }

    /// Consume the value of an unrecognized key.
    pub fn skip_unknown_field(&mut self, key: &str) {
        tracing::trace!(path = %self.path, key, "skipping unknown field");
        self.skip_value();
    }

    /// Consume the next value and return its JSON text.
    pub fn read_raw_value(&mut self) -> Option<&'a [u8]> {
        if !self.begin_value() {
            return None;
        }
        let data = self.data;
        let start = self.pos;
        self.skip_inner(0);
        if self.has_error() {
            return None;
        }
        Some(&data[start..self.pos])
    }

    fn skip_inner(&mut self, depth: usize) {
        if depth >= MAX_DEPTH {
            return self.syntax_error("exceeded maximum nesting depth");
        }
        match self.peek_byte() {
            Some(b'{') => {
                self.pos += 1;
                if self.peek_byte() == Some(b'}') {
                    self.pos += 1;
                    return;
                }
                loop {
                    if self.peek_byte() != Some(b'"') {
                        return self.syntax_error("expected object key");
                    }
                    if self.parse_string().is_none() || !self.expect_byte(b':', "expected ':'") {
                        return;
                    }
                    self.skip_inner(depth + 1);
                    if self.has_error() {
                        return;
                    }
                    match self.peek_byte() {
                        Some(b',') => self.pos += 1,
                        Some(b'}') => {
                            self.pos += 1;
                            return;
                        }
                        _ => return self.syntax_error("expected ',' or '}'"),
                    }
                }
            }
            Some(b'[') => {
                self.pos += 1;
                if self.peek_byte() == Some(b']') {
                    self.pos += 1;
                    return;
                }
                loop {
                    self.skip_inner(depth + 1);
                    if self.has_error() {
                        return;
                    }
                    match self.peek_byte() {
                        Some(b',') => self.pos += 1,
                        Some(b']') => {
                            self.pos += 1;
                            return;
                        }
                        _ => return self.syntax_error("expected ',' or ']'"),
                    }
                }
            }
            Some(b'"') => {
                self.parse_string();
            }
            Some(b't') => {
                self.parse_literal(b"true");
            }
            Some(b'f') => {
                self.parse_literal(b"false");
            }
            Some(b'n') => {
                self.parse_literal(b"null");
            }
            Some(b'-' | b'0'..=b'9') => {
                self.parse_number();
            }
            Some(_) => self.syntax_error("unexpected character"),
            None => self.syntax_error("unexpected end of input"),
        }
    }

    /// `true`, `false`, or the strings `"true"` and `"false"`.
    pub fn read_bool(&mut self) -> bool {
        if !self.begin_value() {
            return false;
        }
        match self.peek_kind() {
            Some(ValueKind::Bool) if self.data[self.pos] == b't' => self.parse_literal(b"true"),
            Some(ValueKind::Bool) => {
                self.parse_literal(b"false");
                false
            }
            Some(ValueKind::String) => match self.parse_string().as_deref() {
                Some("true") => true,
                Some("false") | None => false,
                Some(other) => {
                    self.set_error(JsonErrorKind::InvalidValue {
                        ty: "bool",
                        cause: format!("{:?} is not a bool", other),
                    });
                    false
                }
            },
            _ => {
                self.set_error(JsonErrorKind::InvalidValueType("bool"));
                false
            }
        }
    }

    /// Text of a number, or of a string holding one.
    fn read_numeric_text(&mut self, ty: &'static str) -> Option<Cow<'a, str>> {
        if !self.begin_value() {
            return None;
        }
        match self.peek_kind() {
            Some(ValueKind::Number) => self.parse_number().map(Cow::Borrowed),
            Some(ValueKind::String) => self.parse_string().map(Cow::Owned),
            _ => {
                self.set_error(JsonErrorKind::InvalidValueType(ty));
                None
            }
        }
    }

    fn read_integer<T: TryFrom<i128> + Default>(&mut self, ty: &'static str) -> T {
        let Some(text) = self.read_numeric_text(ty) else {
            return T::default();
        };
        let parsed = parse_integer(&text)
            .and_then(|v| T::try_from(v).map_err(|_| format!("{} out of range", text)));
        match parsed {
            Ok(v) => v,
            Err(cause) => {
                self.set_error(JsonErrorKind::InvalidValue { ty, cause });
                T::default()
            }
        }
    }

    /// A number or a string holding one.
    pub fn read_int32(&mut self) -> i32 {
        self.read_integer("int32")
    }

    /// A number or a string holding one.
    pub fn read_int64(&mut self) -> i64 {
        self.read_integer("int64")
    }

    /// A number or a string holding one.
    pub fn read_uint32(&mut self) -> u32 {
        self.read_integer("uint32")
    }

    /// A number or a string holding one.
    pub fn read_uint64(&mut self) -> u64 {
        self.read_integer("uint64")
    }

    fn read_float(&mut self, ty: &'static str) -> Option<f64> {
        let text = self.read_numeric_text(ty)?;
        let parsed = match &*text {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            t if is_json_number(t) => match t.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => Err(format!("{} out of range", t)),
            },
            t => Err(format!("{:?} is not a number", t)),
        };
        match parsed {
            Ok(v) => Some(v),
            Err(cause) => {
                self.set_error(JsonErrorKind::InvalidValue { ty, cause });
                None
            }
        }
    }

    /// A number, a string holding one, or `"NaN"`, `"Infinity"`,
    /// `"-Infinity"`.
    pub fn read_float32(&mut self) -> f32 {
        match self.read_float("float32") {
            Some(v) if v.is_finite() && v.abs() > f64::from(f32::MAX) => {
                self.set_error(JsonErrorKind::InvalidValue {
                    ty: "float32",
                    cause: format!("{} out of range", v),
                });
                0.0
            }
            Some(v) => v as f32,
            None => 0.0,
        }
    }

    /// A number, a string holding one, or `"NaN"`, `"Infinity"`,
    /// `"-Infinity"`.
    pub fn read_float64(&mut self) -> f64 {
        self.read_float("float64").unwrap_or_default()
    }

    fn read_string_as(&mut self, ty: &'static str) -> Option<String> {
        if !self.begin_value() {
            return None;
        }
        if self.peek_kind() != Some(ValueKind::String) {
            self.set_error(JsonErrorKind::InvalidValueType(ty));
            return None;
        }
        self.parse_string()
    }

    /// A string.
    pub fn read_string(&mut self) -> String {
        self.read_string_as("string").unwrap_or_default()
    }

    /// Base64 in the standard or URL-safe alphabet, with or without padding.
    pub fn read_bytes(&mut self) -> Vec<u8> {
        let Some(s) = self.read_string_as("bytes") else {
            return Vec::new();
        };
        match decode_base64(&s) {
            Ok(v) => v,
            Err(e) => {
                self.set_error(JsonErrorKind::InvalidValue {
                    ty: "bytes",
                    cause: e.to_string(),
                });
                Vec::new()
            }
        }
    }

    /// An enum value as a number, a name from the first map that knows it,
    /// or a string holding a number.
    pub fn read_enum(&mut self, maps: &[&[(&str, i32)]]) -> i32 {
        if !self.begin_value() {
            return 0;
        }
        match self.peek_kind() {
            Some(ValueKind::Number) => self.read_int32(),
            Some(ValueKind::String) => {
                let Some(name) = self.parse_string() else {
                    return 0;
                };
                let found = maps
                    .iter()
                    .find_map(|map| map.iter().find(|(n, _)| *n == name).map(|(_, v)| *v));
                match found.or_else(|| name.parse().ok()) {
                    Some(v) => v,
                    None => {
                        self.set_error(JsonErrorKind::UnknownEnumValue(name));
                        0
                    }
                }
            }
            _ => {
                self.set_error(JsonErrorKind::InvalidValueType("enum"));
                0
            }
        }
    }

    /// An RFC 3339 timestamp as UTC seconds and nanos.
    pub fn read_time(&mut self) -> (i64, i32) {
        let Some(s) = self.read_string_as("timestamp") else {
            return (0, 0);
        };
        datetime::parse_timestamp(&s).unwrap_or_else(|cause| {
            self.set_error(JsonErrorKind::InvalidValue { ty: "timestamp", cause });
            (0, 0)
        })
    }

    /// A duration such as `"1.5s"` as seconds and nanos.
    pub fn read_duration(&mut self) -> (i64, i32) {
        let Some(s) = self.read_string_as("duration") else {
            return (0, 0);
        };
        datetime::parse_duration(&s).unwrap_or_else(|cause| {
            self.set_error(JsonErrorKind::InvalidValue { ty: "duration", cause });
            (0, 0)
        })
    }

    /// A field mask, either comma-joined lowerCamelCase paths or the legacy
    /// `{"paths":[...]}` form. Returns snake_case paths.
    pub fn read_field_mask(&mut self) -> Vec<String> {
        let mut paths = Vec::new();
        if self.peek_kind() == Some(ValueKind::Object) {
            self.read_object(|s, key| match key {
                "paths" => s.read_array(|s| paths.push(s.read_string())),
                _ => s.skip_unknown_field(key),
            });
            return paths;
        }
        let Some(joined) = self.read_string_as("field mask") else {
            return paths;
        };
        for camel in joined.split(',').filter(|p| !p.is_empty()) {
            match fieldmask::to_snake_case(camel) {
                Ok(path) => paths.push(path),
                Err(cause) => {
                    self.set_error(JsonErrorKind::InvalidValue { ty: "field mask", cause });
                    return Vec::new();
                }
            }
        }
        paths
    }

    /// A wrapper value: either the bare value read by `read`, or an object
    /// holding it under `"value"`.
    pub fn read_wrapped<T: Default>(&mut self, mut read: impl FnMut(&mut Self) -> T) -> T {
        if self.peek_kind() != Some(ValueKind::Object) {
            return read(self);
        }
        let mut value = T::default();
        self.read_object(|s, key| match key {
            "value" => value = read(s),
            _ => s.skip_unknown_field(key),
        });
        value
    }
}

/// Whether `s` is a number in JSON syntax.
fn is_json_number(s: &str) -> bool {
    let b = s.as_bytes();
    let mut i = 0;
    let digits = |i: &mut usize| {
        let start = *i;
        while *i < b.len() && b[*i].is_ascii_digit() {
            *i += 1;
        }
        *i > start
    };
    if b.first() == Some(&b'-') {
        i += 1;
    }
    match b.get(i) {
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => {
            digits(&mut i);
        }
        _ => return false,
    }
    if b.get(i) == Some(&b'.') {
        i += 1;
        if !digits(&mut i) {
            return false;
        }
    }
    if let Some(b'e' | b'E') = b.get(i) {
        i += 1;
        if let Some(b'+' | b'-') = b.get(i) {
            i += 1;
        }
        if !digits(&mut i) {
            return false;
        }
    }
    i == b.len()
}

/// An integral value of a JSON number, which may use a fraction or exponent.
fn parse_integer(text: &str) -> Result<i128, String> {
    if !is_json_number(text) {
        return Err(format!("{:?} is not a number", text));
    }
    if !text.bytes().any(|b| matches!(b, b'.' | b'e' | b'E')) {
        return text.parse().map_err(|_| format!("{} out of range", text));
    }
    let v: f64 = text.parse().map_err(|_| format!("{:?} is not a number", text))?;
    if v.fract() != 0.0 {
        return Err(format!("{} is not an integer", text));
    }
    if !v.is_finite() || v.abs() >= 18_446_744_073_709_551_616.0 {
        return Err(format!("{} out of range", text));
    }
    Ok(v as i128)
}

fn decode_base64(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let standard: String = s
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();
    STANDARD_NO_PAD.decode(standard)
}
