use std::fmt;

use anyhow::{bail, Error};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Lit, Meta, MetaList, MetaNameValue, NestedMeta};

/// Protobuf value type of a field.
#[derive(Clone, PartialEq, Eq)]
pub enum Ty {
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    Float,
    Double,
    String,
    Bytes,
    Enumeration(syn::Path),
    Message,
}

impl fmt::Debug for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Enumeration(path) => write!(f, "enumeration({})", quote!(#path)),
            ty => f.write_str(ty.scalar_name().unwrap_or("message")),
        }
    }
}

const SCALARS: &[(&str, Ty)] = &[
    ("int32", Ty::Int32),
    ("int64", Ty::Int64),
    ("uint32", Ty::Uint32),
    ("uint64", Ty::Uint64),
    ("sint32", Ty::Sint32),
    ("sint64", Ty::Sint64),
    ("fixed32", Ty::Fixed32),
    ("fixed64", Ty::Fixed64),
    ("sfixed32", Ty::Sfixed32),
    ("sfixed64", Ty::Sfixed64),
    ("bool", Ty::Bool),
    ("float", Ty::Float),
    ("double", Ty::Double),
    ("string", Ty::String),
    ("bytes", Ty::Bytes),
    ("message", Ty::Message),
];

impl Ty {
    fn scalar_name(&self) -> Option<&'static str> {
        SCALARS.iter().find(|(_, ty)| ty == self).map(|(name, _)| *name)
    }

    /// Parse a type name as written in `map = "..."`: a scalar name,
    /// `message`, or `enumeration(Path)`.
    pub fn from_str(s: &str) -> Result<Ty, Error> {
        let s = s.trim();
        if let Some(path) = s.strip_prefix("enumeration(").and_then(|s| s.strip_suffix(')')) {
            return Ok(Ty::Enumeration(syn::parse_str(path.trim())?));
        }
        match SCALARS.iter().find(|(name, _)| *name == s) {
            Some((_, ty)) => Ok(ty.clone()),
            None => bail!("unknown type: {}", s),
        }
    }

    /// The `protolite::kind` codec of the type.
    pub fn codec(&self) -> TokenStream {
        match self {
            Ty::Int32 => quote!(::protolite::kind::Int32),
            Ty::Int64 => quote!(::protolite::kind::Int64),
            Ty::Uint32 => quote!(::protolite::kind::Uint32),
            Ty::Uint64 => quote!(::protolite::kind::Uint64),
            Ty::Sint32 => quote!(::protolite::kind::Sint32),
            Ty::Sint64 => quote!(::protolite::kind::Sint64),
            Ty::Fixed32 => quote!(::protolite::kind::Fixed32),
            Ty::Fixed64 => quote!(::protolite::kind::Fixed64),
            Ty::Sfixed32 => quote!(::protolite::kind::Sfixed32),
            Ty::Sfixed64 => quote!(::protolite::kind::Sfixed64),
            Ty::Bool => quote!(::protolite::kind::Bool),
            Ty::Float => quote!(::protolite::kind::Float),
            Ty::Double => quote!(::protolite::kind::Double),
            Ty::String => quote!(::protolite::kind::Str),
            Ty::Bytes => quote!(::protolite::kind::Bytes),
            Ty::Enumeration(path) => quote!(::protolite::kind::Enum<#path>),
            Ty::Message => quote!(::protolite::kind::Msg),
        }
    }

    /// Whether repeated fields of this type are packed by default.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Ty::String | Ty::Bytes | Ty::Message)
    }

    /// Whether the type may be a map key.
    pub fn is_map_key(&self) -> bool {
        !matches!(
            self,
            Ty::Float | Ty::Double | Ty::Bytes | Ty::Enumeration(_) | Ty::Message
        )
    }
}

#[derive(Clone, Debug)]
pub enum Kind {
    /// Implicit presence.
    Single(Ty),
    /// `Option<T>`.
    Optional(Ty),
    /// Repeated, and whether the encoding is packed.
    Repeated(Ty, bool),
    /// Map with key and value types.
    Map(Ty, Ty),
    /// `Option<E>` where `E` derives `Oneof`.
    Oneof,
    /// Raw bytes of unknown fields.
    Unknown,
}

#[derive(Clone)]
pub struct Field {
    pub kind: Kind,
    pub tags: Vec<u32>,
    /// Proto field name.
    pub name: String,
    /// JSON field name.
    pub json_name: String,
}

impl Field {
    pub fn new(ident: &str, attrs: Vec<Attribute>) -> Result<Self, Error> {
        let attrs = protolite_attrs(attrs);

        let mut tag = None;
        let mut tags = None;
        let mut ty = None;
        let mut label = None;
        let mut map = None;
        let mut packed = None;
        let mut name = None;
        let mut json_name = None;
        let mut unknown_attrs = Vec::new();

        for attr in &attrs {
            if let Some(x) = tag_attr(attr)? {
                set_option(&mut tag, x, "duplicate tag attributes")?;
            } else if let Some(x) = tags_attr(attr)? {
                set_option(&mut tags, x, "duplicate tags attributes")?;
            } else if let Some(x) = ty_attr(attr)? {
                set_option(&mut ty, x, "duplicate type attributes")?;
            } else if let Some(x) = label_attr(attr) {
                set_option(&mut label, x, "duplicate label attributes")?;
            } else if let Some(x) = str_attr(attr, "map")? {
                set_option(&mut map, x, "duplicate map attributes")?;
            } else if let Some(x) = bool_attr(attr, "packed")? {
                set_option(&mut packed, x, "duplicate packed attributes")?;
            } else if let Some(x) = str_attr(attr, "name")? {
                set_option(&mut name, x, "duplicate name attributes")?;
            } else if let Some(x) = str_attr(attr, "json_name")? {
                set_option(&mut json_name, x, "duplicate json_name attributes")?;
            } else {
                unknown_attrs.push(attr);
            }
        }

        match unknown_attrs.len() {
            0 => (),
            1 => bail!("unknown attribute: {:?}", unknown_attrs[0]),
            _ => bail!("unknown attributes: {:?}", unknown_attrs),
        }

        let kind = match (label, map) {
            (Some(Label::Unknown), None) => Kind::Unknown,
            (Some(Label::Oneof), None) => Kind::Oneof,
            (None, Some(map)) => {
                let Some((key, value)) = map.split_once(',') else {
                    bail!("invalid map attribute, expected \"<key>, <value>\": {:?}", map);
                };
                let (key, value) = (Ty::from_str(key)?, Ty::from_str(value)?);
                if !key.is_map_key() {
                    bail!("invalid map key type: {:?}", key);
                }
                Kind::Map(key, value)
            }
            (Some(_), Some(_)) => bail!("map fields can not have a label"),
            (label, None) => {
                let Some(ty) = ty else {
                    bail!("missing type attribute");
                };
                match label {
                    None => Kind::Single(ty),
                    Some(Label::Optional) => Kind::Optional(ty),
                    Some(_) => {
                        let packed = packed.unwrap_or_else(|| ty.is_numeric());
                        if packed && !ty.is_numeric() {
                            bail!("{:?} fields can not be packed", ty);
                        }
                        Kind::Repeated(ty, packed)
                    }
                }
            }
        };

        if packed.is_some() && !matches!(kind, Kind::Repeated(..)) {
            bail!("packed attribute is only valid on repeated fields");
        }

        let tags = match kind {
            Kind::Unknown => {
                if tag.is_some() || tags.is_some() {
                    bail!("unknown fields field must not have tags");
                }
                Vec::new()
            }
            Kind::Oneof => {
                if tag.is_some() {
                    bail!("tag attribute must not be set in oneof.")
                }
                match tags {
                    Some(tags) => tags,
                    None => bail!("missing tags attribute in oneof"),
                }
            }
            _ => match tag {
                Some(tag) => vec![tag],
                None => bail!("missing tag attribute"),
            },
        };

        let name = name.unwrap_or_else(|| ident.trim_start_matches("r#").to_owned());
        let json_name = json_name.unwrap_or_else(|| to_json_name(&name));
        Ok(Self {
            kind,
            tags,
            name,
            json_name,
        })
    }
}

#[derive(Clone)]
pub struct OneofVariant {
    pub tag: u32,
    pub ty: Ty,
    pub name: String,
    pub json_name: String,
}

impl OneofVariant {
    pub fn new(ident: &str, attrs: Vec<Attribute>) -> Result<Self, Error> {
        let attrs = protolite_attrs(attrs);

        let mut tag = None;
        let mut ty = None;
        let mut name = None;
        let mut json_name = None;
        let mut unknown_attrs = Vec::new();

        for attr in &attrs {
            if let Some(x) = tag_attr(attr)? {
                set_option(&mut tag, x, "duplicate tag attributes")?;
            } else if let Some(x) = ty_attr(attr)? {
                set_option(&mut ty, x, "duplicate type attributes")?;
            } else if let Some(x) = str_attr(attr, "name")? {
                set_option(&mut name, x, "duplicate name attributes")?;
            } else if let Some(x) = str_attr(attr, "json_name")? {
                set_option(&mut json_name, x, "duplicate json_name attributes")?;
            } else {
                unknown_attrs.push(attr);
            }
        }

        match unknown_attrs.len() {
            0 => (),
            1 => bail!("unknown attribute: {:?}", unknown_attrs[0]),
            _ => bail!("unknown attributes: {:?}", unknown_attrs),
        }

        let tag = match tag {
            Some(tag) => tag,
            None => bail!("missing tag attribute"),
        };
        let ty = match ty {
            Some(ty) => ty,
            None => bail!("missing type attribute"),
        };
        let name = name.unwrap_or_else(|| to_snake_case(ident));
        let json_name = json_name.unwrap_or_else(|| to_json_name(&name));
        Ok(Self {
            tag,
            ty,
            name,
            json_name,
        })
    }
}

#[derive(Clone)]
pub struct EnumVariant {
    pub name: String,
    pub aliases: Vec<String>,
}

impl EnumVariant {
    pub fn new(ident: &str, attrs: Vec<Attribute>) -> Result<Self, Error> {
        let attrs = protolite_attrs(attrs);

        let mut name = None;
        let mut aliases = Vec::new();
        let mut unknown_attrs = Vec::new();

        for attr in &attrs {
            if let Some(x) = str_attr(attr, "name")? {
                set_option(&mut name, x, "duplicate name attributes")?;
            } else if let Some(x) = str_attr(attr, "alias")? {
                aliases.push(x);
            } else {
                unknown_attrs.push(attr);
            }
        }

        match unknown_attrs.len() {
            0 => (),
            1 => bail!("unknown attribute: {:?}", unknown_attrs[0]),
            _ => bail!("unknown attributes: {:?}", unknown_attrs),
        }

        let name = name.unwrap_or_else(|| to_snake_case(ident).to_ascii_uppercase());
        Ok(Self { name, aliases })
    }
}

/// Message-level attributes.
pub struct MessageAttrs {
    pub name: Option<String>,
}

impl MessageAttrs {
    pub fn new(attrs: Vec<Attribute>) -> Result<Self, Error> {
        let mut name = None;
        for attr in &protolite_attrs(attrs) {
            match str_attr(attr, "name")? {
                Some(x) => set_option(&mut name, x, "duplicate name attributes")?,
                None => bail!("unknown attribute: {:?}", attr),
            }
        }
        Ok(Self { name })
    }
}

enum Label {
    Optional,
    Repeated,
    Oneof,
    Unknown,
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Label::Optional => "optional",
            Label::Repeated => "repeated",
            Label::Oneof => "oneof",
            Label::Unknown => "unknown",
        })
    }
}

pub(super) fn tag_attr(attr: &Meta) -> Result<Option<u32>, Error> {
    if !attr.path().is_ident("tag") {
        return Ok(None);
    }
    match *attr {
        Meta::List(ref meta_list) => {
            if meta_list.nested.len() == 1 {
                if let NestedMeta::Lit(Lit::Int(ref lit)) = meta_list.nested[0] {
                    return Ok(Some(lit.base10_parse()?));
                }
            }
            bail!("invalid tag attribute: {:?}", attr);
        }
        Meta::NameValue(ref meta_name_value) => match meta_name_value.lit {
            Lit::Str(ref lit) => lit.value().parse::<u32>().map_err(Error::from).map(Option::Some),
            Lit::Int(ref lit) => Ok(Some(lit.base10_parse()?)),
            _ => bail!("invalid tag attribute: {:?}", attr),
        },
        _ => bail!("invalid tag attribute: {:?}", attr),
    }
}

fn tags_attr(attr: &Meta) -> Result<Option<Vec<u32>>, Error> {
    if !attr.path().is_ident("tags") {
        return Ok(None);
    }
    match *attr {
        Meta::List(ref meta_list) => {
            let mut tags = Vec::with_capacity(meta_list.nested.len());
            for item in &meta_list.nested {
                if let NestedMeta::Lit(Lit::Int(ref lit)) = *item {
                    tags.push(lit.base10_parse()?);
                } else {
                    bail!("invalid tag attribute: {:?}", attr);
                }
            }
            Ok(Some(tags))
        }
        Meta::NameValue(MetaNameValue {
            lit: Lit::Str(ref lit), ..
        }) => lit
            .value()
            .split(',')
            .map(|s| s.trim().parse::<u32>().map_err(Error::from))
            .collect::<Result<Vec<u32>, _>>()
            .map(Some),
        _ => bail!("invalid tag attribute: {:?}", attr),
    }
}

/// A scalar type word such as `int32`, or `enumeration = "Path"`.
fn ty_attr(attr: &Meta) -> Result<Option<Ty>, Error> {
    match *attr {
        Meta::Path(ref path) => Ok(SCALARS
            .iter()
            .find(|(name, _)| path.is_ident(name))
            .map(|(_, ty)| ty.clone())),
        Meta::NameValue(MetaNameValue {
            ref path,
            lit: Lit::Str(ref lit),
            ..
        }) if path.is_ident("enumeration") => Ok(Some(Ty::Enumeration(lit.parse()?))),
        _ => Ok(None),
    }
}

fn label_attr(attr: &Meta) -> Option<Label> {
    let Meta::Path(ref path) = *attr else { return None };

    if path.is_ident("repeated") {
        Some(Label::Repeated)
    } else if path.is_ident("optional") {
        Some(Label::Optional)
    } else if path.is_ident("oneof") {
        Some(Label::Oneof)
    } else if path.is_ident("unknown") {
        Some(Label::Unknown)
    } else {
        None
    }
}

fn str_attr(attr: &Meta, key: &str) -> Result<Option<String>, Error> {
    if !attr.path().is_ident(key) {
        return Ok(None);
    }
    match *attr {
        Meta::NameValue(MetaNameValue {
            lit: Lit::Str(ref lit), ..
        }) => Ok(Some(lit.value())),
        _ => bail!("invalid {} attribute: {:?}", key, attr),
    }
}

fn bool_attr(attr: &Meta, key: &str) -> Result<Option<bool>, Error> {
    if !attr.path().is_ident(key) {
        return Ok(None);
    }
    match *attr {
        Meta::Path(..) => Ok(Some(true)),
        Meta::NameValue(MetaNameValue {
            lit: Lit::Bool(ref lit), ..
        }) => Ok(Some(lit.value)),
        Meta::NameValue(MetaNameValue {
            lit: Lit::Str(ref lit), ..
        }) => Ok(Some(lit.value().parse()?)),
        _ => bail!("invalid {} attribute: {:?}", key, attr),
    }
}

pub fn set_option<T: fmt::Debug>(option: &mut Option<T>, value: T, message: &str) -> Result<(), Error> {
    if let Some(ref existing) = *option {
        bail!("{}: {:?} and {:?}", message, existing, value);
    }
    *option = Some(value);
    Ok(())
}

/// Get the items belonging to the 'protolite' list attribute, e.g. `#[protolite(foo, bar="baz")]`.
fn protolite_attrs(attrs: Vec<Attribute>) -> Vec<Meta> {
    attrs
        .iter()
        .flat_map(Attribute::parse_meta)
        .flat_map(|meta| match meta {
            Meta::List(MetaList { path, nested, .. }) => {
                if path.is_ident("protolite") {
                    nested.into_iter().collect()
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        })
        .flat_map(|attr| -> Result<_, _> {
            match attr {
                NestedMeta::Meta(attr) => Ok(attr),
                NestedMeta::Lit(lit) => bail!("invalid protolite attribute: {:?}", lit),
            }
        })
        .collect()
}

/// The JSON name protoc derives from a field name: underscores are dropped
/// and the letter after each is capitalized.
pub fn to_json_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut capitalize = false;
    for c in name.chars() {
        if c == '_' {
            capitalize = true;
        } else if capitalize {
            out.push(c.to_ascii_uppercase());
            capitalize = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// `StringValue` to `string_value`.
pub fn to_snake_case(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    for (i, c) in ident.trim_start_matches("r#").chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
