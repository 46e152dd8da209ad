// The `quote!` macro requires deep recursion.
#![recursion_limit = "4096"]

extern crate proc_macro;

use anyhow::{bail, Error};
use itertools::Itertools;
use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{Data, DataEnum, DataStruct, DeriveInput, Expr, Fields, FieldsNamed, FieldsUnnamed, Ident, Index, Variant};

mod field;
mod json;
use crate::field::{EnumVariant, Field, Kind, MessageAttrs, OneofVariant};

/// Parse the fields of a message struct, sorted by their lowest tag.
fn message_fields(ident: &Ident, data: Data) -> Result<Vec<(TokenStream2, Field)>, Error> {
    let variant_data = match data {
        Data::Struct(variant_data) => variant_data,
        Data::Enum(..) => bail!("Message can not be derived for an enum"),
        Data::Union(..) => bail!("Message can not be derived for a union"),
    };

    let fields = match variant_data {
        DataStruct {
            fields: Fields::Named(FieldsNamed { named: fields, .. }),
            ..
        } => fields.into_iter().collect(),
        DataStruct {
            fields: Fields::Unnamed(FieldsUnnamed { unnamed: fields, .. }),
            ..
        } => fields.into_iter().collect(),
        DataStruct {
            fields: Fields::Unit, ..
        } => Vec::new(),
    };

    let mut fields = fields
        .into_iter()
        .enumerate()
        .map(|(i, field)| {
            let (field_ident, name) = match field.ident {
                Some(x) => (quote!(#x), x.to_string()),
                None => {
                    let index = Index {
                        index: i as u32,
                        span: Span::call_site(),
                    };
                    (quote!(#index), i.to_string())
                }
            };
            match Field::new(&name, field.attrs) {
                Ok(field) => Ok((field_ident, field)),
                Err(err) => Err(err.context(format!("invalid message field {}.{}", ident, name))),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Sort the fields by tag number so that fields will be encoded in tag order.
    // Oneofs sort at their lowest tag regardless of the set alternative, and
    // unknown fields sort last.
    fields.sort_by_key(|(_, field)| field.tags.iter().copied().min().unwrap_or(u32::MAX));

    let mut tags = fields.iter().flat_map(|(_, field)| &field.tags).collect::<Vec<_>>();
    let num_tags = tags.len();
    tags.sort_unstable();
    tags.dedup();
    if tags.len() != num_tags {
        bail!("message {} has fields with duplicate tags", ident);
    }
    if let Some(&&tag) = tags.iter().find(|&&&tag| tag == 0 || tag > 536_870_911) {
        bail!("message {} has field with invalid tag {}", ident, tag);
    }
    if fields.iter().filter(|(_, field)| matches!(field.kind, Kind::Unknown)).count() > 1 {
        bail!("message {} has more than one unknown fields field", ident);
    }

    Ok(fields)
}

fn try_message(input: TokenStream) -> Result<TokenStream2, Error> {
    let input: DeriveInput = syn::parse(input)?;

    let ident = input.ident;
    let attrs = MessageAttrs::new(input.attrs)?;

    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = message_fields(&ident, input.data)?;

    let size = fields.iter().map(|(field_ident, field)| {
        let ident = quote!(self.#field_ident);
        let tag = field.tags.first().copied().unwrap_or_default();
        match &field.kind {
            Kind::Single(ty) => {
                let c = ty.codec();
                quote!(::protolite::field::single::encoded_len::<#c, _>(#tag, &#ident))
            }
            Kind::Optional(ty) => {
                let c = ty.codec();
                quote!(::protolite::field::optional::encoded_len::<#c, _>(#tag, &#ident))
            }
            Kind::Repeated(ty, packed) => {
                let c = ty.codec();
                quote!(::protolite::field::repeated::encoded_len::<#c, _, _>(#tag, &#ident, #packed))
            }
            Kind::Map(key, value) => {
                let (kc, vc) = (key.codec(), value.codec());
                quote!(::protolite::field::map::encoded_len::<#kc, #vc, _>(#tag, &#ident))
            }
            Kind::Oneof => quote!(::protolite::field::oneof::encoded_len(&#ident)),
            Kind::Unknown => quote!(#ident.len()),
        }
    });

    // The writer prepends, so fields go last to first and the unknown bytes,
    // which belong at the end, go before everything else.
    let write = fields.iter().rev().map(|(field_ident, field)| {
        let ident = quote!(self.#field_ident);
        let tag = field.tags.first().copied().unwrap_or_default();
        match &field.kind {
            Kind::Single(ty) => {
                let c = ty.codec();
                quote!(::protolite::field::single::encode::<#c, _>(#tag, &#ident, w)?;)
            }
            Kind::Optional(ty) => {
                let c = ty.codec();
                quote!(::protolite::field::optional::encode::<#c, _>(#tag, &#ident, w)?;)
            }
            Kind::Repeated(ty, packed) => {
                let c = ty.codec();
                quote!(::protolite::field::repeated::encode::<#c, _, _>(#tag, &#ident, #packed, w)?;)
            }
            Kind::Map(key, value) => {
                let (kc, vc) = (key.codec(), value.codec());
                quote!(::protolite::field::map::encode::<#kc, #vc, _>(#tag, &#ident, w)?;)
            }
            Kind::Oneof => quote!(::protolite::field::oneof::encode(&#ident, w)?;),
            Kind::Unknown => quote!(w.write(&#ident)?;),
        }
    });

    let merge = fields.iter().filter_map(|(field_ident, field)| {
        let ident = quote!(self.#field_ident);
        let merge = match &field.kind {
            Kind::Single(ty) => {
                let c = ty.codec();
                quote!(::protolite::field::single::merge::<#c, _>(tag, wire_type, &mut #ident, r)?)
            }
            Kind::Optional(ty) => {
                let c = ty.codec();
                quote!(::protolite::field::optional::merge::<#c, _>(tag, wire_type, &mut #ident, r)?)
            }
            Kind::Repeated(ty, _) => {
                let c = ty.codec();
                quote!(::protolite::field::repeated::merge::<#c, _, _>(tag, wire_type, &mut #ident, r)?)
            }
            Kind::Map(key, value) => {
                let (kc, vc) = (key.codec(), value.codec());
                quote!(::protolite::field::map::merge::<#kc, #vc, _>(tag, wire_type, &mut #ident, r)?)
            }
            Kind::Oneof => quote!(::protolite::Oneof::merge(&mut #ident, tag, wire_type, r)?),
            Kind::Unknown => return None,
        };

        let tags = field.tags.iter().map(|&tag| quote!(#tag));
        let tags = Itertools::intersperse(tags, quote!(|));

        Some(quote!(#(#tags)* => #merge,))
    });

    let equal = fields.iter().map(|(field_ident, field)| {
        let (a, b) = (quote!(self.#field_ident), quote!(other.#field_ident));
        match &field.kind {
            Kind::Single(ty) => {
                let c = ty.codec();
                quote!(::protolite::field::single::equal::<#c, _>(&#a, &#b))
            }
            Kind::Optional(field::Ty::Message) => {
                quote!(::protolite::field::message::equal::<::protolite::kind::Msg, _>(&#a, &#b))
            }
            Kind::Optional(ty) => {
                let c = ty.codec();
                quote!(::protolite::field::optional::equal::<#c, _>(&#a, &#b))
            }
            Kind::Repeated(ty, _) => {
                let c = ty.codec();
                quote!(::protolite::field::repeated::equal::<#c, _, _>(&#a, &#b))
            }
            Kind::Map(key, value) => {
                let (kc, vc) = (key.codec(), value.codec());
                quote!(::protolite::field::map::equal::<#kc, #vc, _>(&#a, &#b))
            }
            Kind::Oneof => quote!(::protolite::field::oneof::equal(&#a, &#b)),
            Kind::Unknown => quote!(#a == #b),
        }
    });

    let unknown_fields = fields
        .iter()
        .find(|(_, field)| matches!(field.kind, Kind::Unknown))
        .map(|(field_ident, _)| {
            quote! {
                fn unknown_fields_mut(&mut self) -> Option<&mut Vec<u8>> {
                    Some(&mut self.#field_ident)
                }
            }
        });

    let name = attrs.name.map(|name| {
        quote! {
            impl #impl_generics ::protolite::Name for #ident #ty_generics #where_clause {
                const FULL_NAME: &'static str = #name;
            }
        }
    });

    let expanded = quote! {
        impl #impl_generics ::protolite::Message for #ident #ty_generics #where_clause {
            fn size_vt(&self) -> usize {
                0 #(+ #size)*
            }

            fn marshal_to_sized_buffer_vt(&self, w: &mut ::protolite::ByteWriter) -> Result<(), ::protolite::EncodeError> {
                #(#write)*
                Ok(())
            }

            #[allow(unused_variables, unreachable_code)]
            fn merge_field(
                &mut self,
                tag: u32,
                wire_type: ::protolite::WireType,
                r: &mut ::protolite::ByteReader,
            ) -> Result<bool, ::protolite::DecodeError> {
                match tag {
                    #(#merge)*
                    _ => return Ok(false),
                }
                Ok(true)
            }

            #unknown_fields

            fn equal_vt(&self, other: &Self) -> bool {
                true #(&& #equal)*
            }
        }

        #name
    };

    Ok(expanded)
}

fn expand(result: Result<TokenStream2, Error>) -> TokenStream {
    match result {
        Ok(tokens) => tokens.into(),
        Err(err) => syn::Error::new(Span::call_site(), format!("{:#}", err))
            .to_compile_error()
            .into(),
    }
}

#[proc_macro_derive(Message, attributes(protolite))]
pub fn message(input: TokenStream) -> TokenStream {
    expand(try_message(input))
}

fn try_enumeration(input: TokenStream) -> Result<TokenStream2, Error> {
    let input: DeriveInput = syn::parse(input)?;
    let ident = input.ident;

    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let punctuated_variants = match input.data {
        Data::Enum(DataEnum { variants, .. }) => variants,
        Data::Struct(_) => bail!("Enumeration can not be derived for a struct"),
        Data::Union(..) => bail!("Enumeration can not be derived for a union"),
    };

    // Map the variants into 'fields'.
    let mut variants: Vec<(Ident, Expr, EnumVariant)> = Vec::new();
    for Variant {
        attrs,
        ident: variant_ident,
        fields,
        discriminant,
        ..
    } in punctuated_variants
    {
        match fields {
            Fields::Unit => (),
            Fields::Named(_) | Fields::Unnamed(_) => {
                bail!("Enumeration variants may not have fields")
            }
        }

        let variant = EnumVariant::new(&variant_ident.to_string(), attrs)
            .map_err(|err| err.context(format!("invalid enumeration variant {}.{}", ident, variant_ident)))?;
        match discriminant {
            Some((_, expr)) => variants.push((variant_ident, expr, variant)),
            None => bail!("Enumeration variants must have a discriminant"),
        }
    }

    if variants.is_empty() {
        bail!("Enumeration must have at least one variant");
    }

    let number_to_name = variants.iter().map(|(_, value, variant)| {
        let name = &variant.name;
        quote!((#value, #name))
    });

    let name_to_number = variants.iter().flat_map(|(_, value, variant)| {
        std::iter::once(&variant.name)
            .chain(&variant.aliases)
            .map(move |name| quote!((#name, #value)))
    });

    let from_i32 = variants
        .iter()
        .map(|(variant_ident, value, _)| quote!(v if v == (#value) => Some(#ident::#variant_ident),));

    let as_i32 = variants
        .iter()
        .map(|(variant_ident, value, _)| quote!(#ident::#variant_ident => #value,));

    let as_str_name = variants.iter().map(|(variant_ident, _, variant)| {
        let name = &variant.name;
        quote!(#ident::#variant_ident => #name,)
    });

    let expanded = quote! {
        impl #impl_generics ::protolite::Enumeration for #ident #ty_generics #where_clause {
            const NUMBER_TO_NAME: &'static [(i32, &'static str)] = &[#(#number_to_name),*];
            const NAME_TO_NUMBER: &'static [(&'static str, i32)] = &[#(#name_to_number),*];

            fn from_i32(value: i32) -> Option<Self> {
                match value {
                    #(#from_i32)*
                    _ => None,
                }
            }

            fn as_i32(&self) -> i32 {
                match self {
                    #(#as_i32)*
                }
            }

            fn as_str_name(&self) -> &'static str {
                match self {
                    #(#as_str_name)*
                }
            }
        }

        impl #impl_generics ::core::convert::From<#ident #ty_generics> for i32 #where_clause {
            fn from(value: #ident #ty_generics) -> i32 {
                ::protolite::Enumeration::as_i32(&value)
            }
        }
    };

    Ok(expanded)
}

#[proc_macro_derive(Enumeration, attributes(protolite))]
pub fn enumeration(input: TokenStream) -> TokenStream {
    expand(try_enumeration(input))
}

/// Parse the variants of a oneof enum.
fn oneof_variants(ident: &Ident, data: Data) -> Result<Vec<(Ident, OneofVariant)>, Error> {
    let variants = match data {
        Data::Enum(DataEnum { variants, .. }) => variants,
        Data::Struct(..) => bail!("Oneof can not be derived for a struct"),
        Data::Union(..) => bail!("Oneof can not be derived for a union"),
    };

    // Map the variants
    let mut oneof_variants: Vec<(Ident, OneofVariant)> = Vec::new();
    for Variant {
        attrs,
        ident: variant_ident,
        fields: variant_fields,
        ..
    } in variants
    {
        let variant_fields = match variant_fields {
            Fields::Unit => Punctuated::new(),
            Fields::Named(FieldsNamed { named: fields, .. })
            | Fields::Unnamed(FieldsUnnamed { unnamed: fields, .. }) => fields,
        };
        if variant_fields.len() != 1 {
            bail!("Oneof enum variants must have a single field");
        }

        match OneofVariant::new(&variant_ident.to_string(), attrs) {
            Ok(variant) => oneof_variants.push((variant_ident, variant)),
            Err(err) => bail!("invalid oneof variant {}.{}: {}", ident, variant_ident, err),
        }
    }

    let mut tags = oneof_variants.iter().map(|(_, v)| v.tag).collect::<Vec<_>>();
    tags.sort_unstable();
    tags.dedup();
    if tags.len() != oneof_variants.len() {
        bail!("invalid oneof {}: variants have duplicate tags", ident);
    }

    Ok(oneof_variants)
}

fn try_oneof(input: TokenStream) -> Result<TokenStream2, Error> {
    let input: DeriveInput = syn::parse(input)?;

    let ident = input.ident;

    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let oneof_variants = oneof_variants(&ident, input.data)?;

    let size = oneof_variants.iter().map(|(variant_ident, variant)| {
        let (tag, c) = (variant.tag, variant.ty.codec());
        quote!(#ident::#variant_ident(value) => ::protolite::field::oneof::variant_encoded_len::<#c, _>(#tag, value),)
    });

    let write = oneof_variants.iter().map(|(variant_ident, variant)| {
        let (tag, c) = (variant.tag, variant.ty.codec());
        quote!(#ident::#variant_ident(value) => ::protolite::field::oneof::variant_encode::<#c, _>(#tag, value, w),)
    });

    let merge = oneof_variants.iter().map(|(variant_ident, variant)| {
        let (tag, c) = (variant.tag, variant.ty.codec());
        quote!(#tag => {
            if let Some(#ident::#variant_ident(value)) = this {
                return ::protolite::field::oneof::variant_merge::<#c, _>(tag, wire_type, value, r);
            }
            let mut value = Default::default();
            ::protolite::field::oneof::variant_merge::<#c, _>(tag, wire_type, &mut value, r)?;
            *this = Some(#ident::#variant_ident(value));
            Ok(())
        })
    });

    let equal = oneof_variants.iter().map(|(variant_ident, variant)| {
        let c = variant.ty.codec();
        quote!((#ident::#variant_ident(a), #ident::#variant_ident(b)) => ::protolite::field::single::equal::<#c, _>(a, b),)
    });

    let expanded = quote! {
        impl #impl_generics ::protolite::Oneof for #ident #ty_generics #where_clause {
            fn encoded_len(&self) -> usize {
                match self {
                    #(#size)*
                }
            }

            fn encode(&self, w: &mut ::protolite::ByteWriter) -> Result<(), ::protolite::EncodeError> {
                match self {
                    #(#write)*
                }
            }

            fn merge(
                this: &mut Option<Self>,
                tag: u32,
                wire_type: ::protolite::WireType,
                r: &mut ::protolite::ByteReader,
            ) -> Result<(), ::protolite::DecodeError> {
                match tag {
                    #(#merge)*
                    _ => Ok(()),
                }
            }

            #[allow(unreachable_patterns)]
            fn equal_vt(&self, other: &Self) -> bool {
                match (self, other) {
                    #(#equal)*
                    _ => false,
                }
            }
        }
    };

    Ok(expanded)
}

#[proc_macro_derive(Oneof, attributes(protolite))]
pub fn oneof(input: TokenStream) -> TokenStream {
    expand(try_oneof(input))
}

fn try_proto_json(input: TokenStream) -> Result<TokenStream2, Error> {
    let input: DeriveInput = syn::parse(input)?;
    let ident = input.ident;

    match input.data {
        Data::Struct(..) => {
            let fields = message_fields(&ident, input.data)?;
            Ok(json::message(&ident, &input.generics, &fields))
        }
        Data::Enum(..) => {
            let variants = oneof_variants(&ident, input.data)?;
            Ok(json::oneof(&ident, &input.generics, &variants))
        }
        Data::Union(..) => bail!("ProtoJson can not be derived for a union"),
    }
}

/// Protobuf JSON for a message struct or a oneof enum. Enumerations need no
/// derive; their names come from `Enumeration`.
#[proc_macro_derive(ProtoJson, attributes(protolite))]
pub fn proto_json(input: TokenStream) -> TokenStream {
    expand(try_proto_json(input))
}
