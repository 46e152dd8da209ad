//! `#[derive(ProtoJson)]` code generation.

use itertools::Itertools;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Generics, Ident};

use crate::field::{Field, Kind, OneofVariant};

/// `"name" | "jsonName"`, or just `"name"` when both are equal.
fn key_pattern(name: &str, json_name: &str) -> TokenStream {
    let keys = if name == json_name {
        vec![quote!(#name)]
    } else {
        vec![quote!(#name), quote!(#json_name)]
    };
    let keys = Itertools::intersperse(keys.into_iter(), quote!(|));
    quote!(#(#keys)*)
}

pub fn message(ident: &Ident, generics: &Generics, fields: &[(TokenStream, Field)]) -> TokenStream {
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let marshal = fields.iter().filter_map(|(field_ident, field)| {
        let ident = quote!(self.#field_ident);
        let (name, json_name) = (&field.name, &field.json_name);
        let (is_set, write) = match &field.kind {
            Kind::Single(ty) => {
                let c = ty.codec();
                (
                    quote!(::protolite::json::field::single_is_set::<#c, _>(&#ident)),
                    quote!(::protolite::json::field::write_single::<#c, _>(#name, &#ident, s)),
                )
            }
            Kind::Optional(ty) => {
                let c = ty.codec();
                (
                    quote!(#ident.is_some()),
                    quote!(::protolite::json::field::write_optional::<#c, _>(#name, &#ident, s)),
                )
            }
            Kind::Repeated(ty, _) => {
                let c = ty.codec();
                (
                    quote!(!::protolite::RepeatedField::is_empty(&#ident)),
                    quote!(::protolite::json::field::write_repeated::<#c, _, _>(#name, &#ident, s)),
                )
            }
            Kind::Map(key, value) => {
                let (kc, vc) = (key.codec(), value.codec());
                (
                    quote!(!::protolite::MapField::is_empty(&#ident)),
                    quote!(::protolite::json::field::write_map::<#kc, #vc, _>(#name, &#ident, s)),
                )
            }
            Kind::Oneof => {
                return Some(quote! {
                    if let Some(oneof) = &#ident {
                        ::protolite::json::OneofProtoJson::marshal_protojson_fields(oneof, s, &mut wrote_field);
                    }
                })
            }
            Kind::Unknown => return None,
        };
        Some(quote! {
            if #is_set || s.has_field(#name) {
                s.write_more_if(&mut wrote_field);
                s.write_object_field_name(#name, #json_name);
                #write;
            }
        })
    });

    let unmarshal = fields.iter().filter_map(|(field_ident, field)| {
        let ident = quote!(self.#field_ident);
        let name = &field.name;
        let read = match &field.kind {
            Kind::Single(ty) => {
                let c = ty.codec();
                quote!(::protolite::json::field::read_single::<#c, _>(#name, &mut #ident, s))
            }
            Kind::Optional(ty) => {
                let c = ty.codec();
                quote!(::protolite::json::field::read_optional::<#c, _>(#name, &mut #ident, s))
            }
            Kind::Repeated(ty, _) => {
                let c = ty.codec();
                quote!(::protolite::json::field::read_repeated::<#c, _, _>(#name, &mut #ident, s))
            }
            Kind::Map(key, value) => {
                let (kc, vc) = (key.codec(), value.codec());
                quote!(::protolite::json::field::read_map::<#kc, #vc, _>(#name, &mut #ident, s))
            }
            Kind::Oneof | Kind::Unknown => return None,
        };
        let keys = key_pattern(name, &field.json_name);
        Some(quote!(#keys => #read,))
    });

    let oneofs = fields
        .iter()
        .filter(|(_, field)| matches!(field.kind, Kind::Oneof))
        .map(|(field_ident, _)| {
            quote! {
                if ::protolite::json::OneofProtoJson::unmarshal_protojson_field(&mut self.#field_ident, &key, s) {
                    continue;
                }
            }
        });

    quote! {
        impl #impl_generics ::protolite::json::MarshalProtoJson for #ident #ty_generics #where_clause {
            #[allow(unused_mut, unused_variables)]
            fn marshal_protojson(&self, s: &mut ::protolite::json::MarshalState) {
                s.write_object_start();
                let mut wrote_field = false;
                #(#marshal)*
                s.write_object_end();
            }
        }

        impl #impl_generics ::protolite::json::UnmarshalProtoJson for #ident #ty_generics #where_clause {
            fn unmarshal_protojson(&mut self, s: &mut ::protolite::json::UnmarshalState<'_>) {
                if !s.enter_object() {
                    return;
                }
                while let Some(key) = s.next_key() {
                    match key.as_str() {
                        #(#unmarshal)*
                        _ => {
                            #(#oneofs)*
                            s.skip_unknown_field(&key);
                        }
                    }
                }
            }
        }
    }
}

pub fn oneof(ident: &Ident, generics: &Generics, variants: &[(Ident, OneofVariant)]) -> TokenStream {
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let marshal = variants.iter().map(|(variant_ident, variant)| {
        let (name, json_name, c) = (&variant.name, &variant.json_name, variant.ty.codec());
        quote!(#ident::#variant_ident(value) => {
            s.write_more_if(wrote_field);
            s.write_object_field_name(#name, #json_name);
            ::protolite::json::field::write_oneof::<#c, _>(#name, value, s);
        })
    });

    let unmarshal = variants.iter().map(|(variant_ident, variant)| {
        let (name, c) = (&variant.name, variant.ty.codec());
        let keys = key_pattern(name, &variant.json_name);
        quote!(#keys => {
            if let Some(value) = ::protolite::json::field::read_oneof::<#c, _>(#name, s) {
                *this = Some(#ident::#variant_ident(value));
            }
            true
        })
    });

    quote! {
        impl #impl_generics ::protolite::json::OneofProtoJson for #ident #ty_generics #where_clause {
            fn marshal_protojson_fields(&self, s: &mut ::protolite::json::MarshalState, wrote_field: &mut bool) {
                match self {
                    #(#marshal)*
                }
            }

            fn unmarshal_protojson_field(
                this: &mut Option<Self>,
                key: &str,
                s: &mut ::protolite::json::UnmarshalState<'_>,
            ) -> bool {
                match key {
                    #(#unmarshal)*
                    _ => false,
                }
            }
        }
    }
}
