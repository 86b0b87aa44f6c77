//! Derive macro for automatic binary serialization.
//!
//! Generates `Encode` and `Decode` implementations for structs and enums.
//! Fields are serialized in declaration order with the deterministic
//! little-endian format defined in `types::encoding`, making derived types
//! directly hashable.
//!
//! # Supported Shapes
//!
//! - Named structs: `struct AppParams { approval_program: Bytes, ... }`
//! - Tuple structs: `struct AppId(u64)`
//! - Enums with unit, tuple, or struct variants, tagged with a `u8`
//!   discriminant assigned in declaration order starting at 0
//!
//! Unions are not supported.

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DataEnum, DeriveInput, Fields, parse_macro_input};

/// Derives `Encode` and `Decode` for a type.
///
/// ```ignore
/// use ledger_derive::BinaryCodec;
///
/// #[derive(BinaryCodec)]
/// pub struct StateSchema {
///     pub num_uints: u64,
///     pub num_byte_slices: u64,
/// }
/// ```
pub fn derive_binary_codec(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let (encode_body, decode_body) = match &input.data {
        Data::Struct(data_struct) => struct_bodies(&data_struct.fields),
        Data::Enum(data_enum) => enum_bodies(data_enum),
        Data::Union(_) => {
            return syn::Error::new_spanned(&input, "BinaryCodec derive does not support unions")
                .to_compile_error()
                .into();
        }
    };

    TokenStream::from(quote! {
        impl #impl_generics crate::types::encoding::Encode for #name #ty_generics #where_clause {
            fn encode<S: crate::types::encoding::EncodeSink>(&self, out: &mut S) {
                #encode_body
            }
        }

        impl #impl_generics crate::types::encoding::Decode for #name #ty_generics #where_clause {
            fn decode(
                input: &mut &[u8],
            ) -> ::std::result::Result<Self, crate::types::encoding::DecodeError> {
                #decode_body
            }
        }
    })
}

/// Builds encode/decode bodies for a struct of any field shape.
fn struct_bodies(fields: &Fields) -> (proc_macro2::TokenStream, proc_macro2::TokenStream) {
    match fields {
        Fields::Named(fields) => {
            let names: Vec<_> = fields.named.iter().map(|f| &f.ident).collect();
            let encodes = names.iter().map(|name| {
                quote! { crate::types::encoding::Encode::encode(&self.#name, out); }
            });
            let decodes = names.iter().map(|name| {
                quote! { #name: crate::types::encoding::Decode::decode(input)?, }
            });
            (
                quote! { #(#encodes)* },
                quote! { Ok(Self { #(#decodes)* }) },
            )
        }
        Fields::Unnamed(fields) => {
            let indices: Vec<_> = (0..fields.unnamed.len()).map(syn::Index::from).collect();
            let encodes = indices.iter().map(|idx| {
                quote! { crate::types::encoding::Encode::encode(&self.#idx, out); }
            });
            let decodes = indices.iter().map(|_| {
                quote! { crate::types::encoding::Decode::decode(input)?, }
            });
            (quote! { #(#encodes)* }, quote! { Ok(Self(#(#decodes)*)) })
        }
        Fields::Unit => (quote! {}, quote! { Ok(Self) }),
    }
}

/// Builds encode/decode bodies for an enum.
///
/// The wire form is a `u8` discriminant (declaration order, starting at 0)
/// followed by the variant's fields in declaration order.
fn enum_bodies(data_enum: &DataEnum) -> (proc_macro2::TokenStream, proc_macro2::TokenStream) {
    let mut encode_arms = Vec::with_capacity(data_enum.variants.len());
    let mut decode_arms = Vec::with_capacity(data_enum.variants.len());

    for (idx, variant) in data_enum.variants.iter().enumerate() {
        let tag = idx as u8;
        let variant_name = &variant.ident;

        match &variant.fields {
            Fields::Unit => {
                encode_arms.push(quote! {
                    Self::#variant_name => {
                        crate::types::encoding::Encode::encode(&#tag, out);
                    }
                });
                decode_arms.push(quote! {
                    #tag => Ok(Self::#variant_name),
                });
            }
            Fields::Unnamed(fields) => {
                let bindings: Vec<_> = (0..fields.unnamed.len())
                    .map(|i| quote::format_ident!("f{}", i))
                    .collect();
                let encodes = bindings.iter().map(|b| {
                    quote! { crate::types::encoding::Encode::encode(#b, out); }
                });
                let decodes = bindings.iter().map(|_| {
                    quote! { crate::types::encoding::Decode::decode(input)?, }
                });
                encode_arms.push(quote! {
                    Self::#variant_name(#(#bindings),*) => {
                        crate::types::encoding::Encode::encode(&#tag, out);
                        #(#encodes)*
                    }
                });
                decode_arms.push(quote! {
                    #tag => Ok(Self::#variant_name(#(#decodes)*)),
                });
            }
            Fields::Named(fields) => {
                let bindings: Vec<_> = fields.named.iter().map(|f| &f.ident).collect();
                let encodes = bindings.iter().map(|b| {
                    quote! { crate::types::encoding::Encode::encode(#b, out); }
                });
                let decodes = bindings.iter().map(|b| {
                    quote! { #b: crate::types::encoding::Decode::decode(input)?, }
                });
                encode_arms.push(quote! {
                    Self::#variant_name { #(#bindings),* } => {
                        crate::types::encoding::Encode::encode(&#tag, out);
                        #(#encodes)*
                    }
                });
                decode_arms.push(quote! {
                    #tag => Ok(Self::#variant_name { #(#decodes)* }),
                });
            }
        }
    }

    (
        quote! {
            match self {
                #(#encode_arms)*
            }
        },
        quote! {
            let tag: u8 = crate::types::encoding::Decode::decode(input)?;
            match tag {
                #(#decode_arms)*
                _ => Err(crate::types::encoding::DecodeError::InvalidValue),
            }
        },
    )
}
