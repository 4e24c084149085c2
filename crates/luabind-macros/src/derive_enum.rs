//! Implementation of `#[derive(LuaEnum)]`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

use crate::attrs::VariantAttrs;

pub fn derive_lua_enum_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_lua_enum_inner(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_lua_enum_inner(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;

    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            name,
            "LuaEnum can only be derived for enums",
        ));
    };
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "LuaEnum cannot be derived for generic enums",
        ));
    }

    let mut variants = Vec::with_capacity(data.variants.len());
    let mut names = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "LuaEnum variants cannot carry data",
            ));
        }
        let attrs = VariantAttrs::from_attrs(&variant.attrs)?;
        names.push(attrs.name.unwrap_or_else(|| variant.ident.to_string()));
        variants.push(&variant.ident);
    }
    let ordinals = 0..variants.len();

    Ok(quote! {
        impl ::luabind_core::LuaEnum for #name {
            const VARIANTS: &'static [Self] = &[#(Self::#variants),*];
            const NAMES: &'static [&'static str] = &[#(#names),*];

            fn ordinal(self) -> usize {
                match self {
                    #(Self::#variants => #ordinals,)*
                }
            }
        }

        impl ::luabind_core::HostParam for #name {
            fn host_type() -> ::luabind_core::HostType {
                ::luabind_core::HostType::Enum(<Self as ::luabind_core::LuaEnum>::info())
            }

            fn from_arg(
                arg: ::luabind_core::Arg,
            ) -> ::core::result::Result<Self, ::luabind_core::ConversionError> {
                ::luabind_core::enum_from_arg::<Self>(arg)
            }
        }
    })
}
