//! Implementation of `#[lua_function]`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{FnArg, GenericParam, ItemFn, Visibility, parse_macro_input};

use crate::attrs::FunctionAttrs;

pub fn lua_function_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attrs = parse_macro_input!(attr as FunctionAttrs);
    let input = parse_macro_input!(item as ItemFn);

    match lua_function_inner(&attrs, &input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn lua_function_inner(attrs: &FunctionAttrs, input: &ItemFn) -> syn::Result<TokenStream2> {
    let sig = &input.sig;
    let fn_name = &sig.ident;
    let fn_vis = &input.vis;
    let decl_fn_name = format_ident!("{}__lua", fn_name);

    if let Some(param) = sig
        .generics
        .params
        .iter()
        .find(|p| !matches!(p, GenericParam::Lifetime(_)))
    {
        return Err(syn::Error::new_spanned(
            param,
            "#[lua_function] methods cannot have type or const parameters",
        ));
    }
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            "#[lua_function] methods cannot be async; return a MethodResult instead",
        ));
    }

    let receiver = sig.inputs.iter().find_map(|arg| match arg {
        FnArg::Receiver(receiver) => Some(receiver),
        FnArg::Typed(_) => None,
    });
    if let Some(receiver) = receiver {
        if receiver.reference.is_none() || receiver.mutability.is_some() {
            return Err(syn::Error::new_spanned(
                receiver,
                "#[lua_function] methods take `&self`",
            ));
        }
    }

    let constructor = match (receiver.is_some(), attrs.generic) {
        (true, false) => quote! {
            ::luabind_core::MethodDecl::method(stringify!(#fn_name), Self::#fn_name)
        },
        (true, true) => quote! {
            ::luabind_core::MethodDecl::generic(stringify!(#fn_name), Self::#fn_name)
        },
        (false, true) => {
            return Err(syn::Error::new_spanned(
                sig,
                "generic #[lua_function] methods take the source as `&self` and the target next",
            ));
        }
        (false, false) => {
            // Declared so the registry can report it; associated functions
            // are never bound.
            let args: Vec<_> = (0..sig.inputs.len())
                .map(|i| format_ident!("__arg{}", i))
                .collect();
            let tys = sig.inputs.iter().filter_map(|arg| match arg {
                FnArg::Typed(pat) => Some(&pat.ty),
                FnArg::Receiver(_) => None,
            });
            quote! {
                ::luabind_core::MethodDecl::method(
                    stringify!(#fn_name),
                    |_: &Self, #(#args: #tys),*| Self::#fn_name(#(#args),*),
                )
            }
        }
    };

    let mut modifiers = vec![quote! { ::luabind_core::Modifiers::FINAL }];
    if matches!(fn_vis, Visibility::Public(_)) {
        modifiers.push(quote! { ::luabind_core::Modifiers::PUBLIC });
    }
    if receiver.is_none() {
        modifiers.push(quote! { ::luabind_core::Modifiers::STATIC });
    }

    let names = (!attrs.names.is_empty()).then(|| {
        let names = &attrs.names;
        quote! { .names(&[#(#names),*]) }
    });
    let main_thread = attrs.main_thread.then(|| quote! { .main_thread() });
    let unsafe_tables = attrs.unsafe_tables.then(|| quote! { .unsafe_tables() });

    Ok(quote! {
        #input

        #[doc(hidden)]
        #[allow(non_snake_case)]
        #fn_vis fn #decl_fn_name() -> ::luabind_core::MethodDecl {
            #constructor
                .with_modifiers(#(#modifiers)|*)
                #names
                #main_thread
                #unsafe_tables
        }
    })
}
