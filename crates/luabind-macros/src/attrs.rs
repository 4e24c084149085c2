//! Attribute parsing for the luabind macros.

use syn::{
    Attribute, Expr, ExprArray, Ident, Lit, LitStr, Token,
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
};

/// Parsed `#[lua_function(...)]` arguments.
#[derive(Debug, Default)]
pub struct FunctionAttrs {
    /// Script-facing names; empty means the Rust name.
    pub names: Vec<String>,
    pub main_thread: bool,
    pub unsafe_tables: bool,
    /// Method of a generic source, taking its target after `&self`.
    pub generic: bool,
}

impl Parse for FunctionAttrs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut result = Self::default();

        let items = Punctuated::<FunctionAttrItem, Token![,]>::parse_terminated(input)?;
        for item in items {
            match item {
                FunctionAttrItem::Flag(ident) => match ident.to_string().as_str() {
                    "main_thread" => result.main_thread = true,
                    "unsafe_tables" => result.unsafe_tables = true,
                    "generic" => result.generic = true,
                    other => {
                        return Err(syn::Error::new(
                            ident.span(),
                            format!("unknown lua_function attribute: {other}"),
                        ));
                    }
                },
                FunctionAttrItem::NameValue { name, value } => match name.to_string().as_str() {
                    "name" => result.names.push(string_literal(&value)?),
                    "names" => {
                        let Expr::Array(ExprArray { elems, .. }) = &value else {
                            return Err(syn::Error::new(
                                name.span(),
                                "names must be an array of string literals",
                            ));
                        };
                        for elem in elems {
                            result.names.push(string_literal(elem)?);
                        }
                    }
                    other => {
                        return Err(syn::Error::new(
                            name.span(),
                            format!("unknown lua_function attribute: {other}"),
                        ));
                    }
                },
            }
        }

        Ok(result)
    }
}

fn string_literal(expr: &Expr) -> syn::Result<String> {
    match expr {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Str(s) => Ok(s.value()),
            other => Err(syn::Error::new(other.span(), "expected a string literal")),
        },
        other => Err(syn::Error::new_spanned(other, "expected a string literal")),
    }
}

enum FunctionAttrItem {
    Flag(Ident),
    NameValue { name: Ident, value: Expr },
}

impl Parse for FunctionAttrItem {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let ident: Ident = input.parse()?;

        if input.peek(Token![=]) {
            let _: Token![=] = input.parse()?;
            let value: Expr = input.parse()?;
            Ok(FunctionAttrItem::NameValue { name: ident, value })
        } else {
            Ok(FunctionAttrItem::Flag(ident))
        }
    }
}

/// Parsed `#[lua(...)]` attributes on an enum variant.
#[derive(Debug, Default)]
pub struct VariantAttrs {
    pub name: Option<String>,
}

impl VariantAttrs {
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = Self::default();

        for attr in attrs {
            if !attr.path().is_ident("lua") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    result.name = Some(value.value());
                    Ok(())
                } else {
                    Err(meta.error(format!(
                        "unknown lua variant attribute: {}",
                        meta.path
                            .get_ident()
                            .map(|i| i.to_string())
                            .unwrap_or_default()
                    )))
                }
            })?;
        }

        Ok(result)
    }
}
