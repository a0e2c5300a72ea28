use crate::macros::error::derived_names;
use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, ItemFn, ItemStruct, Lit, LitStr, Meta, MetaNameValue, Token};

#[derive(Default)]
struct ModelArgs {
    rename_all: Option<LitStr>,
    deny_unknown_fields: Option<bool>,
}

/// Expands `#[api_model]`.
pub fn expand_api_model(args: TokenStream, input: ItemStruct) -> TokenStream {
    let args = match parse_model_args(args) {
        Ok(args) => args,
        Err(err) => return err.to_compile_error(),
    };
    let serde = match SerdeAttrs::collect(&input.attrs) {
        Ok(serde) => serde,
        Err(err) => return err.to_compile_error(),
    };

    let derives = derived_names(&input.attrs);
    let mut missing = Vec::new();
    if !derives.contains("Debug") {
        missing.push(quote! { Debug });
    }
    if !derives.contains("Serialize") {
        missing.push(quote! { ::serde::Serialize });
    }
    if !derives.contains("Deserialize") {
        missing.push(quote! { ::serde::Deserialize });
    }
    let derive_attr =
        if missing.is_empty() { quote! {} } else { quote! { #[derive(#(#missing),*)] } };

    let schema_attr = if derives.contains("ToSchema") {
        quote! {}
    } else {
        quote! { #[cfg_attr(feature = "server", derive(::utoipa::ToSchema))] }
    };

    let rename_attr = match (&args.rename_all, &serde.rename_all) {
        (Some(wanted), Some(existing)) if wanted.value() != existing.value() => {
            return syn::Error::new_spanned(
                existing,
                "conflicting serde rename_all; drop it or match api_model(rename_all = ...)",
            )
            .to_compile_error();
        }
        (Some(wanted), None) => quote! { #[serde(rename_all = #wanted)] },
        _ => quote! {},
    };

    let deny = args.deny_unknown_fields.unwrap_or(true);
    if serde.deny_unknown_fields && !deny {
        return syn::Error::new_spanned(
            &input.ident,
            "deny_unknown_fields is already set through serde; remove it before disabling",
        )
        .to_compile_error();
    }
    let deny_attr = if deny && !serde.deny_unknown_fields {
        quote! { #[serde(deny_unknown_fields)] }
    } else {
        quote! {}
    };

    quote! {
        #derive_attr
        #schema_attr
        #rename_attr
        #deny_attr
        #input
    }
}

/// Expands `#[api_handler]`.
pub fn expand_api_handler(args: TokenStream, input: ItemFn) -> TokenStream {
    let ItemFn { attrs, vis, sig, block } = input;

    quote! {
        #(#attrs)*
        #[allow(clippy::unused_async)]
        #[cfg_attr(feature = "server", ::utoipa::path(#args))]
        #vis #sig #block
    }
}

fn parse_model_args(args: TokenStream) -> Result<ModelArgs, syn::Error> {
    let metas = Punctuated::<Meta, Token![,]>::parse_terminated.parse2(args)?;
    let mut parsed = ModelArgs::default();

    for meta in metas {
        let Meta::NameValue(nv) = meta else {
            return Err(syn::Error::new_spanned(
                meta,
                "expected name-value arguments like `rename_all = \"camelCase\"`",
            ));
        };

        if nv.path.is_ident("rename_all") {
            if parsed.rename_all.is_some() {
                return Err(syn::Error::new_spanned(&nv, "duplicate argument"));
            }
            parsed.rename_all = Some(string_literal(&nv)?);
        } else if nv.path.is_ident("deny_unknown_fields") {
            if parsed.deny_unknown_fields.is_some() {
                return Err(syn::Error::new_spanned(&nv, "duplicate argument"));
            }
            parsed.deny_unknown_fields = Some(bool_literal(&nv)?);
        } else {
            return Err(syn::Error::new_spanned(
                &nv.path,
                "unsupported argument; expected rename_all or deny_unknown_fields",
            ));
        }
    }

    Ok(parsed)
}

fn string_literal(nv: &MetaNameValue) -> Result<LitStr, syn::Error> {
    match &nv.value {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Str(s) => Ok(s.clone()),
            _ => Err(syn::Error::new_spanned(&nv.value, "expected a string literal")),
        },
        _ => Err(syn::Error::new_spanned(&nv.value, "expected a string literal")),
    }
}

fn bool_literal(nv: &MetaNameValue) -> Result<bool, syn::Error> {
    match &nv.value {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Bool(b) => Ok(b.value),
            _ => Err(syn::Error::new_spanned(&nv.value, "expected a boolean literal")),
        },
        _ => Err(syn::Error::new_spanned(&nv.value, "expected a boolean literal")),
    }
}

#[derive(Default)]
struct SerdeAttrs {
    rename_all: Option<LitStr>,
    deny_unknown_fields: bool,
}

impl SerdeAttrs {
    fn collect(attrs: &[Attribute]) -> Result<Self, syn::Error> {
        let mut found = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename_all") {
                    found.rename_all = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("deny_unknown_fields") {
                    found.deny_unknown_fields = true;
                } else if meta.input.peek(Token![=]) {
                    let _: Expr = meta.value()?.parse()?;
                }
                Ok(())
            })?;
        }
        Ok(found)
    }
}
