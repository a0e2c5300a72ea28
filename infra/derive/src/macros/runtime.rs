use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{Error, Expr, ItemFn, Meta, ReturnType, Token, Type};

/// Expands `#[quill_runtime::main]`.
///
/// Accepts an optional profile identifier followed by optional overrides, e.g.
/// `#[quill_runtime::main(high_performance, worker_threads = 2)]`.
#[must_use]
pub fn expand_main(args: TokenStream, input: ItemFn) -> TokenStream {
    if input.sig.asyncness.is_none() {
        return Error::new_spanned(
            &input.sig.ident,
            "#[quill_runtime::main] can only be used on async functions",
        )
        .to_compile_error();
    }

    if !returns_result(&input.sig.output) {
        return Error::new_spanned(
            &input.sig.output,
            "#[quill_runtime::main] requires a Result return type",
        )
        .to_compile_error();
    }

    let config = match runtime_config(args) {
        Ok(config) => config,
        Err(err) => return err.to_compile_error(),
    };

    let ItemFn { attrs, vis, sig, block } = input;
    let name = &sig.ident;
    let output = &sig.output;

    quote! {
        #(#attrs)*
        #vis fn #name() #output {
            let config = #config;
            let rt = ::quill_runtime::build_runtime_with_config(&config)?;
            rt.block_on(async #block)
        }
    }
}

fn runtime_config(args: TokenStream) -> Result<TokenStream, Error> {
    let metas = Punctuated::<Meta, Token![,]>::parse_terminated.parse2(args)?;
    let mut profile = quote! { ::quill_runtime::RuntimeConfig::default() };
    let mut overrides = Vec::new();

    for (idx, meta) in metas.into_iter().enumerate() {
        match meta {
            Meta::Path(path) if idx == 0 => {
                let Some(ident) = path.get_ident() else {
                    return Err(Error::new_spanned(path, "expected a runtime profile name"));
                };
                profile = match ident.to_string().as_str() {
                    "high_performance" => {
                        quote! { ::quill_runtime::RuntimeConfig::high_performance() }
                    }
                    "memory_efficient" => {
                        quote! { ::quill_runtime::RuntimeConfig::memory_efficient() }
                    }
                    "default" => quote! { ::quill_runtime::RuntimeConfig::default() },
                    _ => {
                        return Err(Error::new_spanned(
                            ident,
                            "unknown runtime profile; use high_performance, memory_efficient or default",
                        ));
                    }
                };
            }
            Meta::NameValue(nv) if nv.path.is_ident("worker_threads") => {
                let value: &Expr = &nv.value;
                overrides.push(quote! { .with_worker_threads(#value) });
            }
            Meta::NameValue(nv) if nv.path.is_ident("thread_name") => {
                let value: &Expr = &nv.value;
                overrides.push(quote! { .with_thread_name(#value) });
            }
            other => {
                return Err(Error::new_spanned(
                    other,
                    "expected a profile followed by `worker_threads = ..` or `thread_name = ..`",
                ));
            }
        }
    }

    Ok(quote! { #profile #(#overrides)* })
}

fn returns_result(output: &ReturnType) -> bool {
    let ReturnType::Type(_, ty) = output else {
        return false;
    };
    let Type::Path(path) = &**ty else {
        return false;
    };
    path.path.segments.last().is_some_and(|seg| seg.ident == "Result")
}
