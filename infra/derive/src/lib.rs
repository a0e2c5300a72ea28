#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros used across the Quill workspace: error enums, feature slices,
//! API models/handlers and the runtime entry point.
//!
//! The examples below are `ignore`d because a proc-macro crate cannot use its own macros;
//! the consuming crates' tests exercise them.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, ItemStruct, parse_macro_input};

/// Bootstraps `async fn main` on a Tokio runtime built from a `quill_runtime` profile.
///
/// Accepted profiles: `high_performance`, `memory_efficient`, `default` (or no argument).
///
/// ```rust,ignore
/// #[quill_runtime::main(high_performance)]
/// async fn main() -> anyhow::Result<()> {
///     Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn main(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::runtime::expand_main(args.into(), input).into()
}

/// Declares an API data model (request or response body).
///
/// * Adds `Debug`, `Serialize` and `Deserialize` unless already derived.
/// * Adds `utoipa::ToSchema` when the consuming crate's `server` feature is enabled.
/// * Applies `#[serde(deny_unknown_fields)]` unless `deny_unknown_fields = false`.
/// * Applies `#[serde(rename_all = "...")]` only when `rename_all` is given; field names are
///   kept as written otherwise.
///
/// ```rust,ignore
/// #[api_model(rename_all = "camelCase")]
/// pub struct HealthResponse {
///     pub status: &'static str,
/// }
/// ```
#[proc_macro_attribute]
pub fn api_model(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::api::expand_api_model(attr.into(), input).into()
}

/// Wraps an Axum handler and registers it with `utoipa::path` when the consuming crate's
/// `server` feature is enabled. Arguments are forwarded verbatim to `utoipa::path`.
///
/// ```rust,ignore
/// #[api_handler(get, path = "/health", responses((status = OK, body = HealthResponse)))]
/// pub async fn health_handler() -> Json<HealthResponse> { .. }
/// ```
#[proc_macro_attribute]
pub fn api_handler(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::api::expand_api_handler(args.into(), input).into()
}

/// Turns an enum into the crate's error type.
///
/// * Derives `Debug` and `thiserror::Error` unless already derived.
/// * Generates `<Name>Ext` with `.context(...)` for `Result<T, Name>` and for
///   `Result<T, Source>` of every variant that wraps a source error.
/// * Generates `From<Source>` for variants with a `source`/`#[source]`/`#[from]` field.
/// * Generates `From<&'static str>` and `From<String>` when an `Internal` variant exists.
/// * Provides a private `format_context` helper for `#[error(...)]` strings.
///
/// Every variant must use named fields; variants with a source must also carry
/// `context: Option<Cow<'static, str>>`.
///
/// ```rust,ignore
/// #[quill_error]
/// pub enum MediaError {
///     #[error("HTTP error{}: {source}", format_context(.context))]
///     Http { source: reqwest::Error, context: Option<Cow<'static, str>> },
///     #[error("Internal media error{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
/// ```
#[proc_macro_attribute]
pub fn quill_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}

/// Turns a struct into a feature slice handle: an `Arc`-wrapped `<Name>Inner`, `Deref` to the
/// inner state and a `quill_kernel::domain::registry::FeatureSlice` impl.
///
/// ```rust,ignore
/// #[quill_derive::quill_slice]
/// pub struct Blog {
///     pub repository: BlogRepository,
/// }
///
/// let slice = Blog::new(BlogInner { repository });
/// ```
#[proc_macro_attribute]
pub fn quill_slice(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as ItemStruct);
    macros::slice::expand_slice(input).into()
}
