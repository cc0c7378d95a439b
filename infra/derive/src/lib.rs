#![allow(unreachable_pub)]

//! # Macros
//!
//! Procedural macros for the engine workspace. Only the error macro lives here today.
//!
//! Consumers depend on `evo-derive` and on `thiserror`, because the expansion refers to
//! `::thiserror::Error` by absolute path.

mod error;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro for crate-level error enums.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]` unless already present.
/// * **Context Support**: Generates a companion `<Name>Ext` trait adding `.context(..)` to
///   `Result<T, Name>` and to `Result<T, Source>` for every source-carrying variant.
/// * **Conversions**: `From<Source>` for variants with a `source` (or `#[source]`/`#[from]`) field.
/// * **Internal Fallback**: `From<&'static str>` and `From<String>` when an `Internal`
///   variant exists.
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum** with **named-field** variants.
/// 2. Context fields are named `context` and typed `Option<Cow<'static, str>>`.
/// 3. A variant with a source field must also have a context field.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[evo_derive::evo_error]
/// pub enum StoreError {
///     #[error("I/O failure{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn read() -> Result<Vec<u8>, StoreError> {
///     std::fs::read("profile.evosnap").context("Reading snapshot")
/// }
/// ```
#[proc_macro_attribute]
pub fn evo_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    error::expand(input).into()
}
