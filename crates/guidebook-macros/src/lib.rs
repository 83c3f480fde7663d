#![deny(unsafe_code)]

//! Procedural macros for Guidebook.
//!
//! - `#[derive(DocumentMeta)]` implements `guidebook_core::DocumentMeta` for a
//!   document header type, generating `validate()` from `#[validate(...)]`
//!   field annotations.

extern crate proc_macro;

mod document_meta;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derive `guidebook_core::DocumentMeta` with field-level constraints.
///
/// The type must also implement `serde::Deserialize`. Constraints run after
/// the header has been deserialized; `Option` fields are only checked when
/// present.
///
/// Supported attributes:
/// - `#[validate(non_empty)]`: string/collection must not be empty
/// - `#[validate(range(min = N, max = M))]`: numeric value in [N, M]
/// - `#[validate(min_len = N)]`: minimum length for strings/collections
/// - `#[validate(max_len = N)]`: maximum length for strings/collections
///
/// # Example
///
/// ```ignore
/// use guidebook_macros::DocumentMeta;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, DocumentMeta)]
/// struct GuideMeta {
///     #[validate(non_empty, max_len = 80)]
///     title: String,
///     #[validate(range(min = 1, max = 5))]
///     weight: Option<u8>,
/// }
/// ```
#[proc_macro_derive(DocumentMeta, attributes(validate))]
pub fn derive_document_meta(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    document_meta::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
