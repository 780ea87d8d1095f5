//! See [`Archive`].
#![allow(clippy::std_instead_of_core, reason = "proc-macro lib")]
#![allow(clippy::std_instead_of_alloc, reason = "proc-macro lib")]

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

static ARCHIVE_ATTRIBUTE_NAME: &str = "archive";

// -----------------------------------------------------------------------------
// Modules

mod attributes;
mod expand;

/// Get the access path to the `vc_archive` crate, `::vc_serial::archive`
/// for crates that only depend on the facade.
fn vc_archive() -> syn::Path {
    vc_macro_utils::Manifest::shared(|manifest| manifest.get_crate_path("vc_archive"))
}

// -----------------------------------------------------------------------------
// Macros

/// Implements `Save` and `Load` for a struct or enum.
///
/// ## Type attributes
///
/// - `#[archive(versioned)]`: read and write the class version of the type
///   before its fields.
///
/// ## Field attributes
///
/// - `#[archive(rename = "name")]`: the node name of the field. Unnamed
///   fields with a rename are written as named nodes.
/// - `#[archive(skip)]`: leave the field out. It loads as `Default`.
/// - `#[archive(since = N)]`: only written and read when the class version
///   is at least `N`, otherwise loaded as `Default`. Needs `versioned`.
///
/// ## Variant attributes
///
/// - `#[archive(rename = "name")]`: the tag written by text archives.
///
/// Binary archives tag enum values with the variant index, so reordering
/// variants breaks binary streams.
#[proc_macro_derive(Archive, attributes(archive))]
pub fn derive_archive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    match expand::derive_archive(&ast, vc_archive()) {
        Ok(tokens) => tokens.into(),
        Err(error) => error.into_compile_error().into(),
    }
}
