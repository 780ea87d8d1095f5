//! Absolute paths to `core` items.
//!
//! Generated code must not depend on what the caller has in scope, so every
//! prelude item it names is spelled out in full.

use proc_macro2::TokenStream;
use quote::quote;

#[inline]
pub fn result() -> TokenStream {
    quote!(::core::result::Result)
}

#[inline]
pub fn ok() -> TokenStream {
    quote!(::core::result::Result::Ok)
}

#[inline]
pub fn err() -> TokenStream {
    quote!(::core::result::Result::Err)
}

#[inline]
pub fn default_value() -> TokenStream {
    quote!(::core::default::Default::default())
}
