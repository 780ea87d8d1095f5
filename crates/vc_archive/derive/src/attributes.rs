//! Parsing of `#[archive(...)]` attributes.

use proc_macro2::Span;
use syn::{Attribute, LitInt, LitStr};

use crate::ARCHIVE_ATTRIBUTE_NAME;

// -----------------------------------------------------------------------------
// Type attributes

#[derive(Default)]
pub(crate) struct TypeAttributes {
    /// `#[archive(versioned)]`
    pub versioned: Option<Span>,
}

impl TypeAttributes {
    pub fn parse_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut this = Self::default();
        for attr in archive_attrs(attrs) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("versioned") {
                    this.versioned = Some(meta.path.require_ident()?.span());
                    Ok(())
                } else {
                    Err(meta.error("expected `versioned`"))
                }
            })?;
        }
        Ok(this)
    }
}

// -----------------------------------------------------------------------------
// Field attributes

#[derive(Default)]
pub(crate) struct FieldAttributes {
    /// `#[archive(rename = "name")]`
    pub rename: Option<LitStr>,
    /// `#[archive(skip)]`
    pub skip: bool,
    /// `#[archive(since = N)]`
    pub since: Option<LitInt>,
}

impl FieldAttributes {
    pub fn parse_attrs(attrs: &[Attribute], versioned: bool) -> syn::Result<Self> {
        let mut this = Self::default();
        for attr in archive_attrs(attrs) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let name: LitStr = meta.value()?.parse()?;
                    check_name(&name)?;
                    this.rename = Some(name);
                } else if meta.path.is_ident("skip") {
                    this.skip = true;
                } else if meta.path.is_ident("since") {
                    let since: LitInt = meta.value()?.parse()?;
                    since.base10_parse::<u32>()?;
                    if !versioned {
                        return Err(syn::Error::new(
                            since.span(),
                            "`since` needs `#[archive(versioned)]` on the type",
                        ));
                    }
                    this.since = Some(since);
                } else {
                    return Err(meta.error("expected `rename`, `skip` or `since`"));
                }
                Ok(())
            })?;
        }
        if this.skip && (this.rename.is_some() || this.since.is_some()) {
            let span = this
                .rename
                .as_ref()
                .map(LitStr::span)
                .or_else(|| this.since.as_ref().map(LitInt::span))
                .unwrap_or_else(Span::call_site);
            return Err(syn::Error::new(span, "a skipped field is never written"));
        }
        Ok(this)
    }
}

// -----------------------------------------------------------------------------
// Variant attributes

#[derive(Default)]
pub(crate) struct VariantAttributes {
    /// `#[archive(rename = "name")]`
    pub rename: Option<LitStr>,
}

impl VariantAttributes {
    pub fn parse_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut this = Self::default();
        for attr in archive_attrs(attrs) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let name: LitStr = meta.value()?.parse()?;
                    this.rename = Some(name);
                    Ok(())
                } else {
                    Err(meta.error("expected `rename`"))
                }
            })?;
        }
        Ok(this)
    }
}

// -----------------------------------------------------------------------------
// Helpers

fn archive_attrs(attrs: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident(ARCHIVE_ATTRIBUTE_NAME))
}

// Tree formats use names as keys and XML element names.
fn check_name(name: &LitStr) -> syn::Result<()> {
    let value = name.value();
    let mut chars = value.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(syn::Error::new(name.span(), "not a valid node name"))
    }
}
