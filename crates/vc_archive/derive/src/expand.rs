//! Code generation for `#[derive(Archive)]`.

use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Generics, Ident, Index, LitStr, Member, Path};

use crate::attributes::{FieldAttributes, TypeAttributes, VariantAttributes};

// -----------------------------------------------------------------------------
// Field model

struct FieldInfo {
    member: Member,
    binding: Ident,
    /// `None` for unnamed fields without a rename.
    name: Option<LitStr>,
    attrs: FieldAttributes,
}

fn collect_fields(fields: &Fields, versioned: bool) -> syn::Result<Vec<FieldInfo>> {
    fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let attrs = FieldAttributes::parse_attrs(&field.attrs, versioned)?;
            let (member, name) = match &field.ident {
                Some(ident) => {
                    let text = ident.unraw().to_string();
                    let name = LitStr::new(&text, ident.span());
                    (Member::Named(ident.clone()), Some(name))
                }
                None => (Member::Unnamed(Index::from(index)), None),
            };
            Ok(FieldInfo {
                member,
                binding: format_ident!("__field{}", index),
                name: attrs.rename.clone().or(name),
                attrs,
            })
        })
        .collect()
}

fn has_since(fields: &[FieldInfo]) -> bool {
    fields.iter().any(|f| f.attrs.since.is_some())
}

// -----------------------------------------------------------------------------
// Statements

struct Context {
    vc: Path,
    versioned: bool,
}

impl Context {
    fn since(&self, field: &FieldInfo) -> syn::Result<Option<u32>> {
        field
            .attrs
            .since
            .as_ref()
            .map(|lit| lit.base10_parse::<u32>())
            .transpose()
    }

    /// Writes one field given an expression of type `&FieldTy`.
    fn save_field(&self, field: &FieldInfo, value: TokenStream) -> syn::Result<TokenStream> {
        if field.attrs.skip {
            return Ok(TokenStream::new());
        }
        let write = match &field.name {
            Some(name) => quote! { __archive.nvp(#name, #value)?; },
            None => quote! { __archive.save(#value)?; },
        };
        Ok(match self.since(field)? {
            Some(since) => quote! {
                if __version >= #since {
                    #write
                }
            },
            None => write,
        })
    }

    /// An expression reading one field.
    fn load_field(&self, field: &FieldInfo) -> syn::Result<TokenStream> {
        let default = vc_macro_utils::full_path::default_value();
        if field.attrs.skip {
            return Ok(default);
        }
        let read = match &field.name {
            Some(name) => quote! { __archive.nvp(#name)? },
            None => quote! { __archive.load()? },
        };
        Ok(match self.since(field)? {
            Some(since) => quote! {
                if __version >= #since { #read } else { #default }
            },
            None => read,
        })
    }

    fn version_stmt(&self, needs_value: bool) -> TokenStream {
        match (self.versioned, needs_value) {
            (false, _) => TokenStream::new(),
            (true, true) => quote! { let __version = __archive.class_version::<Self>()?; },
            (true, false) => quote! { __archive.class_version::<Self>()?; },
        }
    }

    /// `Self { a: .., b: .. }`, `Self(.., ..)` or `Self`, with `path` in
    /// place of `Self`.
    fn construct(
        &self,
        path: TokenStream,
        fields: &Fields,
        infos: &[FieldInfo],
    ) -> syn::Result<TokenStream> {
        let values = infos
            .iter()
            .map(|f| self.load_field(f))
            .collect::<syn::Result<Vec<_>>>()?;
        Ok(match fields {
            Fields::Named(_) => {
                let members = infos.iter().map(|f| &f.member);
                quote! { #path { #(#members: #values,)* } }
            }
            Fields::Unnamed(_) => quote! { #path( #(#values,)* ) },
            Fields::Unit => path,
        })
    }
}

// Binds every written field of a variant, ignoring skipped ones.
fn variant_pattern(path: TokenStream, fields: &Fields, infos: &[FieldInfo]) -> TokenStream {
    let bindings = infos.iter().map(|f| {
        if f.attrs.skip {
            quote!(_)
        } else {
            let binding = &f.binding;
            quote!(#binding)
        }
    });
    match fields {
        Fields::Named(_) => {
            let members = infos.iter().map(|f| &f.member);
            quote! { #path { #(#members: #bindings,)* } }
        }
        Fields::Unnamed(_) => quote! { #path( #(#bindings,)* ) },
        Fields::Unit => path,
    }
}

// -----------------------------------------------------------------------------
// Bounds

fn bounded(generics: &Generics, bound: &TokenStream, versioned: bool) -> Generics {
    let mut generics = generics.clone();
    let params: Vec<Ident> = generics.type_params().map(|p| p.ident.clone()).collect();
    let where_clause = generics.make_where_clause();
    for param in params {
        where_clause.predicates.push(syn::parse_quote!(#param: #bound));
        if versioned {
            where_clause.predicates.push(syn::parse_quote!(#param: 'static));
        }
    }
    generics
}

// -----------------------------------------------------------------------------
// Derive

pub(crate) fn derive_archive(ast: &DeriveInput, vc: Path) -> syn::Result<TokenStream> {
    let attrs = TypeAttributes::parse_attrs(&ast.attrs)?;
    let cx = Context {
        vc,
        versioned: attrs.versioned.is_some(),
    };

    let (save_body, load_body) = match &ast.data {
        Data::Struct(data) => expand_struct(&cx, &data.fields)?,
        Data::Enum(data) => expand_enum(&cx, data)?,
        Data::Union(_) => {
            return Err(syn::Error::new(
                Span::call_site(),
                "`Archive` cannot be derived for unions",
            ));
        }
    };

    let vc = &cx.vc;
    let ident = &ast.ident;
    let result_ = vc_macro_utils::full_path::result();

    let save_generics = bounded(&ast.generics, &quote!(#vc::Save), cx.versioned);
    let (impl_generics, ty_generics, where_clause) = save_generics.split_for_impl();
    let save_impl = quote! {
        impl #impl_generics #vc::Save for #ident #ty_generics #where_clause {
            fn save(&self, __archive: &mut #vc::OutputArchive<'_>) -> #result_<(), #vc::Error> {
                #save_body
            }
        }
    };

    let load_generics = bounded(&ast.generics, &quote!(#vc::Load), cx.versioned);
    let (impl_generics, ty_generics, where_clause) = load_generics.split_for_impl();
    let load_impl = quote! {
        impl #impl_generics #vc::Load for #ident #ty_generics #where_clause {
            fn load(__archive: &mut #vc::InputArchive<'_>) -> #result_<Self, #vc::Error> {
                #load_body
            }
        }
    };

    Ok(quote! {
        const _: () = {
            #save_impl

            #load_impl
        };
    })
}

fn expand_struct(cx: &Context, fields: &Fields) -> syn::Result<(TokenStream, TokenStream)> {
    let ok_ = vc_macro_utils::full_path::ok();
    let infos = collect_fields(fields, cx.versioned)?;
    let version = cx.version_stmt(has_since(&infos));

    let writes = infos
        .iter()
        .map(|f| {
            let member = &f.member;
            cx.save_field(f, quote!(&self.#member))
        })
        .collect::<syn::Result<Vec<_>>>()?;
    let save = quote! {
        #version
        #(#writes)*
        #ok_(())
    };

    let value = cx.construct(quote!(Self), fields, &infos)?;
    let load = quote! {
        #version
        #ok_(#value)
    };
    Ok((save, load))
}

fn expand_enum(cx: &Context, data: &syn::DataEnum) -> syn::Result<(TokenStream, TokenStream)> {
    let vc = &cx.vc;
    let ok_ = vc_macro_utils::full_path::ok();
    let err_ = vc_macro_utils::full_path::err();

    let mut names = Vec::with_capacity(data.variants.len());
    let mut save_arms = Vec::with_capacity(data.variants.len());
    let mut load_arms = Vec::with_capacity(data.variants.len());
    let mut any_since = false;

    for (index, variant) in data.variants.iter().enumerate() {
        let index = u32::try_from(index)
            .map_err(|_| syn::Error::new(variant.ident.span(), "too many variants"))?;
        let attrs = VariantAttributes::parse_attrs(&variant.attrs)?;
        let name = attrs.rename.unwrap_or_else(|| {
            LitStr::new(&variant.ident.unraw().to_string(), variant.ident.span())
        });
        let infos = collect_fields(&variant.fields, cx.versioned)?;
        any_since |= has_since(&infos);

        let ident = &variant.ident;
        let pattern = variant_pattern(quote!(Self::#ident), &variant.fields, &infos);
        let writes = infos
            .iter()
            .map(|f| {
                let binding = &f.binding;
                cx.save_field(f, quote!(#binding))
            })
            .collect::<syn::Result<Vec<_>>>()?;
        save_arms.push(quote! {
            #pattern => {
                __archive.save_variant(#index, #name)?;
                #(#writes)*
            }
        });

        let value = cx.construct(quote!(Self::#ident), &variant.fields, &infos)?;
        load_arms.push(quote! { #index => #ok_(#value), });
        names.push(name);
    }

    let version = cx.version_stmt(any_since);
    let save = if data.variants.is_empty() {
        quote! { match *self {} }
    } else {
        quote! {
            #version
            match self {
                #(#save_arms)*
            }
            #ok_(())
        }
    };
    let load = quote! {
        #version
        let __index = __archive.load_variant(
            ::core::any::type_name::<Self>(),
            &[#(#names),*],
        )?;
        match __index {
            #(#load_arms)*
            _ => #err_(#vc::Error::malformed("variant index out of range")),
        }
    };
    Ok((save, load))
}
