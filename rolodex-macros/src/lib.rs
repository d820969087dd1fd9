//! `#[derive(LowEntity)]`: generates the field-name-to-decoder table used by
//! the low-model builder at compile time, replacing a reflective decoder
//! with codegen (§9 design note "reflective field decoding").
//!
//! ```ignore
//! #[derive(LowEntity)]
//! struct Tag {
//!     #[low(rename = "name", required)]
//!     name: NodeReference<String>,
//!     #[low(rename = "description")]
//!     description: Option<NodeReference<String>>,
//! }
//! ```
//!
//! expands to an inherent `Tag::build(&Node, &PointerBuf, &mut Vec<BuildError>) -> Self`
//! that decodes each annotated field by its renamed key, collects `x-`
//! prefixed and otherwise-unconsumed keys into `extensions`/`unknown_fields`
//! fields (if present on the struct), and records a `BuildError` per missing
//! required field without aborting the rest of the struct.

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::Ident;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Lit, Meta, NestedMeta};

#[proc_macro_derive(LowEntity, attributes(low))]
pub fn derive_low_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Struct(data) = &input.data else {
        return syn::Error::new_spanned(&input, "LowEntity can only be derived for structs")
            .to_compile_error()
            .into();
    };
    let Fields::Named(fields) = &data.fields else {
        return syn::Error::new_spanned(&input, "LowEntity requires named fields")
            .to_compile_error()
            .into();
    };

    let mut decode_stmts = Vec::new();
    let mut field_idents = Vec::new();
    let mut consumed_keys = Vec::new();
    let mut extensions_field = None;
    let mut unknown_fields_field = None;

    for field in &fields.named {
        let ident = field.ident.as_ref().expect("named field");
        if ident == "extensions" {
            extensions_field = Some(ident.clone());
            continue;
        }
        if ident == "unknown_fields" {
            unknown_fields_field = Some(ident.clone());
            continue;
        }

        let low_attr = field.attrs.iter().find(|a| a.path.is_ident("low"));
        let (rename, required) = parse_low_attr(low_attr, ident);
        consumed_keys.push(rename.clone());
        field_idents.push(ident.clone());

        let is_optional = is_option_type(&field.ty);
        let decode = if is_optional {
            quote! {
                let #ident = rolodex_core::low::optional_str(node, #rename, path)
                    .unwrap_or_else(|e| { errors.push(e); None })
                    .map(|r| r.map(::std::convert::Into::into));
            }
        } else if required {
            quote! {
                let #ident = rolodex_core::low::require_str(node, #rename, path)
                    .unwrap_or_else(|e| {
                        errors.push(e);
                        rolodex_core::low::NodeReference::new(
                            ::std::default::Default::default(),
                            None,
                            rolodex_core::node::Node::scalar(""),
                        )
                    })
                    .map(::std::convert::Into::into);
            }
        } else {
            quote! {
                let #ident = rolodex_core::low::optional_str(node, #rename, path)
                    .unwrap_or_else(|e| { errors.push(e); None })
                    .map(|r| r.map(::std::convert::Into::into))
                    .unwrap_or_else(|| rolodex_core::low::NodeReference::new(
                        ::std::default::Default::default(),
                        None,
                        rolodex_core::node::Node::scalar(""),
                    ));
            }
        };
        decode_stmts.push(decode);
    }

    let residue = {
        let extensions_assign = extensions_field.as_ref().map(|f| quote! { #f: extensions, });
        let unknown_assign = unknown_fields_field.as_ref().map(|f| quote! { #f: unknown_fields, });
        quote! {
            let (extensions, unknown_fields) = rolodex_core::low::collect_residue(
                node,
                &[#(#consumed_keys),*],
            );
            #extensions_assign
            #unknown_assign
        }
    };

    let struct_init_fields = field_idents.iter().map(|f| quote! { #f });

    let expanded = quote! {
        impl #name {
            /// Decodes `Self` from `node`, accumulating field-level
            /// [`BuildError`](rolodex_core::error::BuildError)s rather than
            /// aborting.
            #[must_use]
            pub fn build(
                node: &rolodex_core::node::Node,
                path: &jsonptr::PointerBuf,
                errors: &mut ::std::vec::Vec<rolodex_core::error::BuildError>,
            ) -> Self {
                #(#decode_stmts)*
                #residue
                Self {
                    #(#struct_init_fields,)*
                    #(#extensions_field: extensions,)*
                    #(#unknown_fields_field: unknown_fields,)*
                }
            }
        }
    };
    expanded.into()
}

fn parse_low_attr(attr: Option<&syn::Attribute>, ident: &Ident) -> (String, bool) {
    let mut rename = ident.to_string();
    let mut required = false;
    let Some(attr) = attr else {
        return (rename, required);
    };
    let Ok(Meta::List(list)) = attr.parse_meta() else {
        return (rename, required);
    };
    for nested in list.nested {
        match nested {
            NestedMeta::Meta(Meta::NameValue(nv)) if nv.path.is_ident("rename") => {
                if let Lit::Str(s) = nv.lit {
                    rename = s.value();
                }
            }
            NestedMeta::Meta(Meta::Path(p)) if p.is_ident("required") => {
                required = true;
            }
            _ => {}
        }
    }
    (rename, required)
}

fn is_option_type(ty: &syn::Type) -> bool {
    if let syn::Type::Path(path) = ty {
        return path.path.segments.last().is_some_and(|s| s.ident == "Option");
    }
    false
}

#[cfg(test)]
mod tests {
    use super::LowEntity;
    use rolodex_core::low::NodeReference;
    use rolodex_core::node;

    #[derive(LowEntity)]
    struct Tag {
        #[low(rename = "name", required)]
        name: NodeReference<String>,
        #[low(rename = "description")]
        description: Option<NodeReference<String>>,
        extensions: rolodex_core::low::Extensions,
        unknown_fields: rolodex_core::low::UnknownFields,
    }

    #[test]
    fn derives_build_from_renamed_fields() {
        let root = node::parse(br#"{"name": "pets", "x-group": "core"}"#).unwrap();
        let mut errors = Vec::new();
        let tag = Tag::build(&root, &jsonptr::PointerBuf::default(), &mut errors);
        assert!(errors.is_empty());
        assert_eq!(tag.name.value, "pets");
        assert!(tag.description.is_none());
        assert_eq!(tag.extensions.get("group").unwrap().value.as_str(), Some("core"));
    }

    #[test]
    fn missing_required_field_is_accumulated() {
        let root = node::parse(br#"{"description": "pets"}"#).unwrap();
        let mut errors = Vec::new();
        let tag = Tag::build(&root, &jsonptr::PointerBuf::default(), &mut errors);
        assert_eq!(errors.len(), 1);
        assert_eq!(tag.description.unwrap().value, "pets");
    }
}

