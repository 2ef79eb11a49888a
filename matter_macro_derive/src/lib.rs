/*
 *
 *    Copyright (c) 2020-2022 Project CHIP Authors
 *
 *    Licensed under the Apache License, Version 2.0 (the "License");
 *    you may not use this file except in compliance with the License.
 *    You may obtain a copy of the License at
 *
 *        http://www.apache.org/licenses/LICENSE-2.0
 *
 *    Unless required by applicable law or agreed to in writing, software
 *    distributed under the License is distributed on an "AS IS" BASIS,
 *    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *    See the License for the specific language governing permissions and
 *    limitations under the License.
 */

//! `#[derive(ToTLV, FromTLV)]` for the structs and tagged-union enums that
//! make up the interaction model's Information Blocks and messages.
//!
//! `#[tlvargs(datatype = "list", lifetime = "'a")]` on the item controls the
//! container kind written/entered (`struct` is the default) and the extra
//! lifetime parameter to thread through the generated impls when the type
//! borrows (`EncodeValue<'a>`, `TLVArray<'a, T>`, ...).

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::{Ident, Span};
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Lit, Meta, NestedMeta};

struct TlvArgs {
    datatype_list: bool,
    lifetime: Option<syn::Lifetime>,
}

fn parse_tlvargs(input: &DeriveInput) -> TlvArgs {
    let mut datatype_list = false;
    let mut lifetime = None;
    for attr in &input.attrs {
        if !attr.path.is_ident("tlvargs") {
            continue;
        }
        if let Ok(Meta::List(list)) = attr.parse_meta() {
            for nested in list.nested {
                if let NestedMeta::Meta(Meta::NameValue(nv)) = nested {
                    if nv.path.is_ident("datatype") {
                        if let Lit::Str(s) = &nv.lit {
                            datatype_list = s.value() == "list";
                        }
                    } else if nv.path.is_ident("lifetime") {
                        if let Lit::Str(s) = &nv.lit {
                            lifetime = syn::parse_str::<syn::Lifetime>(&s.value()).ok();
                        }
                    }
                }
            }
        }
    }
    TlvArgs { datatype_list, lifetime }
}

/// True if the field's declared type is syntactically `Option<...>`.
fn is_option_type(ty: &syn::Type) -> bool {
    if let syn::Type::Path(p) = ty {
        if let Some(seg) = p.path.segments.last() {
            return seg.ident == "Option";
        }
    }
    false
}

#[proc_macro_derive(ToTLV, attributes(tlvargs))]
pub fn derive_to_tlv(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let args = parse_tlvargs(&input);
    let (start_call, _) = container_calls(args.datatype_list);

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Struct(s) => {
            let fields = match &s.fields {
                Fields::Named(n) => &n.named,
                _ => panic!("ToTLV only supports structs with named fields"),
            };
            let mut writes = Vec::new();
            let mut idx: u8 = 0;
            for f in fields {
                let ident = f.ident.as_ref().unwrap();
                let is_dummy = ident.to_string().starts_with("_dummy");
                if !is_dummy {
                    writes.push(quote! {
                        self.#ident.to_tlv(tw, crate::tlv::TagType::Context(#idx))?;
                    });
                }
                idx += 1;
            }
            quote! {
                tw.#start_call(tag_type)?;
                #(#writes)*
                tw.end_container()?;
                Ok(())
            }
        }
        Data::Enum(e) => {
            let mut arms = Vec::new();
            for (idx, variant) in e.variants.iter().enumerate() {
                let idx = idx as u8;
                let vname = &variant.ident;
                arms.push(quote! {
                    Self::#vname(inner) => {
                        inner.to_tlv(tw, crate::tlv::TagType::Context(#idx))?;
                    }
                });
            }
            quote! {
                tw.start_struct(tag_type)?;
                match self {
                    #(#arms)*
                }
                tw.end_container()?;
                Ok(())
            }
        }
        Data::Union(_) => panic!("ToTLV cannot be derived for unions"),
    };

    let expanded = quote! {
        impl #impl_generics crate::tlv::ToTLV for #name #ty_generics #where_clause {
            fn to_tlv(&self, tw: &mut crate::tlv::TLVWriter, tag_type: crate::tlv::TagType) -> Result<(), crate::error::Error> {
                #body
            }
        }
    };
    expanded.into()
}

#[proc_macro_derive(FromTLV, attributes(tlvargs))]
pub fn derive_from_tlv(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let args = parse_tlvargs(&input);

    // FromTLV always needs a `'a` bound tying the output to the input
    // buffer's lifetime; reuse the declared lifetime param if the type has
    // one (borrowing types), otherwise introduce a fresh one.
    let borrow_lifetime = args
        .lifetime
        .clone()
        .unwrap_or_else(|| syn::Lifetime::new("'matter_tlv", Span::call_site().into()));

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Struct(s) => {
            let fields = match &s.fields {
                Fields::Named(n) => &n.named,
                _ => panic!("FromTLV only supports structs with named fields"),
            };

            let mut decls = Vec::new();
            let mut arms = Vec::new();
            let mut finals = Vec::new();
            let mut idx: u8 = 0;
            for f in fields {
                let ident = f.ident.as_ref().unwrap();
                let ty = &f.ty;
                let is_dummy = ident.to_string().starts_with("_dummy");
                if !is_dummy {
                    let tmp = Ident::new(&format!("__field_{}", ident), Span::call_site().into());
                    decls.push(quote! { let mut #tmp: Option<#ty> = None; });
                    arms.push(quote! {
                        #idx => { #tmp = Some(crate::tlv::FromTLV::from_tlv(element)?); }
                    });
                    if is_option_type(ty) {
                        finals.push(quote! { #ident: #tmp.flatten() });
                    } else {
                        finals.push(quote! {
                            #ident: #tmp.ok_or(crate::error::Error::Im(crate::error::ImError::MissingField))?
                        });
                    }
                }
                idx += 1;
            }

            quote! {
                element.enter_container()?;
                #(#decls)*
                while element.next()? {
                    if element.is_end_of_container() {
                        break;
                    }
                    if let crate::tlv::TagType::Context(ctx) = element.tag()? {
                        match ctx {
                            #(#arms)*
                            _ => { element.skip()?; }
                        }
                    } else {
                        element.skip()?;
                    }
                }
                element.exit_container()?;
                Ok(Self { #(#finals),* })
            }
        }
        Data::Enum(e) => {
            let mut decls = Vec::new();
            let mut arms = Vec::new();
            let mut finals = Vec::new();
            for (idx, variant) in e.variants.iter().enumerate() {
                let idx = idx as u8;
                let vname = &variant.ident;
                let inner_ty = match &variant.fields {
                    Fields::Unnamed(u) if u.unnamed.len() == 1 => &u.unnamed[0].ty,
                    _ => panic!("FromTLV on enums requires exactly one unnamed field per variant"),
                };
                let tmp = Ident::new(&format!("__variant_{}", vname), Span::call_site().into());
                decls.push(quote! { let mut #tmp: Option<#inner_ty> = None; });
                arms.push(quote! {
                    #idx => { #tmp = Some(crate::tlv::FromTLV::from_tlv(element)?); }
                });
                finals.push(quote! {
                    if let Some(v) = #tmp { return Ok(Self::#vname(v)); }
                });
            }

            quote! {
                element.enter_container()?;
                #(#decls)*
                while element.next()? {
                    if element.is_end_of_container() {
                        break;
                    }
                    if let crate::tlv::TagType::Context(ctx) = element.tag()? {
                        match ctx {
                            #(#arms)*
                            _ => { element.skip()?; }
                        }
                    } else {
                        element.skip()?;
                    }
                }
                element.exit_container()?;
                #(#finals)*
                Err(crate::error::Error::Im(crate::error::ImError::MissingField))
            }
        }
        Data::Union(_) => panic!("FromTLV cannot be derived for unions"),
    };

    let expanded = quote! {
        impl #impl_generics crate::tlv::FromTLV<#borrow_lifetime> for #name #ty_generics #where_clause {
            fn from_tlv(element: &mut crate::tlv::TLVElement<#borrow_lifetime>) -> Result<Self, crate::error::Error> {
                #body
            }
        }
    };
    expanded.into()
}

fn container_calls(is_list: bool) -> (Ident, Ident) {
    if is_list {
        (
            Ident::new("start_list", Span::call_site().into()),
            Ident::new("start_list", Span::call_site().into()),
        )
    } else {
        (
            Ident::new("start_struct", Span::call_site().into()),
            Ident::new("start_struct", Span::call_site().into()),
        )
    }
}
