//! `#[derive(Context)]`.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

pub fn expand(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let fields = match crate::named_fields(&input, "Context") {
        Ok(fields) => fields,
        Err(err) => return err.to_compile_error().into(),
    };

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let impls = fields.iter().filter_map(|field| {
        let ident = field.ident.as_ref()?;
        let ty = &field.ty;
        Some(quote! {
            impl #impl_generics crate::FromRef<#name #ty_generics> for #ty #where_clause {
                fn from_ref(ctx: &#name #ty_generics) -> Self {
                    ::std::clone::Clone::clone(&ctx.#ident)
                }
            }
        })
    });

    quote! { #(#impls)* }.into()
}
