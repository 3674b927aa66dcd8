use proc_macro::TokenStream;
use quote::quote;
use syn::ItemImpl;

use crate::signature::{binding_of, ensure_inherent, find_method};

pub fn expand(item: TokenStream) -> TokenStream {
    let item = syn::parse_macro_input!(item as ItemImpl);
    match handler_impl(&item) {
        Ok(expanded) => TokenStream::from(quote! {
            #item
            #expanded
        }),
        Err(err) => err.to_compile_error().into(),
    }
}

fn handler_impl(item: &ItemImpl) -> syn::Result<proc_macro2::TokenStream> {
    ensure_inherent(item, "handler")?;
    let handle = find_method(item, "handle").ok_or_else(|| {
        syn::Error::new_spanned(
            &item.self_ty,
            "#[handler] needs a `fn handle(&self, request: &Q, response: &mut P)` method",
        )
    })?;
    let binding = binding_of(handle)?;
    let request = &binding.request;
    let response = &binding.response;

    let self_ty = &item.self_ty;
    let (impl_generics, _, where_clause) = item.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::typed_dispatch::Handler<#request> for #self_ty #where_clause {
            type Response = #response;

            fn handle(
                &self,
                request: &#request,
                response: &mut #response,
            ) -> ::core::result::Result<(), ::typed_dispatch::HandlerError> {
                <#self_ty>::handle(self, request, response)
            }
        }
    })
}
