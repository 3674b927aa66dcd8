use proc_macro::TokenStream;
use quote::quote;
use syn::ItemImpl;

use crate::signature::{binding_of, ensure_inherent, find_method, order_fn, OrderArgs};

pub fn expand(args: OrderArgs, item: TokenStream) -> TokenStream {
    let item = syn::parse_macro_input!(item as ItemImpl);
    match filter_impl(&args, &item) {
        Ok(expanded) => TokenStream::from(quote! {
            #item
            #expanded
        }),
        Err(err) => err.to_compile_error().into(),
    }
}

fn filter_impl(args: &OrderArgs, item: &ItemImpl) -> syn::Result<proc_macro2::TokenStream> {
    ensure_inherent(item, "filter")?;
    let do_filter = find_method(item, "do_filter").ok_or_else(|| {
        syn::Error::new_spanned(
            &item.self_ty,
            "#[filter] needs a `fn do_filter(&self, request: &Q, response: &mut P, chain: &mut FilterChain)` method",
        )
    })?;
    let binding = binding_of(do_filter)?;
    let q = &binding.request;
    let p = &binding.response;
    let self_ty = &item.self_ty;
    let (impl_generics, _, where_clause) = item.generics.split_for_impl();

    let order = order_fn(item, args);
    let init = find_method(item, "init").map(|_| {
        quote! {
            fn init(&self) {
                <#self_ty>::init(self)
            }
        }
    });
    let destroy = find_method(item, "destroy").map(|_| {
        quote! {
            fn destroy(&self) {
                <#self_ty>::destroy(self)
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::typed_dispatch::Filter<#q, #p> for #self_ty #where_clause {
            #order
            #init

            fn do_filter(
                &self,
                request: &#q,
                response: &mut #p,
                chain: &mut ::typed_dispatch::FilterChain<'_>,
            ) -> ::core::result::Result<(), ::typed_dispatch::HandlerError> {
                <#self_ty>::do_filter(self, request, response, chain)
            }

            #destroy
        }
    })
}
