use proc_macro::TokenStream;
use quote::quote;
use syn::ItemImpl;

use crate::signature::{agreed_binding, ensure_inherent, find_method, order_fn, OrderArgs};

const PHASES: [&str; 4] = ["before", "around", "after_return", "after_throwing"];

pub fn expand(args: OrderArgs, item: TokenStream) -> TokenStream {
    let item = syn::parse_macro_input!(item as ItemImpl);
    match interceptor_impl(&args, &item) {
        Ok(expanded) => TokenStream::from(quote! {
            #item
            #expanded
        }),
        Err(err) => err.to_compile_error().into(),
    }
}

fn interceptor_impl(args: &OrderArgs, item: &ItemImpl) -> syn::Result<proc_macro2::TokenStream> {
    ensure_inherent(item, "interceptor")?;

    let present: Vec<_> = PHASES
        .iter()
        .filter_map(|phase| find_method(item, phase))
        .collect();
    if present.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.self_ty,
            "#[interceptor] needs at least one of `before`, `around`, `after_return`, `after_throwing`",
        ));
    }
    let binding = agreed_binding(item, &present)?;
    let q = &binding.request;
    let p = &binding.response;
    let self_ty = &item.self_ty;
    let (impl_generics, _, where_clause) = item.generics.split_for_impl();

    let order = order_fn(item, args);
    let phases = present.iter().map(|method| match method.sig.ident.to_string().as_str() {
        "before" => quote! {
            fn before(
                &self,
                request: &#q,
                response: &mut #p,
            ) -> ::core::result::Result<::typed_dispatch::Flow, ::typed_dispatch::HandlerError> {
                <#self_ty>::before(self, request, response)
            }
        },
        "around" => quote! {
            fn around(
                &self,
                request: &#q,
                response: &mut #p,
                next: ::typed_dispatch::Next<'_, #q, #p>,
            ) -> ::core::result::Result<::typed_dispatch::Flow, ::typed_dispatch::HandlerError> {
                <#self_ty>::around(self, request, response, next)
            }
        },
        "after_return" => quote! {
            fn after_return(
                &self,
                request: &#q,
                response: &mut #p,
            ) -> ::core::result::Result<::typed_dispatch::Flow, ::typed_dispatch::HandlerError> {
                <#self_ty>::after_return(self, request, response)
            }
        },
        _ => quote! {
            fn after_throwing(
                &self,
                request: &#q,
                response: &mut #p,
                error: &::typed_dispatch::HandlerError,
            ) -> ::core::result::Result<::typed_dispatch::Flow, ::typed_dispatch::HandlerError> {
                <#self_ty>::after_throwing(self, request, response, error)
            }
        },
    });

    Ok(quote! {
        impl #impl_generics ::typed_dispatch::Interceptor<#q, #p> for #self_ty #where_clause {
            #order
            #(#phases)*
        }
    })
}
