use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::{Expr, FnArg, ImplItem, ImplItemFn, ItemImpl, Type, TypeReference};

/// `(request, response)` types read from a method's first two parameters.
pub struct Binding {
    pub request: Type,
    pub response: Type,
}

impl Binding {
    fn key(&self) -> (String, String) {
        let request = &self.request;
        let response = &self.response;
        (quote!(#request).to_string(), quote!(#response).to_string())
    }

    pub fn same_as(&self, other: &Binding) -> bool {
        self.key() == other.key()
    }
}

/// Arguments of `#[interceptor(order = N)]` and `#[filter(order = N)]`.
#[derive(Default)]
pub struct OrderArgs {
    pub order: Option<Expr>,
}

impl OrderArgs {
    pub fn parse(&mut self, meta: ParseNestedMeta) -> syn::Result<()> {
        if meta.path.is_ident("order") {
            self.order = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported argument, expected `order = <i32>`"))
        }
    }
}

pub fn ensure_inherent(item: &ItemImpl, attribute: &str) -> syn::Result<()> {
    match &item.trait_ {
        Some((_, path, _)) => Err(syn::Error::new_spanned(
            path,
            format!("#[{attribute}] goes on an inherent impl block, not a trait impl"),
        )),
        None => Ok(()),
    }
}

pub fn find_method<'a>(item: &'a ItemImpl, name: &str) -> Option<&'a ImplItemFn> {
    item.items.iter().find_map(|member| match member {
        ImplItem::Fn(method) if method.sig.ident == name => Some(method),
        _ => None,
    })
}

/// Read `&Q` and `&mut P` from the parameters following `&self`.
pub fn binding_of(method: &ImplItemFn) -> syn::Result<Binding> {
    let sig = &method.sig;
    if sig.receiver().is_none() {
        return Err(syn::Error::new_spanned(
            &sig.ident,
            format!("`{}` must take `&self`", sig.ident),
        ));
    }

    let mut params = sig.inputs.iter().filter_map(|arg| match arg {
        FnArg::Typed(typed) => Some(&*typed.ty),
        FnArg::Receiver(_) => None,
    });

    let request = match params.next() {
        Some(Type::Reference(TypeReference {
            mutability: None,
            elem,
            ..
        })) => (**elem).clone(),
        _ => return Err(parameter_error(method, "a request `&Q` as first parameter")),
    };
    let response = match params.next() {
        Some(Type::Reference(TypeReference {
            mutability: Some(_),
            elem,
            ..
        })) => (**elem).clone(),
        _ => {
            return Err(parameter_error(
                method,
                "a response `&mut P` as second parameter",
            ))
        }
    };
    Ok(Binding { request, response })
}

fn parameter_error(method: &ImplItemFn, expected: &str) -> syn::Error {
    syn::Error::new_spanned(
        &method.sig.inputs,
        format!("`{}` must take {expected}", method.sig.ident),
    )
}

/// Bindings of every present method must agree; returns the first one.
pub fn agreed_binding(item: &ItemImpl, methods: &[&ImplItemFn]) -> syn::Result<Binding> {
    let mut bindings = methods.iter().map(|method| binding_of(method));
    let first = match bindings.next() {
        Some(binding) => binding?,
        None => {
            return Err(syn::Error::new_spanned(
                &item.self_ty,
                "no phase method found",
            ))
        }
    };
    for (binding, method) in bindings.zip(methods.iter().skip(1)) {
        if !binding?.same_as(&first) {
            return Err(syn::Error::new_spanned(
                &method.sig.inputs,
                "all phase methods must take the same request and response types",
            ));
        }
    }
    Ok(first)
}

/// `fn order(&self) -> i32`, from the attribute or an inherent `order` method.
pub fn order_fn(item: &ItemImpl, args: &OrderArgs) -> TokenStream2 {
    let self_ty = &item.self_ty;
    match (&args.order, find_method(item, "order")) {
        (Some(order), _) => quote! {
            fn order(&self) -> i32 {
                #order
            }
        },
        (None, Some(_)) => quote! {
            fn order(&self) -> i32 {
                <#self_ty>::order(self)
            }
        },
        (None, None) => TokenStream2::new(),
    }
}
