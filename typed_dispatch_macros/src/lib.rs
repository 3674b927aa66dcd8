//! Attribute macros for `typed_dispatch`.
//!
//! Each macro goes on an inherent `impl` block and derives the matching
//! trait impl from the method signatures, so the request and response
//! types are written once.

mod filter;
mod handler;
mod interceptor;
mod signature;

use proc_macro::TokenStream;
use syn::parse_macro_input;

use signature::OrderArgs;

// ============================================================================
// #[handler]
// ============================================================================

/// Implement `Handler<Q>` for a type with an inherent `handle` method.
///
/// ```ignore
/// struct PingHandler;
///
/// #[handler]
/// impl PingHandler {
///     fn handle(&self, _request: &Ping, response: &mut Pong) -> Result<(), HandlerError> {
///         response.message = "pong".into();
///         Ok(())
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn handler(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[handler] takes no arguments",
        )
        .to_compile_error()
        .into();
    }
    handler::expand(item)
}

// ============================================================================
// #[interceptor(order = N)]
// ============================================================================

/// Implement `Interceptor<Q, P>` from any of the inherent methods `before`,
/// `around`, `after_return` and `after_throwing`.
///
/// Missing phases keep the trait defaults. `order` may be given in the
/// attribute or as an inherent `fn order(&self) -> i32`.
///
/// ```ignore
/// struct Audit;
///
/// #[interceptor(order = 10)]
/// impl Audit {
///     fn before(&self, request: &Ping, _response: &mut Pong) -> Result<Flow, HandlerError> {
///         tracing::info!(?request, "ping");
///         Ok(Flow::Continue)
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn interceptor(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut args = OrderArgs::default();
    let parser = syn::meta::parser(|meta| args.parse(meta));
    parse_macro_input!(attr with parser);
    interceptor::expand(args, item)
}

// ============================================================================
// #[filter(order = N)]
// ============================================================================

/// Implement `Filter<Q, P>` for a type with an inherent `do_filter` method.
///
/// `init` and `destroy` are forwarded when present.
///
/// ```ignore
/// struct RequireTenant;
///
/// #[filter(order = 1)]
/// impl RequireTenant {
///     fn do_filter(
///         &self,
///         request: &Ping,
///         response: &mut Pong,
///         chain: &mut FilterChain<'_>,
///     ) -> Result<(), HandlerError> {
///         if request.tenant.is_empty() {
///             return Err(HandlerError::Unauthorized("missing tenant".into()));
///         }
///         chain.do_filter(request, response)
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn filter(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut args = OrderArgs::default();
    let parser = syn::meta::parser(|meta| args.parse(meta));
    parse_macro_input!(attr with parser);
    filter::expand(args, item)
}
