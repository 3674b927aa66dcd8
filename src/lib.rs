extern crate self as typed_dispatch;

mod dispatcher;
mod error;
mod filter;
mod handler;
mod interceptor;
mod model;
mod transaction;

pub use dispatcher::{
    Dispatcher, DispatcherBuilder, DispatcherConfig, Envelope, ErrorEnvelope, JsonResponse,
};
pub use error::{ErrorKind, HandlerError, RegistryError, TransactionError};
pub use filter::{Filter, FilterChain, FilterRegistration, FilterRegistry, RegisteredFilter};
pub use handler::{
    handler_fn, FnHandler, Handler, HandlerRegistration, HandlerRegistry, RegisteredHandler,
};
pub use interceptor::{
    Flow, Interceptor, InterceptorExecutor, InterceptorKey, InterceptorRegistration,
    InterceptorRegistry, Next, RegisteredInterceptor,
};
pub use model::{
    BodyResponse, PageResponse, Request, Response, ResponseType, ResponseValue, TypeKey,
};
pub use transaction::{
    InMemoryTransactionManager, TransactionEvent, TransactionGuard, TransactionManager,
    TransactionToken,
};

// Attribute macros deriving the trait impls from method signatures
pub use typed_dispatch_macros::{filter, handler, interceptor};

/// Register a list of handlers with a [`DispatcherBuilder`].
///
/// Each handler's request type is taken from its `Handler` impl.
///
/// # Example
/// ```ignore
/// let dispatcher = typed_dispatch::register_handlers!(
///     Dispatcher::builder(),
///     PingHandler,
///     orders::CreateOrderHandler::new(repo.clone()),
/// )
/// .build()?;
/// ```
#[macro_export]
macro_rules! register_handlers {
    ($builder:expr, $( $handler:expr ),+ $(,)?) => {
        $builder
        $(
            .handler($handler)
        )+
    };
}
