use std::sync::Arc;

use tracing::{info, warn};

use super::config::DispatcherConfig;
use super::dispatcher::Dispatcher;
use crate::error::RegistryError;
use crate::filter::{Filter, FilterRegistration, FilterRegistry};
use crate::handler::{Handler, HandlerRegistration, HandlerRegistry, REGISTRY_TARGET};
use crate::interceptor::{
    Interceptor, InterceptorKey, InterceptorRegistration, InterceptorRegistry,
};
use crate::model::{Request, Response, TypeKey};
use crate::transaction::TransactionManager;

/// Collects handlers, interceptors and filters, then builds a [`Dispatcher`].
///
/// ```ignore
/// let dispatcher = Dispatcher::builder()
///     .handler(PingHandler)
///     .interceptor(Audit)
///     .filter(RequireTenant)
///     .transaction_manager(Arc::new(InMemoryTransactionManager::new()))
///     .build()?;
/// ```
///
/// Nothing is validated until [`build`](DispatcherBuilder::build).
#[derive(Default)]
pub struct DispatcherBuilder {
    handlers: Vec<HandlerRegistration>,
    interceptors: Vec<InterceptorRegistration>,
    filters: Vec<FilterRegistration>,
    transactions: Option<Arc<dyn TransactionManager>>,
    config: DispatcherConfig,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler<Q, H>(mut self, handler: H) -> Self
    where
        Q: Request,
        H: Handler<Q> + 'static,
    {
        self.handlers.push(HandlerRegistration::new::<Q, H>(handler));
        self
    }

    pub fn handlers<I>(mut self, registrations: I) -> Self
    where
        I: IntoIterator<Item = HandlerRegistration>,
    {
        self.handlers.extend(registrations);
        self
    }

    /// Bind an interceptor to every dispatch of request type `Q`.
    pub fn interceptor<Q, P, I>(mut self, interceptor: I) -> Self
    where
        Q: Request,
        P: Response,
        I: Interceptor<Q, P> + 'static,
    {
        self.interceptors
            .push(InterceptorRegistration::for_request::<Q, P, I>(interceptor));
        self
    }

    /// Bind an interceptor to every dispatch served by handler type `H`.
    pub fn handler_interceptor<H, Q, I>(mut self, interceptor: I) -> Self
    where
        Q: Request,
        H: Handler<Q> + 'static,
        I: Interceptor<Q, H::Response> + 'static,
    {
        self.interceptors
            .push(InterceptorRegistration::for_handler::<H, Q, I>(interceptor));
        self
    }

    pub fn interceptors<I>(mut self, registrations: I) -> Self
    where
        I: IntoIterator<Item = InterceptorRegistration>,
    {
        self.interceptors.extend(registrations);
        self
    }

    pub fn filter<Q, P, F>(mut self, filter: F) -> Self
    where
        Q: Request,
        P: Response,
        F: Filter<Q, P> + 'static,
    {
        self.filters.push(FilterRegistration::new::<Q, P, F>(filter));
        self
    }

    pub fn filters<I>(mut self, registrations: I) -> Self
    where
        I: IntoIterator<Item = FilterRegistration>,
    {
        self.filters.extend(registrations);
        self
    }

    /// Run every dispatch inside a transaction from `manager`.
    pub fn transaction_manager<T>(mut self, manager: Arc<T>) -> Self
    where
        T: TransactionManager + 'static,
    {
        self.transactions = Some(manager as Arc<dyn TransactionManager>);
        self
    }

    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn success_status(mut self, status_code: u16) -> Self {
        self.config.success_status_code = status_code;
        self
    }

    pub fn strict_bindings(mut self, strict: bool) -> Self {
        self.config.strict_bindings = strict;
        self
    }

    /// Populate the registries and check that every interceptor and filter
    /// fits the handler it will wrap.
    pub fn build(self) -> Result<Dispatcher, RegistryError> {
        let handlers = HandlerRegistry::from_registrations(self.handlers)?;
        let interceptors = InterceptorRegistry::from_registrations(self.interceptors);
        let filters = FilterRegistry::from_registrations(self.filters);

        let dispatcher = Dispatcher::from_parts(
            handlers,
            interceptors,
            filters,
            self.transactions,
            self.config,
        )?;
        info!(
            target: REGISTRY_TARGET,
            handlers = dispatcher.handlers().len(),
            interceptors = dispatcher.interceptors().len(),
            filters = dispatcher.filters().len(),
            "dispatcher ready"
        );
        Ok(dispatcher)
    }
}

/// Check every interceptor and filter against the handler it is bound to.
///
/// A component whose response type differs from its handler's would fail on
/// every dispatch, so it is rejected up front. A component bound to nothing
/// never runs; it is rejected in strict mode and logged otherwise.
pub(super) fn validate_bindings(
    handlers: &HandlerRegistry,
    interceptors: &InterceptorRegistry,
    filters: &FilterRegistry,
    config: &DispatcherConfig,
) -> Result<(), RegistryError> {
    for interceptor in interceptors.entries() {
        let component = interceptor.name();
        match interceptor.key() {
            InterceptorKey::Request(request) => check_request_binding(
                handlers,
                config,
                component,
                request,
                interceptor.response_type(),
            )?,
            InterceptorKey::Handler(handler) => {
                let Ok(response) = handlers.response_type_of(handler) else {
                    unbound(config, component, handler)?;
                    continue;
                };
                // The handler must be the one registered for the request
                // type the interceptor was written against.
                let serves_request = handlers
                    .resolve_type(interceptor.request_type())
                    .is_ok_and(|h| h.id() == handler);
                if !serves_request {
                    return Err(RegistryError::RequestMismatch {
                        component,
                        handler: handler.name(),
                        expected: handlers
                            .request_type_for(handler)
                            .map_or("<unregistered>", |request| request.name()),
                        found: interceptor.request_type().name(),
                    });
                }
                if response.key() != interceptor.response_type() {
                    return Err(RegistryError::ResponseMismatch {
                        component,
                        request: interceptor.request_type().name(),
                        expected: response.name(),
                        found: interceptor.response_type().name(),
                    });
                }
            }
        }
    }

    for filter in filters.entries() {
        check_request_binding(
            handlers,
            config,
            filter.name(),
            filter.request_type(),
            filter.response_type(),
        )?;
    }
    Ok(())
}

fn check_request_binding(
    handlers: &HandlerRegistry,
    config: &DispatcherConfig,
    component: &'static str,
    request: TypeKey,
    response: TypeKey,
) -> Result<(), RegistryError> {
    let Ok(handler) = handlers.resolve_type(request) else {
        return unbound(config, component, request);
    };
    let expected = handler.declared_response_type();
    if expected.key() != response {
        return Err(RegistryError::ResponseMismatch {
            component,
            request: request.name(),
            expected: expected.name(),
            found: response.name(),
        });
    }
    Ok(())
}

fn unbound(
    config: &DispatcherConfig,
    component: &'static str,
    target: TypeKey,
) -> Result<(), RegistryError> {
    if config.strict_bindings {
        return Err(RegistryError::UnboundComponent {
            component,
            target: target.name(),
        });
    }
    warn!(
        target: REGISTRY_TARGET,
        component,
        bound_to = target.name(),
        "component is bound to a type without a handler and will never run"
    );
    Ok(())
}
