use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use super::builder::{validate_bindings, DispatcherBuilder};
use super::config::DispatcherConfig;
use super::envelope::{Envelope, ErrorEnvelope, JsonResponse};
use crate::error::{HandlerError, RegistryError};
use crate::filter::{FilterChain, FilterRegistry};
use crate::handler::{BoundHandler, ErasedHandler, Handler, HandlerRegistry, RegisteredHandler};
use crate::interceptor::{InterceptorExecutor, InterceptorRegistry};
use crate::model::{BodyResponse, Request, Response, ResponseValue, TypeKey};
use crate::transaction::{TransactionGuard, TransactionManager, TRANSACTION_TARGET};

/// Tracing target for dispatch.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Entry point: routes a request to its handler through the interceptor and
/// filter pipelines.
///
/// ```text
/// execute(&Ping)
///   │ resolve handler + response type
///   │ begin transaction (optional)
///   ├─> interceptors: before ─> around ─> [filters ─> handler] ─> after
///   │ commit / rollback
///   └─> Envelope { status_code, timestamp, data }
/// ```
///
/// All tables are fixed once the dispatcher is built; dispatching only
/// reads them, so a `Dispatcher` can be shared across threads.
pub struct Dispatcher {
    handlers: HandlerRegistry,
    interceptors: InterceptorExecutor,
    filters: FilterRegistry,
    transactions: Option<Arc<dyn TransactionManager>>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Assemble a dispatcher from populated registries with the default
    /// configuration and no transaction manager.
    pub fn new(
        handlers: HandlerRegistry,
        interceptors: InterceptorRegistry,
        filters: FilterRegistry,
    ) -> Result<Self, RegistryError> {
        Self::from_parts(handlers, interceptors, filters, None, DispatcherConfig::default())
    }

    pub(crate) fn from_parts(
        handlers: HandlerRegistry,
        interceptors: InterceptorRegistry,
        filters: FilterRegistry,
        transactions: Option<Arc<dyn TransactionManager>>,
        config: DispatcherConfig,
    ) -> Result<Self, RegistryError> {
        validate_bindings(&handlers, &interceptors, &filters, &config)?;
        Ok(Self {
            handlers,
            interceptors: InterceptorExecutor::new(interceptors),
            filters,
            transactions,
            config,
        })
    }

    /// Dispatch `request` to the handler registered for its type.
    pub fn execute<Q: Request>(
        &self,
        request: &Q,
    ) -> Result<Envelope<ResponseValue>, HandlerError> {
        let handler = self.resolve(TypeKey::of::<Q>())?;
        self.run(request, TypeKey::of::<Q>(), handler.erased())
    }

    /// Dispatch `request` to an explicitly chosen handler.
    ///
    /// The handler's type must be registered: its response type is taken
    /// from the registry, and interceptors bound to it apply.
    pub fn execute_with<Q, H>(
        &self,
        request: &Q,
        handler: &H,
    ) -> Result<Envelope<ResponseValue>, HandlerError>
    where
        Q: Request,
        H: Handler<Q> + 'static,
    {
        let bound = BoundHandler::<Q, _>::borrowed(handler);
        self.run(request, TypeKey::of::<Q>(), &bound)
    }

    /// Dispatch a request whose type is only known at runtime.
    ///
    /// `request` must be the request value itself, not a box or reference
    /// around it.
    ///
    /// A `&dyn Any` carries no type name, so a miss reports the request as
    /// `<dynamic>`; the `TypeId` is logged on the dispatch target.
    pub fn execute_dyn(
        &self,
        request: &(dyn Any + Send + Sync),
    ) -> Result<Envelope<ResponseValue>, HandlerError> {
        let type_id = (*request).type_id();
        let handler = self
            .handlers
            .resolve_type(TypeKey::dynamic(type_id))
            .inspect_err(|err| {
                error!(
                    target: DISPATCH_TARGET,
                    error = %err,
                    type_id = ?type_id,
                    "handler lookup failed"
                );
            })?;
        let request_type = handler.request_type();
        self.run(request, request_type, handler.erased())
    }

    /// Dispatch and recover the concrete response type.
    pub fn execute_as<Q: Request, P: Response>(
        &self,
        request: &Q,
    ) -> Result<Envelope<P>, HandlerError> {
        self.execute(request)?.downcast::<P>()
    }

    /// Dispatch a request answered with a [`BodyResponse`] and return the
    /// body.
    pub fn execute_body<Q, B>(&self, request: &Q) -> Result<B, HandlerError>
    where
        Q: Request,
        BodyResponse<B>: Response,
    {
        let envelope = self.execute_as::<Q, BodyResponse<B>>(request)?;
        Ok(envelope.into_data().into_body())
    }

    /// Dispatch and fold success and failure into one JSON value.
    pub fn dispatch_json<Q: Request>(&self, request: &Q) -> JsonResponse {
        let rendered = self.execute(request).and_then(|envelope| {
            serde_json::to_value(&envelope).map_err(HandlerError::other)
        });
        match rendered {
            Ok(body) => JsonResponse {
                status: self.config.success_status_code,
                body,
            },
            Err(err) => JsonResponse {
                status: err.status_code(),
                body: serde_json::to_value(ErrorEnvelope::from(&err)).unwrap_or(Value::Null),
            },
        }
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub fn interceptors(&self) -> &InterceptorRegistry {
        self.interceptors.registry()
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    fn resolve(&self, request: TypeKey) -> Result<&RegisteredHandler, HandlerError> {
        self.handlers.resolve_type(request).inspect_err(|err| {
            error!(target: DISPATCH_TARGET, error = %err, "handler lookup failed");
        })
    }

    fn run(
        &self,
        request: &dyn Any,
        request_type: TypeKey,
        handler: &dyn ErasedHandler,
    ) -> Result<Envelope<ResponseValue>, HandlerError> {
        let response_type = *self
            .handlers
            .response_type_of(handler.id())
            .inspect_err(|err| {
                error!(target: DISPATCH_TARGET, error = %err, "response type lookup failed");
            })?;

        debug!(
            target: DISPATCH_TARGET,
            request = request_type.name(),
            handler = handler.id().name(),
            "dispatching"
        );

        let mut response = response_type.instantiate();
        self.in_transaction(request_type, || {
            self.pipeline(request, request_type, handler, &mut *response)
        })?;

        Ok(Envelope::new(
            self.config.success_status_code,
            ResponseValue::new(response, response_type),
        ))
    }

    // The handler is reached through exactly one filter chain, built fresh
    // for this call.
    fn pipeline(
        &self,
        request: &dyn Any,
        request_type: TypeKey,
        handler: &dyn ErasedHandler,
        response: &mut dyn Any,
    ) -> Result<(), HandlerError> {
        let filters = self.filters.filters_for(request_type);
        let terminal = |request: &dyn Any, response: &mut dyn Any| {
            let mut chain = FilterChain::new();
            chain.add_filters(filters);
            chain.set_erased_target(Box::new(handler));
            chain.do_filter_erased(request, response)
        };

        let handled = self.interceptors.execute_erased(
            request,
            response,
            request_type,
            handler.id(),
            &terminal,
        )?;
        if !handled {
            terminal(request, response)?;
        }
        Ok(())
    }

    fn in_transaction<F>(&self, request_type: TypeKey, run: F) -> Result<(), HandlerError>
    where
        F: FnOnce() -> Result<(), HandlerError>,
    {
        let manager = match &self.transactions {
            Some(manager) if self.config.transactional => manager.as_ref(),
            _ => return run(),
        };

        let guard = TransactionGuard::begin(manager)?;
        match run() {
            Ok(()) => Ok(guard.commit()?),
            Err(err) => {
                warn!(
                    target: TRANSACTION_TARGET,
                    request = request_type.name(),
                    error = %err,
                    "rolling back"
                );
                if let Err(rollback) = guard.rollback() {
                    error!(target: TRANSACTION_TARGET, error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handlers", &self.handlers)
            .field("interceptors", self.interceptors.registry())
            .field("filters", &self.filters)
            .field("transactional", &self.transactions.is_some())
            .field("config", &self.config)
            .finish()
    }
}
