//! Handler registry: request type to handler, and handler to response type.
//!
//! Both tables are filled once during startup and only read afterwards.
//! Binding a second handler to a request type, or a second response type to
//! a handler, is a configuration error and leaves the existing binding as it
//! was.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use super::handler::{BoundHandler, ErasedHandler};
use super::Handler;
use crate::error::{HandlerError, RegistryError};
use crate::model::{Request, ResponseType, TypeKey};

/// Tracing target for registry construction.
pub(crate) const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// A handler as held by the registry.
///
/// Cheap to clone; all clones share the same handler instance.
#[derive(Clone)]
pub struct RegisteredHandler {
    inner: Arc<dyn ErasedHandler>,
}

impl RegisteredHandler {
    /// Identity of the handler type.
    pub fn id(&self) -> TypeKey {
        self.inner.id()
    }

    pub fn name(&self) -> &'static str {
        self.inner.id().name()
    }

    pub fn request_type(&self) -> TypeKey {
        self.inner.request_type()
    }

    /// Response type declared by the handler's signature.
    pub fn declared_response_type(&self) -> ResponseType {
        self.inner.response_type()
    }

    pub(crate) fn erased(&self) -> &dyn ErasedHandler {
        self.inner.as_ref()
    }
}

impl fmt::Debug for RegisteredHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredHandler")
            .field("handler", &self.name())
            .field("request", &self.request_type().name())
            .finish()
    }
}

/// A handler waiting to be registered.
///
/// Lets callers assemble the handler population as a plain collection and
/// hand it over in one go with [`HandlerRegistry::register_all`].
pub struct HandlerRegistration {
    handler: RegisteredHandler,
}

impl HandlerRegistration {
    pub fn new<Q, H>(handler: H) -> Self
    where
        Q: Request,
        H: Handler<Q> + 'static,
    {
        Self {
            handler: RegisteredHandler {
                inner: Arc::new(BoundHandler::<Q, H>::new(handler)),
            },
        }
    }

    pub fn handler_name(&self) -> &'static str {
        self.handler.name()
    }

    pub fn request_type(&self) -> TypeKey {
        self.handler.request_type()
    }
}

impl fmt::Debug for HandlerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HandlerRegistration")
            .field(&self.handler)
            .finish()
    }
}

/// Lookup tables from request type to handler and from handler to response
/// type.
#[derive(Default)]
pub struct HandlerRegistry {
    request_handlers: HashMap<TypeKey, RegisteredHandler>,
    handler_responses: HashMap<TypeKey, ResponseType>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a collection of registrations.
    ///
    /// Stops at the first duplicate binding.
    pub fn from_registrations<I>(registrations: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = HandlerRegistration>,
    {
        let mut registry = Self::new();
        registry.register_all(registrations)?;
        Ok(registry)
    }

    /// Register a single handler for request type `Q`.
    pub fn register<Q, H>(&mut self, handler: H) -> Result<(), RegistryError>
    where
        Q: Request,
        H: Handler<Q> + 'static,
    {
        self.bind(HandlerRegistration::new::<Q, H>(handler))
    }

    /// Register every handler in `registrations`, in order.
    pub fn register_all<I>(&mut self, registrations: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = HandlerRegistration>,
    {
        let before = self.len();
        for registration in registrations {
            self.bind(registration)?;
        }
        info!(
            target: REGISTRY_TARGET,
            added = self.len() - before,
            total = self.len(),
            "handler registry populated"
        );
        Ok(())
    }

    fn bind(&mut self, registration: HandlerRegistration) -> Result<(), RegistryError> {
        let handler = registration.handler;
        let request = handler.request_type();
        let response = handler.declared_response_type();

        // One handler per request type.
        if let Some(existing) = self.request_handlers.get(&request) {
            return Err(RegistryError::DuplicateRequestBinding {
                request: request.name(),
                existing: existing.name(),
                handler: handler.name(),
            });
        }
        // One response type per handler.
        if let Some(existing) = self.handler_responses.get(&handler.id()) {
            return Err(RegistryError::DuplicateResponseBinding {
                handler: handler.name(),
                existing: existing.name(),
                response: response.name(),
            });
        }

        debug!(
            target: REGISTRY_TARGET,
            request = request.name(),
            handler = handler.name(),
            response = response.name(),
            "bound handler"
        );
        self.handler_responses.insert(handler.id(), response);
        self.request_handlers.insert(request, handler);
        Ok(())
    }

    /// Find the handler bound to request type `Q`.
    pub fn resolve<Q: Request>(&self) -> Result<&RegisteredHandler, HandlerError> {
        self.resolve_type(TypeKey::of::<Q>())
    }

    /// Find the handler bound to a request type known only at runtime.
    pub fn resolve_type(&self, request: TypeKey) -> Result<&RegisteredHandler, HandlerError> {
        self.request_handlers
            .get(&request)
            .ok_or(HandlerError::HandlerNotFound {
                request: request.name(),
            })
    }

    /// Response type bound to a handler.
    pub fn response_type_of(&self, handler: TypeKey) -> Result<&ResponseType, HandlerError> {
        self.handler_responses
            .get(&handler)
            .ok_or(HandlerError::ResponseTypeNotFound {
                handler: handler.name(),
            })
    }

    /// Request type a handler is registered for.
    pub fn request_type_for(&self, handler: TypeKey) -> Option<TypeKey> {
        self.request_handlers
            .values()
            .find(|registered| registered.id() == handler)
            .map(RegisteredHandler::request_type)
    }

    pub fn contains<Q: Request>(&self) -> bool {
        self.request_handlers.contains_key(&TypeKey::of::<Q>())
    }

    /// Whether a handler type has been registered.
    pub fn contains_handler(&self, handler: TypeKey) -> bool {
        self.handler_responses.contains_key(&handler)
    }

    /// Names of all bound request types, sorted.
    pub fn request_types(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.request_handlers.keys().map(|k| k.name()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.request_handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.request_handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("requests", &self.request_types())
            .finish()
    }
}
