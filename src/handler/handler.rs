use std::any::Any;
use std::marker::PhantomData;

use crate::error::HandlerError;
use crate::model::{Request, Response, ResponseType, TypeKey};

/// Business logic for one request type.
///
/// A handler is bound to exactly one request type and produces exactly one
/// response type. The dispatcher default-constructs the response and passes
/// it in for the handler to populate.
///
/// ## Example
///
/// ```ignore
/// struct PingHandler;
///
/// impl Handler<Ping> for PingHandler {
///     type Response = BodyResponse<String>;
///
///     fn handle(&self, _request: &Ping, response: &mut Self::Response) -> Result<(), HandlerError> {
///         response.body = "pong".into();
///         Ok(())
///     }
/// }
/// ```
pub trait Handler<Q: Request>: Send + Sync {
    type Response: Response;

    fn handle(&self, request: &Q, response: &mut Self::Response) -> Result<(), HandlerError>;
}

impl<Q: Request, H: Handler<Q> + ?Sized> Handler<Q> for &H {
    type Response = H::Response;

    fn handle(&self, request: &Q, response: &mut Self::Response) -> Result<(), HandlerError> {
        (**self).handle(request, response)
    }
}

/// Handler backed by a closure. Build one with [`handler_fn`].
pub struct FnHandler<F, Q, P> {
    f: F,
    _types: PhantomData<fn(&Q, &mut P)>,
}

/// Wrap a closure as a handler.
///
/// ```ignore
/// let ping = handler_fn(|_: &Ping, response: &mut BodyResponse<String>| {
///     response.body = "pong".into();
///     Ok(())
/// });
/// ```
pub fn handler_fn<F, Q, P>(f: F) -> FnHandler<F, Q, P>
where
    F: Fn(&Q, &mut P) -> Result<(), HandlerError> + Send + Sync,
    Q: Request,
    P: Response,
{
    FnHandler {
        f,
        _types: PhantomData,
    }
}

impl<F, Q, P> Handler<Q> for FnHandler<F, Q, P>
where
    F: Fn(&Q, &mut P) -> Result<(), HandlerError> + Send + Sync,
    Q: Request,
    P: Response,
{
    type Response = P;

    fn handle(&self, request: &Q, response: &mut P) -> Result<(), HandlerError> {
        (self.f)(request, response)
    }
}

/// Type-erased handler as stored in the registry.
pub(crate) trait ErasedHandler: Send + Sync {
    /// Identity of the handler type.
    fn id(&self) -> TypeKey;

    fn request_type(&self) -> TypeKey;

    /// Response type declared by the handler's signature.
    fn response_type(&self) -> ResponseType;

    fn handle_erased(&self, request: &dyn Any, response: &mut dyn Any)
        -> Result<(), HandlerError>;
}

impl<T: ErasedHandler + ?Sized> ErasedHandler for &T {
    fn id(&self) -> TypeKey {
        (**self).id()
    }

    fn request_type(&self) -> TypeKey {
        (**self).request_type()
    }

    fn response_type(&self) -> ResponseType {
        (**self).response_type()
    }

    fn handle_erased(
        &self,
        request: &dyn Any,
        response: &mut dyn Any,
    ) -> Result<(), HandlerError> {
        (**self).handle_erased(request, response)
    }
}

/// Binds a typed handler to its request type and erases both.
pub(crate) struct BoundHandler<Q, H> {
    id: TypeKey,
    handler: H,
    _request: PhantomData<fn(&Q)>,
}

impl<Q: Request, H: Handler<Q> + 'static> BoundHandler<Q, H> {
    pub(crate) fn new(handler: H) -> Self {
        Self {
            id: TypeKey::of::<H>(),
            handler,
            _request: PhantomData,
        }
    }
}

impl<'a, Q: Request, H: Handler<Q> + 'static> BoundHandler<Q, &'a H> {
    /// Borrow a handler for a single dispatch. The identity stays that of
    /// `H`, so registry lookups treat it as the registered handler.
    pub(crate) fn borrowed(handler: &'a H) -> Self {
        Self {
            id: TypeKey::of::<H>(),
            handler,
            _request: PhantomData,
        }
    }
}

impl<Q: Request, H: Handler<Q>> ErasedHandler for BoundHandler<Q, H> {
    fn id(&self) -> TypeKey {
        self.id
    }

    fn request_type(&self) -> TypeKey {
        TypeKey::of::<Q>()
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::of::<H::Response>()
    }

    fn handle_erased(
        &self,
        request: &dyn Any,
        response: &mut dyn Any,
    ) -> Result<(), HandlerError> {
        let request = downcast_ref::<Q>(request, self.id.name())?;
        let response = downcast_mut::<H::Response>(response, self.id.name())?;
        self.handler.handle(request, response)
    }
}

pub(crate) fn downcast_ref<'a, T: 'static>(
    value: &'a dyn Any,
    component: &'static str,
) -> Result<&'a T, HandlerError> {
    value
        .downcast_ref::<T>()
        .ok_or_else(|| HandlerError::TypeMismatch {
            component,
            expected: std::any::type_name::<T>(),
        })
}

pub(crate) fn downcast_mut<'a, T: 'static>(
    value: &'a mut dyn Any,
    component: &'static str,
) -> Result<&'a mut T, HandlerError> {
    value
        .downcast_mut::<T>()
        .ok_or_else(|| HandlerError::TypeMismatch {
            component,
            expected: std::any::type_name::<T>(),
        })
}
