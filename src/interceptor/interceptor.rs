use std::any::Any;
use std::marker::PhantomData;

use super::registry::RegisteredInterceptor;
use crate::error::HandlerError;
use crate::handler::{downcast_mut, downcast_ref};
use crate::model::{Request, Response, TypeKey};

/// Outcome of an interceptor phase.
///
/// Together with `Err(HandlerError)` this gives every phase three possible
/// results: carry on, stop the pipeline here, or fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

impl Flow {
    pub fn is_stop(self) -> bool {
        self == Flow::Stop
    }
}

impl From<bool> for Flow {
    /// `true` continues, `false` stops.
    fn from(proceed: bool) -> Self {
        if proceed {
            Flow::Continue
        } else {
            Flow::Stop
        }
    }
}

/// Cross-cutting logic around a handler.
///
/// Interceptors bound to the same request or handler run in ascending
/// [`order`](Interceptor::order) for `before` and `around`, and in
/// descending order for `after_return` and `after_throwing`, so the first
/// interceptor is the outermost layer.
///
/// Every phase is optional. The default `around` proceeds to the next layer,
/// the others continue without doing anything.
pub trait Interceptor<Q: Request, P: Response>: Send + Sync {
    /// Priority; lower runs first.
    fn order(&self) -> i32 {
        0
    }

    /// Runs before the handler. `Stop` skips the handler and every later
    /// phase.
    fn before(&self, _request: &Q, _response: &mut P) -> Result<Flow, HandlerError> {
        Ok(Flow::Continue)
    }

    /// Wraps the handler. Call `next.proceed` to run the inner layers and
    /// the handler; return without calling it to skip them.
    fn around(
        &self,
        request: &Q,
        response: &mut P,
        next: Next<'_, Q, P>,
    ) -> Result<Flow, HandlerError> {
        next.proceed(request, response)
    }

    /// Runs after the handler succeeded. `Stop` skips the remaining
    /// after-return interceptors.
    fn after_return(&self, _request: &Q, _response: &mut P) -> Result<Flow, HandlerError> {
        Ok(Flow::Continue)
    }

    /// Runs after the handler (or an around layer) failed.
    ///
    /// `Continue` lets the error travel on, `Stop` swallows it so the
    /// dispatch succeeds with the response as it stands, and `Err` replaces
    /// it.
    fn after_throwing(
        &self,
        _request: &Q,
        _response: &mut P,
        _error: &HandlerError,
    ) -> Result<Flow, HandlerError> {
        Ok(Flow::Continue)
    }
}

/// Terminal call at the centre of the around layers.
pub(crate) type Target<'a> = dyn Fn(&dyn Any, &mut dyn Any) -> Result<(), HandlerError> + 'a;

/// Continuation handed to [`Interceptor::around`].
///
/// Consumed by [`proceed`](Next::proceed), so the inner layers and the
/// handler run at most once per dispatch.
pub struct Next<'a, Q, P> {
    inner: ErasedNext<'a>,
    _types: PhantomData<fn(&Q, &mut P)>,
}

impl<'a, Q: Request, P: Response> Next<'a, Q, P> {
    fn new(inner: ErasedNext<'a>) -> Self {
        Self {
            inner,
            _types: PhantomData,
        }
    }

    /// Run the remaining around layers and then the handler.
    ///
    /// Returns `Stop` if an inner layer stopped.
    pub fn proceed(self, request: &Q, response: &mut P) -> Result<Flow, HandlerError> {
        self.inner.proceed(request, response)
    }
}

pub(crate) struct ErasedNext<'a> {
    chain: &'a [RegisteredInterceptor],
    target: &'a Target<'a>,
}

impl<'a> ErasedNext<'a> {
    pub(crate) fn new(chain: &'a [RegisteredInterceptor], target: &'a Target<'a>) -> Self {
        Self { chain, target }
    }

    pub(crate) fn proceed(
        self,
        request: &dyn Any,
        response: &mut dyn Any,
    ) -> Result<Flow, HandlerError> {
        match self.chain.split_first() {
            Some((outer, rest)) => outer.erased().around(
                request,
                response,
                ErasedNext {
                    chain: rest,
                    target: self.target,
                },
            ),
            None => {
                (self.target)(request, response)?;
                Ok(Flow::Continue)
            }
        }
    }
}

/// Type-erased interceptor as stored in the registry.
pub(crate) trait ErasedInterceptor: Send + Sync {
    fn id(&self) -> TypeKey;
    fn order(&self) -> i32;
    fn request_type(&self) -> TypeKey;
    fn response_type(&self) -> TypeKey;

    fn before(&self, request: &dyn Any, response: &mut dyn Any) -> Result<Flow, HandlerError>;

    fn around(
        &self,
        request: &dyn Any,
        response: &mut dyn Any,
        next: ErasedNext<'_>,
    ) -> Result<Flow, HandlerError>;

    fn after_return(&self, request: &dyn Any, response: &mut dyn Any)
        -> Result<Flow, HandlerError>;

    fn after_throwing(
        &self,
        request: &dyn Any,
        response: &mut dyn Any,
        error: &HandlerError,
    ) -> Result<Flow, HandlerError>;
}

pub(crate) struct InterceptorAdapter<Q, P, I> {
    id: TypeKey,
    interceptor: I,
    _types: PhantomData<fn(&Q, &mut P)>,
}

impl<Q, P, I> InterceptorAdapter<Q, P, I>
where
    Q: Request,
    P: Response,
    I: Interceptor<Q, P> + 'static,
{
    pub(crate) fn new(interceptor: I) -> Self {
        Self {
            id: TypeKey::of::<I>(),
            interceptor,
            _types: PhantomData,
        }
    }
}

impl<Q, P, I> ErasedInterceptor for InterceptorAdapter<Q, P, I>
where
    Q: Request,
    P: Response,
    I: Interceptor<Q, P>,
{
    fn id(&self) -> TypeKey {
        self.id
    }

    fn order(&self) -> i32 {
        self.interceptor.order()
    }

    fn request_type(&self) -> TypeKey {
        TypeKey::of::<Q>()
    }

    fn response_type(&self) -> TypeKey {
        TypeKey::of::<P>()
    }

    fn before(&self, request: &dyn Any, response: &mut dyn Any) -> Result<Flow, HandlerError> {
        let request = downcast_ref::<Q>(request, self.id.name())?;
        let response = downcast_mut::<P>(response, self.id.name())?;
        self.interceptor.before(request, response)
    }

    fn around(
        &self,
        request: &dyn Any,
        response: &mut dyn Any,
        next: ErasedNext<'_>,
    ) -> Result<Flow, HandlerError> {
        let request = downcast_ref::<Q>(request, self.id.name())?;
        let response = downcast_mut::<P>(response, self.id.name())?;
        self.interceptor.around(request, response, Next::new(next))
    }

    fn after_return(
        &self,
        request: &dyn Any,
        response: &mut dyn Any,
    ) -> Result<Flow, HandlerError> {
        let request = downcast_ref::<Q>(request, self.id.name())?;
        let response = downcast_mut::<P>(response, self.id.name())?;
        self.interceptor.after_return(request, response)
    }

    fn after_throwing(
        &self,
        request: &dyn Any,
        response: &mut dyn Any,
        error: &HandlerError,
    ) -> Result<Flow, HandlerError> {
        let request = downcast_ref::<Q>(request, self.id.name())?;
        let response = downcast_mut::<P>(response, self.id.name())?;
        self.interceptor.after_throwing(request, response, error)
    }
}
