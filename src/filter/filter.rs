use std::any::Any;
use std::marker::PhantomData;

use super::chain::FilterChain;
use crate::error::HandlerError;
use crate::handler::{downcast_mut, downcast_ref};
use crate::model::{Request, Response, TypeKey};

/// Middleware in front of a handler.
///
/// A filter decides whether the dispatch goes on: it must call
/// `chain.do_filter(request, response)` to hand over to the next filter (or
/// the handler, after the last one). Returning without calling it
/// short-circuits everything behind it.
///
/// ```ignore
/// struct RequireTenant;
///
/// impl Filter<CreateOrder, BodyResponse<u64>> for RequireTenant {
///     fn do_filter(
///         &self,
///         request: &CreateOrder,
///         response: &mut BodyResponse<u64>,
///         chain: &mut FilterChain<'_>,
///     ) -> Result<(), HandlerError> {
///         if request.tenant.is_empty() {
///             return Err(HandlerError::Unauthorized("tenant required".into()));
///         }
///         chain.do_filter(request, response)
///     }
/// }
/// ```
pub trait Filter<Q: Request, P: Response>: Send + Sync {
    /// Priority; lower runs first.
    fn order(&self) -> i32 {
        0
    }

    /// Called right before this filter's `do_filter`.
    fn init(&self) {}

    fn do_filter(
        &self,
        request: &Q,
        response: &mut P,
        chain: &mut FilterChain<'_>,
    ) -> Result<(), HandlerError>;

    /// Called right after this filter's `do_filter`, even if it failed or
    /// panicked.
    fn destroy(&self) {}
}

/// Type-erased filter as stored in registries and chains.
pub(crate) trait ErasedFilter: Send + Sync {
    fn id(&self) -> TypeKey;
    fn order(&self) -> i32;
    fn request_type(&self) -> TypeKey;
    fn response_type(&self) -> TypeKey;
    fn init(&self);
    fn destroy(&self);

    fn do_filter(
        &self,
        request: &dyn Any,
        response: &mut dyn Any,
        chain: &mut FilterChain<'_>,
    ) -> Result<(), HandlerError>;
}

pub(crate) struct FilterAdapter<Q, P, F> {
    id: TypeKey,
    filter: F,
    _types: PhantomData<fn(&Q, &mut P)>,
}

impl<Q, P, F> FilterAdapter<Q, P, F>
where
    Q: Request,
    P: Response,
    F: Filter<Q, P> + 'static,
{
    pub(crate) fn new(filter: F) -> Self {
        Self {
            id: TypeKey::of::<F>(),
            filter,
            _types: PhantomData,
        }
    }
}

impl<Q, P, F> ErasedFilter for FilterAdapter<Q, P, F>
where
    Q: Request,
    P: Response,
    F: Filter<Q, P>,
{
    fn id(&self) -> TypeKey {
        self.id
    }

    fn order(&self) -> i32 {
        self.filter.order()
    }

    fn request_type(&self) -> TypeKey {
        TypeKey::of::<Q>()
    }

    fn response_type(&self) -> TypeKey {
        TypeKey::of::<P>()
    }

    fn init(&self) {
        self.filter.init();
    }

    fn destroy(&self) {
        self.filter.destroy();
    }

    fn do_filter(
        &self,
        request: &dyn Any,
        response: &mut dyn Any,
        chain: &mut FilterChain<'_>,
    ) -> Result<(), HandlerError> {
        let request = downcast_ref::<Q>(request, self.id.name())?;
        let response = downcast_mut::<P>(response, self.id.name())?;
        self.filter.do_filter(request, response, chain)
    }
}

/// Brackets one filter invocation with `init` and `destroy`.
pub(crate) struct FilterScope<'a> {
    filter: &'a dyn ErasedFilter,
}

impl<'a> FilterScope<'a> {
    pub(crate) fn enter(filter: &'a dyn ErasedFilter) -> Self {
        filter.init();
        Self { filter }
    }
}

impl Drop for FilterScope<'_> {
    fn drop(&mut self) {
        self.filter.destroy();
    }
}
