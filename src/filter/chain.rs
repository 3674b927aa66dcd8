use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::filter::{ErasedFilter, FilterAdapter, FilterScope};
use super::registry::RegisteredFilter;
use super::Filter;
use crate::error::HandlerError;
use crate::handler::{BoundHandler, ErasedHandler, Handler};
use crate::model::{Request, Response};

/// Per-dispatch sequence of filters in front of one target handler.
///
/// Each call to [`do_filter`](FilterChain::do_filter) runs the filter at the
/// current position and advances past it; once every filter has run, the
/// next call invokes the target. A chain is single-use: after the target ran,
/// further calls fail with [`HandlerError::ChainExhausted`] until
/// [`reset_position`](FilterChain::reset_position).
#[derive(Default)]
pub struct FilterChain<'a> {
    filters: Vec<Arc<dyn ErasedFilter>>,
    position: usize,
    target: Option<Box<dyn ErasedHandler + 'a>>,
    invoked: bool,
}

impl<'a> FilterChain<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter. Filters run in the order they were added.
    pub fn add_filter<Q, P, F>(&mut self, filter: F) -> &mut Self
    where
        Q: Request,
        P: Response,
        F: Filter<Q, P> + 'static,
    {
        self.filters
            .push(Arc::new(FilterAdapter::<Q, P, F>::new(filter)));
        self
    }

    /// Append already registered filters, keeping their order.
    pub fn add_filters(&mut self, filters: &[RegisteredFilter]) -> &mut Self {
        self.filters
            .extend(filters.iter().map(|f| Arc::clone(f.shared())));
        self
    }

    /// Bind the handler invoked after the last filter.
    pub fn set_target<Q, H>(&mut self, handler: &'a H) -> &mut Self
    where
        Q: Request,
        H: Handler<Q> + 'static,
    {
        self.target = Some(Box::new(BoundHandler::<Q, _>::borrowed(handler)));
        self
    }

    pub(crate) fn set_erased_target(&mut self, target: Box<dyn ErasedHandler + 'a>) {
        self.target = Some(target);
    }

    /// Run the next filter, or the target once all filters have run.
    pub fn do_filter<Q, P>(&mut self, request: &Q, response: &mut P) -> Result<(), HandlerError>
    where
        Q: Request,
        P: Response,
    {
        self.do_filter_erased(request, response)
    }

    pub(crate) fn do_filter_erased(
        &mut self,
        request: &dyn Any,
        response: &mut dyn Any,
    ) -> Result<(), HandlerError> {
        if let Some(filter) = self.filters.get(self.position).cloned() {
            self.position += 1;
            let _scope = FilterScope::enter(filter.as_ref());
            return filter.do_filter(request, response, self);
        }

        if self.invoked {
            return Err(HandlerError::ChainExhausted);
        }
        let target = self.target.as_ref().ok_or(HandlerError::MissingTarget)?;
        self.invoked = true;
        target.handle_erased(request, response)
    }

    /// Rewind to the first filter so the chain can run again.
    pub fn reset_position(&mut self) {
        self.position = 0;
        self.invoked = false;
    }

    /// Index of the next filter to run.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Whether the target has run since the last reset.
    pub fn target_invoked(&self) -> bool {
        self.invoked
    }
}

impl fmt::Debug for FilterChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filters: Vec<_> = self.filters.iter().map(|f| f.id().name()).collect();
        f.debug_struct("FilterChain")
            .field("filters", &filters)
            .field("position", &self.position)
            .field("target", &self.target.as_ref().map(|t| t.id().name()))
            .field("invoked", &self.invoked)
            .finish()
    }
}
