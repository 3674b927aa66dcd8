use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use super::chain::FilterChain;
use super::filter::{ErasedFilter, FilterAdapter};
use super::Filter;
use crate::handler::REGISTRY_TARGET;
use crate::model::{Request, Response, TypeKey};

/// A filter as held by the registry.
#[derive(Clone)]
pub struct RegisteredFilter {
    inner: Arc<dyn ErasedFilter>,
    order: i32,
    sequence: u64,
}

impl RegisteredFilter {
    pub fn name(&self) -> &'static str {
        self.inner.id().name()
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn request_type(&self) -> TypeKey {
        self.inner.request_type()
    }

    pub fn response_type(&self) -> TypeKey {
        self.inner.response_type()
    }

    fn rank(&self) -> (i32, u64) {
        (self.order, self.sequence)
    }

    pub(crate) fn shared(&self) -> &Arc<dyn ErasedFilter> {
        &self.inner
    }
}

impl fmt::Debug for RegisteredFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredFilter")
            .field("filter", &self.name())
            .field("request", &self.request_type().name())
            .field("order", &self.order)
            .finish()
    }
}

/// A filter waiting to be registered.
pub struct FilterRegistration {
    inner: Arc<dyn ErasedFilter>,
}

impl FilterRegistration {
    pub fn new<Q, P, F>(filter: F) -> Self
    where
        Q: Request,
        P: Response,
        F: Filter<Q, P> + 'static,
    {
        Self {
            inner: Arc::new(FilterAdapter::<Q, P, F>::new(filter)),
        }
    }

    pub fn filter_name(&self) -> &'static str {
        self.inner.id().name()
    }

    pub fn request_type(&self) -> TypeKey {
        self.inner.request_type()
    }
}

impl fmt::Debug for FilterRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistration")
            .field("filter", &self.filter_name())
            .field("request", &self.request_type().name())
            .finish()
    }
}

/// Request type → filters, each list kept in ascending order.
#[derive(Default)]
pub struct FilterRegistry {
    table: HashMap<TypeKey, Vec<RegisteredFilter>>,
    next_sequence: u64,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_registrations<I>(registrations: I) -> Self
    where
        I: IntoIterator<Item = FilterRegistration>,
    {
        let mut registry = Self::new();
        registry.register_all(registrations);
        registry
    }

    pub fn bind<Q, P, F>(&mut self, filter: F)
    where
        Q: Request,
        P: Response,
        F: Filter<Q, P> + 'static,
    {
        self.register(FilterRegistration::new::<Q, P, F>(filter));
    }

    pub fn register(&mut self, registration: FilterRegistration) {
        let entry = RegisteredFilter {
            order: registration.inner.order(),
            inner: registration.inner,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;

        debug!(
            target: REGISTRY_TARGET,
            filter = entry.name(),
            request = entry.request_type().name(),
            order = entry.order,
            "bound filter"
        );

        let group = self.table.entry(entry.request_type()).or_default();
        let at = group.partition_point(|existing| existing.rank() <= entry.rank());
        group.insert(at, entry);
    }

    pub fn register_all<I>(&mut self, registrations: I)
    where
        I: IntoIterator<Item = FilterRegistration>,
    {
        let before = self.len();
        for registration in registrations {
            self.register(registration);
        }
        info!(
            target: REGISTRY_TARGET,
            added = self.len() - before,
            total = self.len(),
            "filter registry populated"
        );
    }

    /// Filters bound to `request`, in ascending order.
    pub fn filters_for(&self, request: TypeKey) -> &[RegisteredFilter] {
        self.table.get(&request).map(Vec::as_slice).unwrap_or(&[])
    }

    /// A fresh chain holding the filters bound to `request`, without target.
    pub fn chain_for<'a>(&self, request: TypeKey) -> FilterChain<'a> {
        let mut chain = FilterChain::new();
        chain.add_filters(self.filters_for(request));
        chain
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = &RegisteredFilter> {
        self.table.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.table.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.table.values().all(Vec::is_empty)
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("requests", &self.table.len())
            .field("filters", &self.len())
            .finish()
    }
}
