use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use super::interceptor::{ErasedInterceptor, InterceptorAdapter};
use super::Interceptor;
use crate::handler::{Handler, REGISTRY_TARGET};
use crate::model::{Request, Response, TypeKey};

/// What an interceptor is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterceptorKey {
    /// Every dispatch of this request type.
    Request(TypeKey),
    /// Every dispatch that reaches this handler type.
    Handler(TypeKey),
}

impl InterceptorKey {
    pub fn request<Q: Request>() -> Self {
        InterceptorKey::Request(TypeKey::of::<Q>())
    }

    pub fn handler<H: 'static>() -> Self {
        InterceptorKey::Handler(TypeKey::of::<H>())
    }

    pub fn type_key(&self) -> TypeKey {
        match self {
            InterceptorKey::Request(key) | InterceptorKey::Handler(key) => *key,
        }
    }
}

impl fmt::Display for InterceptorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterceptorKey::Request(key) => write!(f, "request {key}"),
            InterceptorKey::Handler(key) => write!(f, "handler {key}"),
        }
    }
}

/// An interceptor as held by the registry.
#[derive(Clone)]
pub struct RegisteredInterceptor {
    inner: Arc<dyn ErasedInterceptor>,
    key: InterceptorKey,
    order: i32,
    sequence: u64,
}

impl RegisteredInterceptor {
    pub fn name(&self) -> &'static str {
        self.inner.id().name()
    }

    pub fn id(&self) -> TypeKey {
        self.inner.id()
    }

    pub fn key(&self) -> InterceptorKey {
        self.key
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    /// Registration sequence; breaks ties between equal orders.
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

    pub(crate) fn erased(&self) -> &dyn ErasedInterceptor {
        self.inner.as_ref()
    }
}

impl fmt::Debug for RegisteredInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredInterceptor")
            .field("interceptor", &self.name())
            .field("key", &self.key)
            .field("order", &self.order)
            .finish()
    }
}

/// An interceptor waiting to be registered.
pub struct InterceptorRegistration {
    inner: Arc<dyn ErasedInterceptor>,
    key: InterceptorKey,
}

impl InterceptorRegistration {
    /// Bind `interceptor` to every dispatch of request type `Q`.
    pub fn for_request<Q, P, I>(interceptor: I) -> Self
    where
        Q: Request,
        P: Response,
        I: Interceptor<Q, P> + 'static,
    {
        Self {
            inner: Arc::new(InterceptorAdapter::<Q, P, I>::new(interceptor)),
            key: InterceptorKey::request::<Q>(),
        }
    }

    /// Bind `interceptor` to every dispatch handled by `H`.
    pub fn for_handler<H, Q, I>(interceptor: I) -> Self
    where
        Q: Request,
        H: Handler<Q> + 'static,
        I: Interceptor<Q, H::Response> + 'static,
    {
        Self {
            inner: Arc::new(InterceptorAdapter::<Q, H::Response, I>::new(interceptor)),
            key: InterceptorKey::handler::<H>(),
        }
    }

    pub fn key(&self) -> InterceptorKey {
        self.key
    }

    pub fn interceptor_name(&self) -> &'static str {
        self.inner.id().name()
    }
}

impl fmt::Debug for InterceptorRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorRegistration")
            .field("interceptor", &self.interceptor_name())
            .field("key", &self.key)
            .finish()
    }
}

/// Interceptors grouped by what they are bound to, each group kept sorted by
/// ascending order with registration order breaking ties.
#[derive(Default)]
pub struct InterceptorRegistry {
    table: HashMap<InterceptorKey, Vec<RegisteredInterceptor>>,
    next_sequence: u64,
}

impl InterceptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_registrations<I>(registrations: I) -> Self
    where
        I: IntoIterator<Item = InterceptorRegistration>,
    {
        let mut registry = Self::new();
        registry.register_all(registrations);
        registry
    }

    pub fn bind_request<Q, P, I>(&mut self, interceptor: I)
    where
        Q: Request,
        P: Response,
        I: Interceptor<Q, P> + 'static,
    {
        self.register(InterceptorRegistration::for_request::<Q, P, I>(interceptor));
    }

    pub fn bind_handler<H, Q, I>(&mut self, interceptor: I)
    where
        Q: Request,
        H: Handler<Q> + 'static,
        I: Interceptor<Q, H::Response> + 'static,
    {
        self.register(InterceptorRegistration::for_handler::<H, Q, I>(interceptor));
    }

    pub fn register(&mut self, registration: InterceptorRegistration) {
        let entry = RegisteredInterceptor {
            order: registration.inner.order(),
            inner: registration.inner,
            key: registration.key,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;

        debug!(
            target: REGISTRY_TARGET,
            interceptor = entry.name(),
            key = %entry.key,
            order = entry.order,
            "bound interceptor"
        );

        let group = self.table.entry(entry.key).or_default();
        let at = group.partition_point(|existing| existing.rank() <= entry.rank());
        group.insert(at, entry);
    }

    pub fn register_all<I>(&mut self, registrations: I)
    where
        I: IntoIterator<Item = InterceptorRegistration>,
    {
        let before = self.len();
        for registration in registrations {
            self.register(registration);
        }
        info!(
            target: REGISTRY_TARGET,
            added = self.len() - before,
            total = self.len(),
            "interceptor registry populated"
        );
    }

    /// Interceptors bound to `key`, in ascending order.
    pub fn interceptors_for(&self, key: &InterceptorKey) -> &[RegisteredInterceptor] {
        self.table.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every interceptor that applies to a dispatch of `request` reaching
    /// `handler`, merged into one ascending chain.
    pub fn chain_for(&self, request: TypeKey, handler: TypeKey) -> Vec<RegisteredInterceptor> {
        let by_request = self.interceptors_for(&InterceptorKey::Request(request));
        let by_handler = self.interceptors_for(&InterceptorKey::Handler(handler));

        let mut chain: Vec<_> = by_request.iter().chain(by_handler).cloned().collect();
        chain.sort_by_key(RegisteredInterceptor::rank);
        chain
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = &RegisteredInterceptor> {
        self.table.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.table.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.table.values().all(Vec::is_empty)
    }
}

impl fmt::Debug for InterceptorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorRegistry")
            .field("keys", &self.table.len())
            .field("interceptors", &self.len())
            .finish()
    }
}
