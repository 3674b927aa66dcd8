use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use super::{Response, ResponseType};
use crate::error::HandlerError;

/// A response produced by a dispatch whose concrete type is only known at
/// runtime.
///
/// Recover the concrete value with [`ResponseValue::downcast`], or render it
/// with [`ResponseValue::to_json`].
pub struct ResponseValue {
    value: Box<dyn Any + Send + Sync>,
    ty: ResponseType,
}

impl ResponseValue {
    pub(crate) fn new(value: Box<dyn Any + Send + Sync>, ty: ResponseType) -> Self {
        Self { value, ty }
    }

    pub fn response_type(&self) -> ResponseType {
        self.ty
    }

    /// Fully qualified name of the concrete response type.
    pub fn type_name(&self) -> &'static str {
        self.ty.name()
    }

    pub fn is<P: Response>(&self) -> bool {
        self.ty.key().is::<P>()
    }

    pub fn downcast_ref<P: Response>(&self) -> Option<&P> {
        self.value.downcast_ref::<P>()
    }

    /// Take the concrete response out.
    pub fn downcast<P: Response>(self) -> Result<P, HandlerError> {
        let actual = self.ty.name();
        self.value
            .downcast::<P>()
            .map(|boxed| *boxed)
            .map_err(|_| HandlerError::ResponseMismatch {
                expected: std::any::type_name::<P>(),
                actual,
            })
    }

    pub fn to_json(&self) -> serde_json::Result<Value> {
        self.ty.render(&*self.value)
    }
}

impl fmt::Debug for ResponseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseValue")
            .field("type", &self.ty.name())
            .finish_non_exhaustive()
    }
}

impl Serialize for ResponseValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = self.to_json().map_err(serde::ser::Error::custom)?;
        value.serialize(serializer)
    }
}

/// Response with a single payload field.
///
/// Handlers that only produce one value can respond with `BodyResponse<B>`
/// and callers can pull the payload out with `Dispatcher::execute_body`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyResponse<B> {
    pub body: B,
}

impl<B> BodyResponse<B> {
    pub fn set_body(&mut self, body: B) {
        self.body = body;
    }

    pub fn into_body(self) -> B {
        self.body
    }
}

/// One page of a paginated result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResponse<T> {
    pub total: u64,
    pub page_index: u64,
    pub page_size: u64,
    pub results: Vec<T>,
}

impl<T> Default for PageResponse<T> {
    fn default() -> Self {
        Self {
            total: 0,
            page_index: 0,
            page_size: 0,
            results: Vec::new(),
        }
    }
}

impl<T> PageResponse<T> {
    /// Fill this page from a full result set.
    ///
    /// `page_index` is zero-based. Out-of-range pages come back empty with
    /// `total` still set.
    pub fn fill(&mut self, all: Vec<T>, page_index: u64, page_size: u64) {
        self.total = all.len() as u64;
        self.page_index = page_index;
        self.page_size = page_size;
        let skip = usize::try_from(page_index.saturating_mul(page_size)).unwrap_or(usize::MAX);
        let take = usize::try_from(page_size).unwrap_or(usize::MAX);
        self.results = all.into_iter().skip(skip).take(take).collect();
    }

    /// Number of pages needed to hold `total` records.
    pub fn page_count(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(self.page_size)
    }
}
