//! Request and response model.
//!
//! Any `Send + Sync + 'static` type can be a request, and any
//! `Default + Serialize + Send + Sync + 'static` type can be a response. The
//! dispatch key is the request's concrete type; the response type is fixed
//! by the handler that serves it.

mod response;
mod type_key;

pub use response::{BodyResponse, PageResponse, ResponseValue};
pub use type_key::{ResponseType, TypeKey};

use serde::Serialize;

/// Marker for values that can be dispatched.
pub trait Request: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Request for T {}

/// Marker for values a handler can populate.
///
/// The dispatcher default-constructs a fresh response for every dispatch.
pub trait Response: Default + Serialize + Send + Sync + 'static {}

impl<T: Default + Serialize + Send + Sync + 'static> Response for T {}
