//! Handlers and the handler registry.
//!
//! A handler serves exactly one request type and fills exactly one response
//! type. Handlers are registered once at startup; the registry then maps
//! each request type to its handler and each handler to its response type.
//!
//! ## Quick Start
//!
//! ```ignore
//! use typed_dispatch::{handler_fn, BodyResponse, HandlerRegistry};
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register(handler_fn(|_: &Ping, response: &mut BodyResponse<String>| {
//!     response.body = "pong".into();
//!     Ok(())
//! }))?;
//!
//! let handler = registry.resolve::<Ping>()?;
//! ```

mod handler;
mod registry;

pub(crate) use handler::{downcast_mut, downcast_ref, BoundHandler, ErasedHandler};
pub use handler::{handler_fn, FnHandler, Handler};
pub(crate) use registry::REGISTRY_TARGET;
pub use registry::{HandlerRegistration, HandlerRegistry, RegisteredHandler};
