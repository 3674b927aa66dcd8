//! Interceptors - ordered before/around/after phases wrapped around a handler.
//!
//! ## Architecture
//!
//! ```text
//! InterceptorRegistry                     InterceptorExecutor
//!   Request(Ping)   -> [Audit(0), Auth(5)]      |
//!   Handler(PingH)  -> [Timing(1)]              | chain_for(Ping, PingH)
//!                                               v
//!                                  [Audit(0), Timing(1), Auth(5)]
//! ```
//!
//! Interceptors are bound either to a request type (every dispatch of that
//! request) or to a handler type (every dispatch that handler serves). The
//! executor merges both groups into one chain ordered by priority.
//!
//! ## Quick Start
//!
//! ```ignore
//! struct Audit;
//!
//! impl Interceptor<Ping, BodyResponse<String>> for Audit {
//!     fn before(&self, _request: &Ping, _response: &mut BodyResponse<String>) -> Result<Flow, HandlerError> {
//!         Ok(Flow::Continue)
//!     }
//! }
//!
//! let mut registry = InterceptorRegistry::new();
//! registry.bind_request::<Ping, BodyResponse<String>, _>(Audit);
//! ```

mod executor;
mod interceptor;
mod registry;

pub use executor::InterceptorExecutor;
pub use interceptor::{Flow, Interceptor, Next};
pub use registry::{
    InterceptorKey, InterceptorRegistration, InterceptorRegistry, RegisteredInterceptor,
};
