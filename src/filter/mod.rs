//! Filters - explicit-forwarding middleware in front of the handler.
//!
//! ```text
//! FilterChain [F1, F2] -> target
//!
//! do_filter ──> F1.do_filter ──> chain.do_filter ──> F2.do_filter ──> chain.do_filter ──> handler
//!                    │
//!                    └── returns without forwarding: F2 and handler never run
//! ```
//!
//! Unlike interceptors, a filter has no separate before/after phases: it runs
//! code before and after `chain.do_filter` in one method.

mod chain;
mod filter;
mod registry;

pub use chain::FilterChain;
pub use filter::Filter;
pub use registry::{FilterRegistration, FilterRegistry, RegisteredFilter};
