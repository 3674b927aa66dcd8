//! Dispatcher integration tests.
//!
//! Exercises the public surface end to end:
//! - Handler registration and lookup
//! - Interceptor and filter pipelines
//! - Transactional wrapping
//! - Attribute macros and `register_handlers!`
//! - Sharing one dispatcher across threads

mod support;
mod macros;
mod registration;
mod threaded;
mod transactions;
