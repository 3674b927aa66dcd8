//! Transaction boundary - optional begin/commit/rollback around a dispatch.
//!
//! [`TransactionManager`] is the seam to the store that owns the
//! transaction; [`InMemoryTransactionManager`] is the reference
//! implementation used by tests and examples.

mod in_memory;
mod manager;

pub use in_memory::{InMemoryTransactionManager, TransactionEvent};
pub(crate) use manager::TRANSACTION_TARGET;
pub use manager::{TransactionGuard, TransactionManager, TransactionToken};
