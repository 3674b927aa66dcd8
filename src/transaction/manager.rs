use tracing::{debug, error, warn};

use crate::error::TransactionError;

/// Tracing target for transaction boundaries.
pub(crate) const TRANSACTION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transaction");

/// Handle to an open transaction.
///
/// Not `Clone`: `commit` and `rollback` take the token by value, so each
/// transaction is finished exactly once.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct TransactionToken(u64);

impl TransactionToken {
    pub fn new(id: u64) -> Self {
        TransactionToken(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Transaction boundary around a dispatch.
///
/// Implementations talk to whatever actually holds the transaction (a
/// database connection, a unit of work). The dispatcher calls `begin` before
/// the pipeline and exactly one of `commit` / `rollback` afterwards.
pub trait TransactionManager: Send + Sync {
    fn begin(&self) -> Result<TransactionToken, TransactionError>;

    fn commit(&self, token: TransactionToken) -> Result<(), TransactionError>;

    fn rollback(&self, token: TransactionToken) -> Result<(), TransactionError>;
}

/// Scope of one open transaction.
///
/// Finish it with [`commit`](TransactionGuard::commit) or
/// [`rollback`](TransactionGuard::rollback). A guard dropped unfinished (for
/// instance while a panic unwinds through the pipeline) rolls back.
pub struct TransactionGuard<'a> {
    manager: &'a dyn TransactionManager,
    token: Option<TransactionToken>,
}

impl<'a> TransactionGuard<'a> {
    pub fn begin(manager: &'a dyn TransactionManager) -> Result<Self, TransactionError> {
        let token = manager.begin()?;
        debug!(target: TRANSACTION_TARGET, id = token.id(), "transaction started");
        Ok(Self {
            manager,
            token: Some(token),
        })
    }

    /// Id of the open transaction.
    pub fn id(&self) -> Option<u64> {
        self.token.as_ref().map(TransactionToken::id)
    }

    pub fn commit(mut self) -> Result<(), TransactionError> {
        match self.token.take() {
            Some(token) => {
                let id = token.id();
                self.manager.commit(token)?;
                debug!(target: TRANSACTION_TARGET, id, "transaction committed");
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn rollback(mut self) -> Result<(), TransactionError> {
        match self.token.take() {
            Some(token) => {
                let id = token.id();
                self.manager.rollback(token)?;
                debug!(target: TRANSACTION_TARGET, id, "transaction rolled back");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            let id = token.id();
            warn!(target: TRANSACTION_TARGET, id, "transaction dropped unfinished, rolling back");
            if let Err(err) = self.manager.rollback(token) {
                error!(target: TRANSACTION_TARGET, id, error = %err, "rollback failed");
            }
        }
    }
}
