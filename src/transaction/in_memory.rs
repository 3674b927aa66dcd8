use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{TransactionManager, TransactionToken};
use crate::error::TransactionError;

/// Something that happened to an in-memory transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionEvent {
    Begin(u64),
    Commit(u64),
    Rollback(u64),
}

#[derive(Default)]
struct Journal {
    next_id: u64,
    active: HashSet<u64>,
    events: Vec<TransactionEvent>,
}

impl Journal {
    fn finish(&mut self, token: &TransactionToken) -> Result<(), TransactionError> {
        if self.active.remove(&token.id()) {
            Ok(())
        } else {
            Err(TransactionError::NotActive(token.id()))
        }
    }
}

/// Reference transaction manager that only keeps a journal.
///
/// Ids start at 1. With [`fail_commits`](InMemoryTransactionManager::fail_commits)
/// switched on, every commit is refused and the transaction is rolled back
/// instead, the way a database aborts a transaction it cannot commit.
#[derive(Default)]
pub struct InMemoryTransactionManager {
    journal: Mutex<Journal>,
    fail_commits: AtomicBool,
}

impl InMemoryTransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Everything recorded so far, oldest first.
    pub fn events(&self) -> Vec<TransactionEvent> {
        self.read().events.clone()
    }

    pub fn committed(&self) -> usize {
        self.count(|e| matches!(e, TransactionEvent::Commit(_)))
    }

    pub fn rolled_back(&self) -> usize {
        self.count(|e| matches!(e, TransactionEvent::Rollback(_)))
    }

    /// Transactions begun but not yet finished.
    pub fn active(&self) -> usize {
        self.read().active.len()
    }

    fn count(&self, pred: impl Fn(&TransactionEvent) -> bool) -> usize {
        self.read().events.iter().filter(|&e| pred(e)).count()
    }

    // Inspection helpers keep working after a poisoning panic.
    fn read(&self) -> MutexGuard<'_, Journal> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> Result<MutexGuard<'_, Journal>, TransactionError> {
        self.journal
            .lock()
            .map_err(|e| TransactionError::Poisoned(e.to_string()))
    }
}

impl TransactionManager for InMemoryTransactionManager {
    fn begin(&self) -> Result<TransactionToken, TransactionError> {
        let mut journal = self.write()?;
        journal.next_id += 1;
        let id = journal.next_id;
        journal.active.insert(id);
        journal.events.push(TransactionEvent::Begin(id));
        Ok(TransactionToken::new(id))
    }

    fn commit(&self, token: TransactionToken) -> Result<(), TransactionError> {
        let mut journal = self.write()?;
        journal.finish(&token)?;
        if self.fail_commits.load(Ordering::SeqCst) {
            journal.events.push(TransactionEvent::Rollback(token.id()));
            return Err(TransactionError::CommitFailed {
                id: token.id(),
                reason: "commits are switched off".into(),
            });
        }
        journal.events.push(TransactionEvent::Commit(token.id()));
        Ok(())
    }

    fn rollback(&self, token: TransactionToken) -> Result<(), TransactionError> {
        let mut journal = self.write()?;
        journal.finish(&token)?;
        journal.events.push(TransactionEvent::Rollback(token.id()));
        Ok(())
    }
}
