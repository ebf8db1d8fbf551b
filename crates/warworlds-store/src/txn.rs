//! Transactions.

use crate::engine::{EngineTransaction, RawEntry, Table};
use crate::error::{Error, Result};
use std::cell::RefCell;
use std::ops::Bound;

/// A unit of work spanning any number of stores.
///
/// Obtained from [`DataStore::begin_transaction`](crate::DataStore::begin_transaction).
/// Either [`commit`](Self::commit) it or let it drop (or [`abort`](Self::abort)
/// it) to discard every write made through it.
///
/// An engine failure, or a write whose index maintenance failed, poisons the
/// transaction: every later operation returns [`Error::Aborted`] and `commit`
/// rolls back instead. A transaction is not
/// `Send`; each thread begins its own.
pub struct Transaction<'s> {
    inner: Box<dyn EngineTransaction + 's>,
    poisoned: RefCell<Option<String>>,
    scan_batch_size: usize,
}

impl<'s> Transaction<'s> {
    pub(crate) fn new(inner: Box<dyn EngineTransaction + 's>, scan_batch_size: usize) -> Self {
        Self {
            inner,
            poisoned: RefCell::new(None),
            scan_batch_size: scan_batch_size.max(1),
        }
    }

    /// Whether an earlier failure doomed this transaction.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.borrow().is_some()
    }

    /// Commit every write made in this transaction.
    pub fn commit(self) -> Result<()> {
        let Transaction {
            inner, poisoned, ..
        } = self;
        if let Some(reason) = poisoned.into_inner() {
            tracing::warn!(%reason, "Rolling back poisoned transaction instead of committing");
            inner.abort()?;
            return Err(Error::Aborted(reason));
        }
        inner.commit()
    }

    /// Discard every write made in this transaction.
    pub fn abort(self) -> Result<()> {
        self.inner.abort()
    }

    pub(crate) fn scan_batch_size(&self) -> usize {
        self.scan_batch_size
    }

    /// Doom the transaction. The first reason given is kept.
    pub(crate) fn poison(&self, reason: impl ToString) {
        let mut poisoned = self.poisoned.borrow_mut();
        if poisoned.is_none() {
            let reason = reason.to_string();
            tracing::warn!(%reason, "Transaction poisoned");
            *poisoned = Some(reason);
        }
    }

    fn guard<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(Error::StorageUnavailable(reason)) = &result {
            self.poison(reason);
        }
        result
    }

    fn check(&self) -> Result<()> {
        match self.poisoned.borrow().as_ref() {
            Some(reason) => Err(Error::Aborted(reason.clone())),
            None => Ok(()),
        }
    }

    pub(crate) fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.check()?;
        self.guard(self.inner.get(table, key))
    }

    pub(crate) fn put(&self, table: Table, key: &[u8], value: &[u8]) -> Result<()> {
        self.check()?;
        self.guard(self.inner.put(table, key, value))
    }

    pub(crate) fn delete(&self, table: Table, key: &[u8]) -> Result<bool> {
        self.check()?;
        self.guard(self.inner.delete(table, key))
    }

    pub(crate) fn range(
        &self,
        table: Table,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        limit: usize,
    ) -> Result<Vec<RawEntry>> {
        self.check()?;
        self.guard(self.inner.range(table, lower, upper, limit))
    }
}
