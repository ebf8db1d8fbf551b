//! Fault injection for engine writes.
//!
//! [`FaultyEngine`] forwards everything to an inner engine, except that once a
//! [`FaultInjector`] is armed for a table, the configured `put` into that
//! table fails with [`Error::StorageUnavailable`] instead of reaching the
//! inner engine. Used to check that a failure between a primary write and its
//! index writes leaves nothing behind.

use super::{Engine, EngineTransaction, RawEntry, Table};
use crate::error::{Error, Result};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct Fault {
    table: &'static str,
    /// Puts into `table` still allowed before the failure.
    remaining: usize,
}

/// Shared switch controlling where a [`FaultyEngine`] fails.
///
/// All state sits behind a mutex and an atomic, so the injector can be held
/// by a test while the engine is used from other threads.
#[derive(Debug, Default)]
pub struct FaultInjector {
    armed: Mutex<Option<Fault>>,
    tripped: AtomicUsize,
}

impl FaultInjector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the put into `table` that follows `after` successful ones. The
    /// injector disarms after firing once.
    pub fn arm(&self, table: &'static str, after: usize) {
        if let Ok(mut armed) = self.armed.lock() {
            *armed = Some(Fault {
                table,
                remaining: after,
            });
        }
    }

    pub fn disarm(&self) {
        if let Ok(mut armed) = self.armed.lock() {
            *armed = None;
        }
    }

    /// How many failures have been injected.
    pub fn tripped(&self) -> usize {
        self.tripped.load(Ordering::SeqCst)
    }

    fn check_put(&self, table: Table) -> Result<()> {
        let mut armed = self
            .armed
            .lock()
            .map_err(|_| Error::StorageUnavailable("fault injector poisoned".to_string()))?;
        let fire = match armed.as_mut() {
            Some(fault) if fault.table == table.name() => {
                if fault.remaining == 0 {
                    true
                } else {
                    fault.remaining -= 1;
                    false
                }
            }
            _ => false,
        };
        if fire {
            *armed = None;
            self.tripped.fetch_add(1, Ordering::SeqCst);
            return Err(Error::StorageUnavailable(format!(
                "injected fault writing to {}",
                table.name()
            )));
        }
        Ok(())
    }
}

/// An engine that fails writes on demand.
pub struct FaultyEngine<E> {
    inner: E,
    injector: Arc<FaultInjector>,
}

impl<E: Engine> FaultyEngine<E> {
    pub fn new(inner: E, injector: Arc<FaultInjector>) -> Self {
        Self { inner, injector }
    }
}

impl<E: Engine> Engine for FaultyEngine<E> {
    fn open_table(&self, name: &'static str) -> Result<Table> {
        self.inner.open_table(name)
    }

    fn begin(&self) -> Result<Box<dyn EngineTransaction + '_>> {
        Ok(Box::new(FaultyTransaction {
            inner: self.inner.begin()?,
            injector: &self.injector,
        }))
    }

    fn begin_read(&self) -> Result<Box<dyn EngineTransaction + '_>> {
        self.inner.begin_read()
    }

    fn describe(&self) -> String {
        format!("faulty({})", self.inner.describe())
    }
}

struct FaultyTransaction<'e> {
    inner: Box<dyn EngineTransaction + 'e>,
    injector: &'e FaultInjector,
}

impl EngineTransaction for FaultyTransaction<'_> {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.inner.get(table, key)
    }

    fn put(&self, table: Table, key: &[u8], value: &[u8]) -> Result<()> {
        self.injector.check_put(table)?;
        self.inner.put(table, key, value)
    }

    fn delete(&self, table: Table, key: &[u8]) -> Result<bool> {
        self.inner.delete(table, key)
    }

    fn range(
        &self,
        table: Table,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        limit: usize,
    ) -> Result<Vec<RawEntry>> {
        self.inner.range(table, lower, upper, limit)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.inner.commit()
    }

    fn abort(self: Box<Self>) -> Result<()> {
        self.inner.abort()
    }
}
