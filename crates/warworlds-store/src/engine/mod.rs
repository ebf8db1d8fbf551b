//! The transactional key-value engine the stores run on.
//!
//! The stores only need a narrow surface: named tables, transactions, point
//! get/put/delete and an ordered range read. [`Engine`] and
//! [`EngineTransaction`] describe that surface so the store logic does not
//! depend on a particular engine:
//!
//! - [`NativeEngine`]: `native_db` (redb underneath), file-backed or in memory
//! - [`FaultyEngine`]: wraps another engine and fails chosen writes
//!
//! Engines must give serializable transactions. `native_db` admits one write
//! transaction at a time, which satisfies this; read-only transactions run
//! beside it on the last committed snapshot.

mod faulty;
mod native;

pub use faulty::{FaultInjector, FaultyEngine};
pub use native::NativeEngine;

use crate::error::{Error, Result};
use std::ops::Bound;

/// Handle to a named table, obtained once from [`Engine::open_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Table {
    name: &'static str,
}

impl Table {
    /// Validate a table name and wrap it.
    ///
    /// Names must be non-empty ASCII alphanumerics, since engines may use
    /// other characters to separate the table from the key.
    pub fn new(name: &'static str) -> Result<Self> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidKey(format!("invalid table name {:?}", name)));
        }
        Ok(Self { name })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// A raw entry as stored by the engine.
pub type RawEntry = (Vec<u8>, Vec<u8>);

/// A transactional key-value engine.
pub trait Engine: Send + Sync {
    /// Open (creating if needed) a named table.
    fn open_table(&self, name: &'static str) -> Result<Table>;

    /// Begin a read-write transaction. Blocks while another write
    /// transaction is open, including one held by the calling thread.
    fn begin(&self) -> Result<Box<dyn EngineTransaction + '_>>;

    /// Begin a read-only snapshot transaction. Never waits for writers;
    /// `put` and `delete` fail with [`Error::ReadOnly`].
    fn begin_read(&self) -> Result<Box<dyn EngineTransaction + '_>>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// One transaction against an [`Engine`].
///
/// Reads observe the transaction's own writes and nothing committed after it
/// began. Dropping the transaction without committing discards its writes.
pub trait EngineTransaction {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Insert or overwrite.
    fn put(&self, table: Table, key: &[u8], value: &[u8]) -> Result<()>;

    /// Remove; returns whether an entry existed.
    fn delete(&self, table: Table, key: &[u8]) -> Result<bool>;

    /// Up to `limit` entries with keys in `(lower, upper)`, in key order.
    fn range(
        &self,
        table: Table,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        limit: usize,
    ) -> Result<Vec<RawEntry>>;

    fn commit(self: Box<Self>) -> Result<()>;

    fn abort(self: Box<Self>) -> Result<()>;
}
