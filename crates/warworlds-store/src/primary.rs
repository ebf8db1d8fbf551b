//! Primary stores: one table per record type, keyed by the record's natural
//! key.

use crate::codec::{self, Record};
use crate::cursor::{RawCursor, Scan};
use crate::engine::Table;
use crate::error::{Error, Result};
use crate::index::{IndexMaintainer, IndexReport};
use crate::keys::StoreKey;
use crate::txn::Transaction;
use std::collections::BTreeSet;
use std::ops::Bound;
use std::sync::Arc;

/// What a write found under its key before replacing it.
enum Previous<R> {
    Absent,
    Present(R),
    Unreadable,
}

/// Typed table of records of type `R`.
///
/// Secondary indexes over `R` are registered when the store is wired up and
/// are kept in step with every `put` and `delete`, inside the caller's
/// transaction.
pub struct PrimaryStore<R: Record> {
    table: Table,
    indexes: Vec<Arc<dyn IndexMaintainer<R>>>,
}

impl<R: Record> PrimaryStore<R> {
    pub(crate) fn new(table: Table) -> Self {
        Self {
            table,
            indexes: Vec::new(),
        }
    }

    /// Register a secondary index maintained on every write.
    pub(crate) fn with_index(mut self, index: Arc<dyn IndexMaintainer<R>>) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn table(&self) -> Table {
        self.table
    }

    /// Look up a record. Absence is `Ok(None)`, not an error.
    pub fn get(&self, txn: &Transaction<'_>, key: &R::Key) -> Result<Option<R>> {
        match txn.get(self.table, &key.to_key_bytes())? {
            Some(bytes) => Ok(Some(codec::decode(R::TABLE, bytes)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, txn: &Transaction<'_>, key: &R::Key) -> Result<bool> {
        Ok(txn.get(self.table, &key.to_key_bytes())?.is_some())
    }

    /// Insert or overwrite the record stored under `record.key()`.
    ///
    /// The previous version is always read first, even when no index is
    /// registered for it to matter today: index maintenance needs the old
    /// index keys to remove entries the new version no longer produces.
    /// Skipping this read leaves orphaned index entries. A previous version
    /// that cannot be decoded is overwritten, and every index entry pointing
    /// at its key is dropped.
    ///
    /// If an index rejects the write (see
    /// [`Error::NameTaken`](crate::Error::NameTaken)), the transaction is
    /// poisoned so the record never commits without its entries.
    pub fn put(&self, txn: &Transaction<'_>, record: &R) -> Result<()> {
        let key = record.key();
        let previous = self.previous(txn, &key)?;

        txn.put(self.table, &key.to_key_bytes(), &codec::encode(record)?)?;
        self.update_indexes(txn, &key, &previous, Some(record))
    }

    /// Remove a record and every index entry derived from it. Returns whether
    /// a record existed. A record that cannot be decoded is still removed.
    pub fn delete(&self, txn: &Transaction<'_>, key: &R::Key) -> Result<bool> {
        let previous = self.previous(txn, key)?;
        if let Previous::Absent = previous {
            return Ok(false);
        }

        txn.delete(self.table, &key.to_key_bytes())?;
        self.update_indexes(txn, key, &previous, None)?;
        Ok(true)
    }

    fn previous(&self, txn: &Transaction<'_>, key: &R::Key) -> Result<Previous<R>> {
        match self.get(txn, key) {
            Ok(Some(record)) => Ok(Previous::Present(record)),
            Ok(None) => Ok(Previous::Absent),
            Err(Error::CorruptRecord { reason, .. }) => {
                tracing::warn!(
                    table = self.table.name(),
                    ?key,
                    %reason,
                    "Replacing unreadable record"
                );
                Ok(Previous::Unreadable)
            }
            Err(e) => Err(e),
        }
    }

    fn update_indexes(
        &self,
        txn: &Transaction<'_>,
        key: &R::Key,
        previous: &Previous<R>,
        new: Option<&R>,
    ) -> Result<()> {
        self.maintain(txn, key, previous, new).inspect_err(|e| txn.poison(e))
    }

    fn maintain(
        &self,
        txn: &Transaction<'_>,
        key: &R::Key,
        previous: &Previous<R>,
        new: Option<&R>,
    ) -> Result<()> {
        for index in &self.indexes {
            let old = match previous {
                Previous::Present(record) => Some(record),
                Previous::Absent => None,
                Previous::Unreadable => {
                    let dropped = index.purge(txn, key)?;
                    tracing::debug!(
                        index = index.table().name(),
                        ?key,
                        dropped,
                        "Purged entries of unreadable record"
                    );
                    None
                }
            };
            index.update(txn, key, old, new)?;
        }
        Ok(())
    }

    /// Every record in key order, read lazily.
    pub fn scan_all<'t, 's>(&self, txn: &'t Transaction<'s>) -> Scan<'t, 's, R> {
        Scan::new(RawCursor::new(
            txn,
            self.table,
            Bound::Unbounded,
            Bound::Unbounded,
        ))
    }

    /// Records with keys in `from..`, at most `limit` of them.
    pub fn scan_from(
        &self,
        txn: &Transaction<'_>,
        from: &R::Key,
        limit: usize,
    ) -> Result<Vec<(R::Key, R)>> {
        self.scan_all_from(txn, from).take(limit).collect()
    }

    fn scan_all_from<'t, 's>(&self, txn: &'t Transaction<'s>, from: &R::Key) -> Scan<'t, 's, R> {
        Scan::new(RawCursor::new(
            txn,
            self.table,
            Bound::Included(from.to_key_bytes()),
            Bound::Unbounded,
        ))
    }

    /// Number of records.
    pub fn count(&self, txn: &Transaction<'_>) -> Result<usize> {
        let mut count = 0;
        for entry in RawCursor::new(txn, self.table, Bound::Unbounded, Bound::Unbounded) {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    /// Compare every registered index with the entries the live records
    /// derive. One report per index.
    pub fn check_indexes(&self, txn: &Transaction<'_>) -> Result<Vec<IndexReport>> {
        let mut expected: Vec<BTreeSet<Vec<u8>>> = vec![BTreeSet::new(); self.indexes.len()];
        for entry in self.scan_all(txn).filter_map(|entry| self.readable(entry)) {
            let (key, record) = entry?;
            for (index, wanted) in self.indexes.iter().zip(expected.iter_mut()) {
                wanted.extend(index.entry_keys(&key, &record));
            }
        }

        let mut reports = Vec::with_capacity(self.indexes.len());
        for (index, wanted) in self.indexes.iter().zip(expected) {
            let stored: BTreeSet<Vec<u8>> = index.stored_entry_keys(txn)?.into_iter().collect();
            let report = IndexReport {
                index: index.table().name(),
                orphaned: stored.difference(&wanted).cloned().collect(),
                missing: wanted.difference(&stored).cloned().collect(),
            };
            if !report.is_consistent() {
                tracing::warn!(
                    index = report.index,
                    orphaned = report.orphaned.len(),
                    missing = report.missing.len(),
                    "Secondary index diverged from primary table"
                );
            }
            reports.push(report);
        }
        Ok(reports)
    }

    /// Logs and drops unreadable records, so their stale entries show up as
    /// orphaned instead of failing the whole pass.
    fn readable(&self, entry: Result<(R::Key, R)>) -> Option<Result<(R::Key, R)>> {
        match entry {
            Err(Error::CorruptRecord { reason, .. }) => {
                tracing::warn!(table = self.table.name(), %reason, "Skipping unreadable record");
                None
            }
            other => Some(other),
        }
    }

    /// Drop and re-derive every registered index from the live records.
    pub fn rebuild_indexes(&self, txn: &Transaction<'_>) -> Result<()> {
        for index in &self.indexes {
            index.clear(txn)?;
        }
        let mut rebuilt = 0usize;
        for entry in self.scan_all(txn).filter_map(|entry| self.readable(entry)) {
            let (key, record) = entry?;
            for index in &self.indexes {
                index.update(txn, &key, None, Some(&record))?;
            }
            rebuilt += 1;
        }
        tracing::info!(
            table = self.table.name(),
            records = rebuilt,
            indexes = self.indexes.len(),
            "Rebuilt secondary indexes"
        );
        Ok(())
    }
}
