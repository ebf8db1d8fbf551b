//! Secondary indexes.
//!
//! An index is a derived table. Its definition maps a record to zero or more
//! index keys; each `(index key, primary key)` pair is stored as one entry
//! whose engine key is the index key bytes followed by the primary key bytes
//! and whose value is the primary key bytes. Index key encodings are fixed
//! width, so every entry for one index key shares one prefix.
//!
//! Entries are only written by [`PrimaryStore`](crate::PrimaryStore) through
//! [`IndexMaintainer`], in the transaction that writes the record. At every
//! commit the entries are exactly the image of the definition over the live
//! records.

use crate::codec::Record;
use crate::cursor::RawCursor;
use crate::engine::{RawEntry, Table};
use crate::error::Result;
use crate::keys::{prefix_successor, StoreKey};
use crate::txn::Transaction;
use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::ops::Bound;

/// What an index stores for a record type.
pub trait IndexDefinition: Send + Sync + 'static {
    /// Indexed record type.
    type Record: Record;

    /// Index key. Its encoding must be fixed width.
    type Key: StoreKey;

    /// Name of the index table.
    const TABLE: &'static str;

    /// Index keys for `record`. Empty when the record does not participate.
    fn derive_keys(record: &Self::Record) -> Vec<Self::Key>;
}

/// Hook a primary store calls to keep one index in step with its writes.
pub trait IndexMaintainer<R: Record>: Send + Sync {
    fn table(&self) -> Table;

    /// Replace the entries of `old` with those of `new` for the record under
    /// `key`. `None` on either side means the record did not or does not
    /// exist. Only entries that differ are touched.
    fn update(
        &self,
        txn: &Transaction<'_>,
        key: &R::Key,
        old: Option<&R>,
        new: Option<&R>,
    ) -> Result<()>;

    /// Engine keys of the entries `record` should have.
    fn entry_keys(&self, key: &R::Key, record: &R) -> Vec<Vec<u8>>;

    /// Engine keys of every stored entry.
    fn stored_entry_keys(&self, txn: &Transaction<'_>) -> Result<Vec<Vec<u8>>>;

    /// Remove every entry.
    fn clear(&self, txn: &Transaction<'_>) -> Result<()>;

    /// Remove every entry that refers to `key`, without knowing the record
    /// that produced it. Used when that record can no longer be decoded.
    /// Returns how many entries were removed.
    fn purge(&self, txn: &Transaction<'_>, key: &R::Key) -> Result<usize>;
}

/// Outcome of comparing an index with its primary table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    /// Index table name.
    pub index: &'static str,
    /// Stored entries no live record derives.
    pub orphaned: Vec<Vec<u8>>,
    /// Derived entries that are not stored.
    pub missing: Vec<Vec<u8>>,
}

impl IndexReport {
    pub fn is_consistent(&self) -> bool {
        self.orphaned.is_empty() && self.missing.is_empty()
    }
}

type PrimaryKey<I> = <<I as IndexDefinition>::Record as Record>::Key;

/// A secondary index over a primary store.
pub struct SecondaryStore<I: IndexDefinition> {
    table: Table,
    _definition: PhantomData<fn() -> I>,
}

impl<I: IndexDefinition> SecondaryStore<I> {
    pub(crate) fn new(table: Table) -> Self {
        Self {
            table,
            _definition: PhantomData,
        }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    /// Primary keys of every record indexed under `key`, in primary key order.
    pub fn lookup(&self, txn: &Transaction<'_>, key: &I::Key) -> Result<Vec<PrimaryKey<I>>> {
        self.prefix_entries(txn, key.to_key_bytes())
            .map(|entry| entry.map(|(_, primary)| primary))
            .collect()
    }

    /// Up to `limit` entries with index keys at or after `from`, ordered by
    /// index key then primary key.
    pub fn scan_range(
        &self,
        txn: &Transaction<'_>,
        from: &I::Key,
        limit: usize,
    ) -> Result<Vec<(I::Key, PrimaryKey<I>)>> {
        let lower = from.to_key_bytes();
        txn.range(self.table, Bound::Included(lower.as_slice()), Bound::Unbounded, limit)?
            .into_iter()
            .map(decode_entry::<I>)
            .collect()
    }

    /// Entries with index keys in `[from, to]`, ordered.
    pub fn scan_between(
        &self,
        txn: &Transaction<'_>,
        from: &I::Key,
        to: &I::Key,
    ) -> Result<Vec<(I::Key, PrimaryKey<I>)>> {
        let upper = match prefix_successor(&to.to_key_bytes()) {
            Some(end) => Bound::Excluded(end),
            None => Bound::Unbounded,
        };
        IndexEntries::<I>::new(RawCursor::new(
            txn,
            self.table,
            Bound::Included(from.to_key_bytes()),
            upper,
        ))
        .collect()
    }

    /// Every entry, lazily, in order.
    pub fn entries<'t, 's>(&self, txn: &'t Transaction<'s>) -> IndexEntries<'t, 's, I> {
        IndexEntries::new(RawCursor::new(
            txn,
            self.table,
            Bound::Unbounded,
            Bound::Unbounded,
        ))
    }

    fn prefix_entries<'t, 's>(
        &self,
        txn: &'t Transaction<'s>,
        prefix: Vec<u8>,
    ) -> IndexEntries<'t, 's, I> {
        let upper = match prefix_successor(&prefix) {
            Some(end) => Bound::Excluded(end),
            None => Bound::Unbounded,
        };
        IndexEntries::new(RawCursor::new(
            txn,
            self.table,
            Bound::Included(prefix),
            upper,
        ))
    }

    fn entry_key(index_key: &I::Key, primary: &[u8]) -> Vec<u8> {
        let mut bytes = index_key.to_key_bytes();
        bytes.extend_from_slice(primary);
        bytes
    }
}

impl<I: IndexDefinition> IndexMaintainer<I::Record> for SecondaryStore<I> {
    fn table(&self) -> Table {
        self.table
    }

    fn update(
        &self,
        txn: &Transaction<'_>,
        key: &PrimaryKey<I>,
        old: Option<&I::Record>,
        new: Option<&I::Record>,
    ) -> Result<()> {
        let old_entries: BTreeSet<Vec<u8>> = old
            .map(|record| self.entry_keys(key, record))
            .unwrap_or_default()
            .into_iter()
            .collect();
        let new_entries: BTreeSet<Vec<u8>> = new
            .map(|record| self.entry_keys(key, record))
            .unwrap_or_default()
            .into_iter()
            .collect();

        let primary = key.to_key_bytes();
        let mut removed = 0;
        for stale in old_entries.difference(&new_entries) {
            txn.delete(self.table, stale)?;
            removed += 1;
        }
        let mut added = 0;
        for fresh in new_entries.difference(&old_entries) {
            txn.put(self.table, fresh, &primary)?;
            added += 1;
        }

        if removed + added > 0 {
            tracing::debug!(
                index = self.table.name(),
                ?key,
                removed,
                added,
                "Updated index entries"
            );
        }
        Ok(())
    }

    fn entry_keys(&self, key: &PrimaryKey<I>, record: &I::Record) -> Vec<Vec<u8>> {
        let primary = key.to_key_bytes();
        I::derive_keys(record)
            .iter()
            .map(|index_key| Self::entry_key(index_key, &primary))
            .collect()
    }

    fn stored_entry_keys(&self, txn: &Transaction<'_>) -> Result<Vec<Vec<u8>>> {
        RawCursor::new(txn, self.table, Bound::Unbounded, Bound::Unbounded)
            .map(|entry| entry.map(|(key, _)| key))
            .collect()
    }

    fn clear(&self, txn: &Transaction<'_>) -> Result<()> {
        for key in self.stored_entry_keys(txn)? {
            txn.delete(self.table, &key)?;
        }
        Ok(())
    }

    fn purge(&self, txn: &Transaction<'_>, key: &PrimaryKey<I>) -> Result<usize> {
        let primary = key.to_key_bytes();
        let mut stale = Vec::new();
        for entry in RawCursor::new(txn, self.table, Bound::Unbounded, Bound::Unbounded) {
            let (entry_key, value) = entry?;
            if value == primary {
                stale.push(entry_key);
            }
        }
        for entry_key in &stale {
            txn.delete(self.table, entry_key)?;
        }
        Ok(stale.len())
    }
}

fn decode_entry<I: IndexDefinition>((key, value): RawEntry) -> Result<(I::Key, PrimaryKey<I>)> {
    let (index_key, _) = I::Key::decode_key(&key)?;
    let primary = PrimaryKey::<I>::from_key_bytes(&value)?;
    Ok((index_key, primary))
}

/// Lazy iterator over decoded index entries.
pub struct IndexEntries<'t, 's, I> {
    raw: RawCursor<'t, 's>,
    _definition: PhantomData<fn() -> I>,
}

impl<'t, 's, I: IndexDefinition> IndexEntries<'t, 's, I> {
    fn new(raw: RawCursor<'t, 's>) -> Self {
        Self {
            raw,
            _definition: PhantomData,
        }
    }
}

impl<I: IndexDefinition> Iterator for IndexEntries<'_, '_, I> {
    type Item = Result<(I::Key, PrimaryKey<I>)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.raw.next().map(|entry| entry.and_then(decode_entry::<I>))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Engine, NativeEngine};
    use crate::primary::PrimaryStore;
    use crate::stars::StarQueueIndex;
    use std::sync::Arc;
    use warworlds_common::{SectorCoord, Star};

    fn scheduled(id: i64, due: i64) -> Star {
        let mut star = Star::new(id, "s", SectorCoord::default());
        star.next_simulation = Some(due);
        star
    }

    #[test]
    fn test_unchanged_key_leaves_entry_alone() {
        let engine = NativeEngine::in_memory().unwrap();
        let queue = Arc::new(SecondaryStore::<StarQueueIndex>::new(
            engine.open_table("starsQueue").unwrap(),
        ));
        let txn = Transaction::new(engine.begin().unwrap(), 4);

        let star = scheduled(1, 10);
        queue.update(&txn, &1, None, Some(&star)).unwrap();
        let mut renamed = star.clone();
        renamed.name = "renamed".to_string();
        queue.update(&txn, &1, Some(&star), Some(&renamed)).unwrap();

        assert_eq!(queue.lookup(&txn, &10).unwrap(), vec![1]);
        assert_eq!(queue.entries(&txn).count(), 1);
    }

    #[test]
    fn test_check_and_rebuild_detect_divergence() {
        let engine = NativeEngine::in_memory().unwrap();
        let queue = Arc::new(SecondaryStore::<StarQueueIndex>::new(
            engine.open_table("starsQueue").unwrap(),
        ));
        let stars = PrimaryStore::<Star>::new(engine.open_table("stars").unwrap())
            .with_index(queue.clone());
        let txn = Transaction::new(engine.begin().unwrap(), 4);

        stars.put(&txn, &scheduled(1, 10)).unwrap();
        stars.put(&txn, &scheduled(2, 20)).unwrap();
        assert!(stars.check_indexes(&txn).unwrap()[0].is_consistent());

        // Drop star 1's entry and plant one for a star that does not exist.
        let live = queue.entry_keys(&1, &scheduled(1, 10)).remove(0);
        txn.delete(queue.table(), &live).unwrap();
        let orphan = queue.entry_keys(&9, &scheduled(9, 5)).remove(0);
        txn.put(queue.table(), &orphan, &9i64.to_key_bytes()).unwrap();

        let report = stars.check_indexes(&txn).unwrap().remove(0);
        assert_eq!(report.index, "starsQueue");
        assert_eq!(report.missing, vec![live]);
        assert_eq!(report.orphaned, vec![orphan]);

        stars.rebuild_indexes(&txn).unwrap();
        assert!(stars.check_indexes(&txn).unwrap()[0].is_consistent());
        assert_eq!(queue.scan_range(&txn, &0, 10).unwrap(), vec![(10, 1), (20, 2)]);
    }
}
