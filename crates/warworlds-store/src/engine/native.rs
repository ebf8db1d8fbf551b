//! `native_db` engine.
//!
//! All tables share one `native_db` model, [`StoredEntry`]. Its primary key is
//! `"<table>/<hex key>"`: lowercase hex keeps byte order, and `'/'` sorts
//! below every hex digit, so a table's entries form one contiguous range
//! ending before `"<table>0"`.

use super::{Engine, EngineTransaction, RawEntry, Table};
use crate::error::{Error, Result};
use native_db::transaction::{RTransaction, RwTransaction};
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::ops::Bound;
use std::path::Path;
use std::sync::LazyLock;

const SEPARATOR: char = '/';
// First character after SEPARATOR.
const TABLE_END: char = '0';

/// One engine entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 100, version = 1)]
#[native_db]
pub struct StoredEntry {
    /// Primary key - table name, separator, hex-encoded key.
    #[primary_key]
    pub key: String,
    /// Encoded record or index reference.
    pub value: Vec<u8>,
}

static MODELS: LazyLock<Models> = LazyLock::new(|| {
    let mut models = Models::new();
    models
        .define::<StoredEntry>()
        .expect("StoredEntry is a valid native_db model");
    models
});

fn row_key(table: Table, key: &[u8]) -> String {
    let mut row = String::with_capacity(table.name().len() + 1 + key.len() * 2);
    row.push_str(table.name());
    row.push(SEPARATOR);
    for byte in key {
        // Writing to a String cannot fail.
        let _ = write!(row, "{:02x}", byte);
    }
    row
}

fn table_end(table: Table) -> String {
    format!("{}{}", table.name(), TABLE_END)
}

fn key_from_row(table: Table, row: &str) -> Result<Vec<u8>> {
    let hex = row
        .strip_prefix(table.name())
        .and_then(|rest| rest.strip_prefix(SEPARATOR))
        .ok_or_else(|| Error::InvalidKey(format!("{:?} is not in table {}", row, table.name())))?;
    if hex.len() % 2 != 0 {
        return Err(Error::InvalidKey(format!("odd-length key {:?}", row)));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| Error::InvalidKey(format!("{:?}: {}", row, e)))
        })
        .collect()
}

/// Engine backed by a `native_db` database.
pub struct NativeEngine {
    db: Database<'static>,
    location: String,
}

impl NativeEngine {
    /// Open or create a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = Builder::new()
            .create(&MODELS, path)
            .map_err(|e| Error::EnvironmentInit {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            db,
            location: path.display().to_string(),
        })
    }

    /// Create an in-memory database.
    pub fn in_memory() -> Result<Self> {
        let db = Builder::new()
            .create_in_memory(&MODELS)
            .map_err(|e| Error::EnvironmentInit {
                path: ":memory:".into(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            db,
            location: ":memory:".to_string(),
        })
    }
}

impl Engine for NativeEngine {
    fn open_table(&self, name: &'static str) -> Result<Table> {
        // Tables are key ranges of the shared model; nothing to create.
        Table::new(name)
    }

    fn begin(&self) -> Result<Box<dyn EngineTransaction + '_>> {
        let rw = self.db.rw_transaction()?;
        Ok(Box::new(NativeTransaction { rw }))
    }

    fn begin_read(&self) -> Result<Box<dyn EngineTransaction + '_>> {
        let r = self.db.r_transaction()?;
        Ok(Box::new(NativeReadTransaction { r }))
    }

    fn describe(&self) -> String {
        self.location.clone()
    }
}

/// `native_db` range bounds for `(lower, upper)` within `table`.
///
/// `native_db` only accepts ranges with an inclusive (or no) start, so an
/// exclusive lower bound becomes an inclusive bound on the next possible row
/// key: appending NUL sorts right after the row and before any longer row,
/// whose next character is a hex digit.
fn row_bounds(
    table: Table,
    lower: Bound<&[u8]>,
    upper: Bound<&[u8]>,
) -> (Bound<String>, Bound<String>) {
    let lower = match lower {
        Bound::Included(key) => row_key(table, key),
        Bound::Excluded(key) => {
            let mut row = row_key(table, key);
            row.push('\0');
            row
        }
        Bound::Unbounded => row_key(table, &[]),
    };
    let upper = match upper {
        Bound::Included(key) => Bound::Included(row_key(table, key)),
        Bound::Excluded(key) => Bound::Excluded(row_key(table, key)),
        Bound::Unbounded => Bound::Excluded(table_end(table)),
    };
    (Bound::Included(lower), upper)
}

fn collect_rows(
    table: Table,
    rows: impl Iterator<Item = native_db::db_type::Result<StoredEntry>>,
    limit: usize,
) -> Result<Vec<RawEntry>> {
    let mut entries = Vec::new();
    for stored in rows.take(limit) {
        let stored = stored?;
        entries.push((key_from_row(table, &stored.key)?, stored.value));
    }
    Ok(entries)
}

struct NativeTransaction<'db> {
    rw: RwTransaction<'db>,
}

impl EngineTransaction for NativeTransaction<'_> {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let stored: Option<StoredEntry> = self.rw.get().primary(row_key(table, key))?;
        Ok(stored.map(|entry| entry.value))
    }

    fn put(&self, table: Table, key: &[u8], value: &[u8]) -> Result<()> {
        self.rw.upsert(StoredEntry {
            key: row_key(table, key),
            value: value.to_vec(),
        })?;
        Ok(())
    }

    fn delete(&self, table: Table, key: &[u8]) -> Result<bool> {
        let stored: Option<StoredEntry> = self.rw.get().primary(row_key(table, key))?;
        match stored {
            Some(entry) => {
                self.rw.remove(entry)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn range(
        &self,
        table: Table,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        limit: usize,
    ) -> Result<Vec<RawEntry>> {
        let scan = self.rw.scan().primary::<StoredEntry>()?;
        let rows = scan.range(row_bounds(table, lower, upper))?;
        collect_rows(table, rows, limit)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.rw.commit()?;
        Ok(())
    }

    fn abort(self: Box<Self>) -> Result<()> {
        // Dropping an uncommitted native_db transaction rolls it back.
        drop(self);
        Ok(())
    }
}

/// Snapshot reads that never wait on writers.
struct NativeReadTransaction<'db> {
    r: RTransaction<'db>,
}

impl EngineTransaction for NativeReadTransaction<'_> {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let stored: Option<StoredEntry> = self.r.get().primary(row_key(table, key))?;
        Ok(stored.map(|entry| entry.value))
    }

    fn put(&self, table: Table, _key: &[u8], _value: &[u8]) -> Result<()> {
        Err(Error::ReadOnly(table.name().to_string()))
    }

    fn delete(&self, table: Table, _key: &[u8]) -> Result<bool> {
        Err(Error::ReadOnly(table.name().to_string()))
    }

    fn range(
        &self,
        table: Table,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        limit: usize,
    ) -> Result<Vec<RawEntry>> {
        let scan = self.r.scan().primary::<StoredEntry>()?;
        let rows = scan.range(row_bounds(table, lower, upper))?;
        collect_rows(table, rows, limit)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        Ok(())
    }

    fn abort(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &'static str) -> Table {
        Table::new(name).unwrap()
    }

    #[test]
    fn test_row_key_order_matches_byte_order() {
        let t = table("stars");
        let keys: [&[u8]; 4] = [&[0x00], &[0x00, 0xff], &[0x0a], &[0xff]];
        let rows: Vec<String> = keys.iter().map(|k| row_key(t, k)).collect();
        let mut sorted = rows.clone();
        sorted.sort();
        assert_eq!(rows, sorted);
        assert!(rows.iter().all(|r| r.as_str() < table_end(t).as_str()));
    }

    #[test]
    fn test_other_tables_outside_range() {
        let stars = table("stars");
        let queue = table("starsQueue");
        let row = row_key(queue, &[0x00]);
        assert!(row.as_str() > table_end(stars).as_str());
    }

    #[test]
    fn test_key_from_row() {
        let t = table("stars");
        let row = row_key(t, &[0x01, 0xab, 0xff]);
        assert_eq!(key_from_row(t, &row).unwrap(), vec![0x01, 0xab, 0xff]);
        assert!(key_from_row(table("empires"), &row).is_err());
    }

    #[test]
    fn test_put_get_delete() {
        let engine = NativeEngine::in_memory().unwrap();
        let t = engine.open_table("accounts").unwrap();

        let txn = engine.begin().unwrap();
        txn.put(t, b"k", b"v").unwrap();
        assert_eq!(txn.get(t, b"k").unwrap(), Some(b"v".to_vec()));
        assert!(txn.delete(t, b"k").unwrap());
        assert!(!txn.delete(t, b"k").unwrap());
        assert_eq!(txn.get(t, b"k").unwrap(), None);
        txn.commit().unwrap();
    }

    #[test]
    fn test_abort_discards_writes() {
        let engine = NativeEngine::in_memory().unwrap();
        let t = engine.open_table("accounts").unwrap();

        let txn = engine.begin().unwrap();
        txn.put(t, b"k", b"v").unwrap();
        txn.abort().unwrap();

        let txn = engine.begin().unwrap();
        assert_eq!(txn.get(t, b"k").unwrap(), None);
    }

    #[test]
    fn test_range_stays_in_table() {
        let engine = NativeEngine::in_memory().unwrap();
        let stars = engine.open_table("stars").unwrap();
        let queue = engine.open_table("starsQueue").unwrap();

        let txn = engine.begin().unwrap();
        for k in [3u8, 1, 2] {
            txn.put(stars, &[k], &[k]).unwrap();
        }
        txn.put(queue, &[0], &[0]).unwrap();

        let all = txn
            .range(stars, Bound::Unbounded, Bound::Unbounded, usize::MAX)
            .unwrap();
        let keys: Vec<Vec<u8>> = all.into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![vec![1], vec![2], vec![3]]);

        let tail = txn
            .range(stars, Bound::Excluded(&[1][..]), Bound::Unbounded, 1)
            .unwrap();
        assert_eq!(tail, vec![(vec![2], vec![2])]);

        let between = txn
            .range(stars, Bound::Excluded(&[1][..]), Bound::Included(&[3][..]), 10)
            .unwrap();
        assert_eq!(between.len(), 2);
        let none = txn
            .range(stars, Bound::Excluded(&[3][..]), Bound::Excluded(&[4][..]), 10)
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_exclusive_lower_keeps_longer_keys() {
        let engine = NativeEngine::in_memory().unwrap();
        let t = engine.open_table("accounts").unwrap();

        let txn = engine.begin().unwrap();
        for key in [&[0x01][..], &[0x01, 0x00], &[0x01, 0xff], &[0x02]] {
            txn.put(t, key, b"").unwrap();
        }
        let keys: Vec<Vec<u8>> = txn
            .range(t, Bound::Excluded(&[0x01][..]), Bound::Unbounded, 10)
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![vec![0x01, 0x00], vec![0x01, 0xff], vec![0x02]]);
    }

    #[test]
    fn test_read_transaction_sees_commits_and_rejects_writes() {
        let engine = NativeEngine::in_memory().unwrap();
        let t = engine.open_table("accounts").unwrap();

        let txn = engine.begin().unwrap();
        txn.put(t, b"k", b"v").unwrap();
        txn.commit().unwrap();

        let writer = engine.begin().unwrap();
        writer.put(t, b"k", b"changed").unwrap();

        // A reader does not wait for the open writer and sees the last commit.
        let reader = engine.begin_read().unwrap();
        assert_eq!(reader.get(t, b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(
            reader
                .range(t, Bound::Unbounded, Bound::Unbounded, 10)
                .unwrap()
                .len(),
            1
        );
        assert!(matches!(reader.put(t, b"x", b"y"), Err(Error::ReadOnly(_))));
        assert!(matches!(reader.delete(t, b"k"), Err(Error::ReadOnly(_))));
        writer.commit().unwrap();
    }
}
