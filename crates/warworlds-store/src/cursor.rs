//! Lazy ordered iteration over a table.
//!
//! A cursor reads the table in batches of the transaction's scan batch size,
//! resuming each batch after the last key it returned. It borrows the
//! transaction, so everything it yields comes from that transaction's view:
//! writes committed by other transactions after it began are never seen.
//! Restarting means opening a new cursor.

use crate::codec::{self, Record};
use crate::engine::{RawEntry, Table};
use crate::error::Result;
use crate::keys::StoreKey;
use crate::txn::Transaction;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::ops::Bound;

/// Cursor over raw engine entries.
pub struct RawCursor<'t, 's> {
    txn: &'t Transaction<'s>,
    table: Table,
    lower: Bound<Vec<u8>>,
    upper: Bound<Vec<u8>>,
    buffer: VecDeque<RawEntry>,
    exhausted: bool,
}

impl<'t, 's> RawCursor<'t, 's> {
    pub(crate) fn new(
        txn: &'t Transaction<'s>,
        table: Table,
        lower: Bound<Vec<u8>>,
        upper: Bound<Vec<u8>>,
    ) -> Self {
        Self {
            txn,
            table,
            lower,
            upper,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    fn fill(&mut self) -> Result<()> {
        let batch_size = self.txn.scan_batch_size();
        let batch = self.txn.range(
            self.table,
            self.lower.as_ref().map(Vec::as_slice),
            self.upper.as_ref().map(Vec::as_slice),
            batch_size,
        )?;
        if batch.len() < batch_size {
            self.exhausted = true;
        }
        if let Some((last, _)) = batch.last() {
            self.lower = Bound::Excluded(last.clone());
        }
        self.buffer.extend(batch);
        Ok(())
    }
}

impl Iterator for RawCursor<'_, '_> {
    type Item = Result<RawEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(e) = self.fill() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

/// Cursor yielding decoded `(key, record)` pairs of a primary table.
pub struct Scan<'t, 's, R> {
    raw: RawCursor<'t, 's>,
    _record: PhantomData<R>,
}

impl<'t, 's, R: Record> Scan<'t, 's, R> {
    pub(crate) fn new(raw: RawCursor<'t, 's>) -> Self {
        Self {
            raw,
            _record: PhantomData,
        }
    }
}

impl<R: Record> Iterator for Scan<'_, '_, R> {
    type Item = Result<(R::Key, R)>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.raw.next()?;
        Some(entry.and_then(|(key, value)| {
            let key = R::Key::from_key_bytes(&key)?;
            let record = codec::decode::<R>(R::TABLE, value)?;
            Ok((key, record))
        }))
    }
}
