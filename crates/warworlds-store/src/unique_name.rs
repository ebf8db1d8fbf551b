//! Globally unique empire names.
//!
//! A name is claimed by exactly one owner at a time. Uniqueness is checked on
//! the normalized name (trimmed, lowercased), so "Foo" and " foo " collide;
//! the claim keeps the spelling it was first claimed with.
//!
//! The store is registered as an index of the `empires` table: writing an
//! empire claims its name, and renaming or deleting it releases the old one,
//! in the same transaction. Claims can also be taken directly with
//! [`UniqueNameStore::try_claim`], e.g. to reserve a name before the empire
//! exists.

use crate::codec;
use crate::cursor::RawCursor;
use crate::engine::Table;
use crate::error::{Error, Result};
use crate::index::IndexMaintainer;
use crate::keys::StoreKey;
use crate::txn::Transaction;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};
use std::ops::Bound;
use warworlds_common::{Empire, EmpireId, JsonCodec};

/// Stored claim on a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[native_model(id = 101, version = 1, with = JsonCodec)]
pub struct NameClaim {
    /// Name as claimed.
    pub name: String,
    pub owner: EmpireId,
}

/// Result of [`UniqueNameStore::try_claim`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The name now belongs to the caller (newly, or it already did).
    Claimed,
    /// Someone else holds the name.
    AlreadyClaimed(EmpireId),
}

impl ClaimOutcome {
    pub fn is_claimed(&self) -> bool {
        matches!(self, ClaimOutcome::Claimed)
    }
}

/// Result of [`UniqueNameStore::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    /// The name is held by `current`, or by nobody when `None`.
    NotOwner { current: Option<EmpireId> },
}

/// Normalized form a name is unique under.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Claims on empire names.
pub struct UniqueNameStore {
    table: Table,
}

impl UniqueNameStore {
    pub(crate) fn new(table: Table) -> Self {
        Self { table }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    fn key(name: &str) -> Vec<u8> {
        normalize_name(name).to_key_bytes()
    }

    fn claim(&self, txn: &Transaction<'_>, name: &str) -> Result<Option<NameClaim>> {
        match txn.get(self.table, &Self::key(name))? {
            Some(bytes) => Ok(Some(codec::decode(self.table.name(), bytes)?)),
            None => Ok(None),
        }
    }

    /// Claim `name` for `owner`.
    ///
    /// Succeeds when the name is free or already held by `owner`. The check
    /// and the write happen in `txn`, so two transactions cannot both claim a
    /// free name.
    pub fn try_claim(
        &self,
        txn: &Transaction<'_>,
        name: &str,
        owner: EmpireId,
    ) -> Result<ClaimOutcome> {
        if let Some(existing) = self.claim(txn, name)? {
            if existing.owner != owner {
                tracing::debug!(name, owner, holder = existing.owner, "Name already claimed");
                return Ok(ClaimOutcome::AlreadyClaimed(existing.owner));
            }
            return Ok(ClaimOutcome::Claimed);
        }

        let claim = NameClaim {
            name: name.trim().to_string(),
            owner,
        };
        txn.put(self.table, &Self::key(name), &codec::encode(&claim)?)?;
        tracing::debug!(name, owner, "Claimed name");
        Ok(ClaimOutcome::Claimed)
    }

    /// Release `name` if `owner` holds it.
    pub fn release(
        &self,
        txn: &Transaction<'_>,
        name: &str,
        owner: EmpireId,
    ) -> Result<ReleaseOutcome> {
        match self.claim(txn, name)? {
            Some(existing) if existing.owner == owner => {
                txn.delete(self.table, &Self::key(name))?;
                tracing::debug!(name, owner, "Released name");
                Ok(ReleaseOutcome::Released)
            }
            Some(existing) => Ok(ReleaseOutcome::NotOwner {
                current: Some(existing.owner),
            }),
            None => Ok(ReleaseOutcome::NotOwner { current: None }),
        }
    }

    /// Current holder of `name`.
    pub fn owner_of(&self, txn: &Transaction<'_>, name: &str) -> Result<Option<EmpireId>> {
        Ok(self.claim(txn, name)?.map(|claim| claim.owner))
    }

    /// The claim on `name`, with its original spelling.
    pub fn get(&self, txn: &Transaction<'_>, name: &str) -> Result<Option<NameClaim>> {
        self.claim(txn, name)
    }

    fn all_keys(&self, txn: &Transaction<'_>) -> Result<Vec<Vec<u8>>> {
        RawCursor::new(txn, self.table, Bound::Unbounded, Bound::Unbounded)
            .map(|entry| entry.map(|(key, _)| key))
            .collect()
    }
}

impl IndexMaintainer<Empire> for UniqueNameStore {
    fn table(&self) -> Table {
        self.table
    }

    /// Claim the new name, then release the old one if it differs.
    ///
    /// Fails with [`Error::NameTaken`] when another empire holds the new
    /// name; the failed write poisons the transaction.
    fn update(
        &self,
        txn: &Transaction<'_>,
        key: &EmpireId,
        old: Option<&Empire>,
        new: Option<&Empire>,
    ) -> Result<()> {
        if let Some(new) = new {
            if let ClaimOutcome::AlreadyClaimed(holder) =
                self.try_claim(txn, &new.display_name, *key)?
            {
                return Err(Error::NameTaken {
                    name: new.display_name.clone(),
                    holder,
                });
            }
        }

        let Some(old) = old else {
            return Ok(());
        };
        let kept = new.is_some_and(|new| {
            normalize_name(&new.display_name) == normalize_name(&old.display_name)
        });
        if kept {
            return Ok(());
        }
        if let ReleaseOutcome::NotOwner { current } = self.release(txn, &old.display_name, *key)? {
            tracing::warn!(
                empire_id = *key,
                name = %old.display_name,
                ?current,
                "Empire did not hold its previous name"
            );
        }
        Ok(())
    }

    fn entry_keys(&self, _key: &EmpireId, record: &Empire) -> Vec<Vec<u8>> {
        vec![Self::key(&record.display_name)]
    }

    fn stored_entry_keys(&self, txn: &Transaction<'_>) -> Result<Vec<Vec<u8>>> {
        self.all_keys(txn)
    }

    fn clear(&self, txn: &Transaction<'_>) -> Result<()> {
        for key in self.all_keys(txn)? {
            txn.delete(self.table, &key)?;
        }
        Ok(())
    }

    fn purge(&self, txn: &Transaction<'_>, key: &EmpireId) -> Result<usize> {
        let mut held = Vec::new();
        for entry in RawCursor::new(txn, self.table, Bound::Unbounded, Bound::Unbounded) {
            let (name_key, bytes) = entry?;
            match codec::decode::<NameClaim>(self.table.name(), bytes) {
                Ok(claim) if claim.owner == *key => held.push(name_key),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Skipping unreadable name claim"),
            }
        }
        for name_key in &held {
            txn.delete(self.table, name_key)?;
        }
        Ok(held.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Engine, NativeEngine};

    fn setup() -> (NativeEngine, UniqueNameStore) {
        let engine = NativeEngine::in_memory().unwrap();
        let store = UniqueNameStore::new(engine.open_table("uniqueEmpireNames").unwrap());
        (engine, store)
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  The Foo  "), "the foo");
    }

    #[test]
    fn test_claim_is_case_insensitive() {
        let (engine, store) = setup();
        let txn = Transaction::new(engine.begin().unwrap(), 8);

        assert_eq!(store.try_claim(&txn, "Foo", 1).unwrap(), ClaimOutcome::Claimed);
        assert_eq!(
            store.try_claim(&txn, " foo", 2).unwrap(),
            ClaimOutcome::AlreadyClaimed(1)
        );
        assert_eq!(store.get(&txn, "FOO").unwrap().unwrap().name, "Foo");
    }

    #[test]
    fn test_release_by_non_owner() {
        let (engine, store) = setup();
        let txn = Transaction::new(engine.begin().unwrap(), 8);

        store.try_claim(&txn, "Foo", 1).unwrap();
        assert_eq!(
            store.release(&txn, "Foo", 2).unwrap(),
            ReleaseOutcome::NotOwner { current: Some(1) }
        );
        assert_eq!(store.owner_of(&txn, "Foo").unwrap(), Some(1));

        assert_eq!(store.release(&txn, "Foo", 1).unwrap(), ReleaseOutcome::Released);
        assert_eq!(store.owner_of(&txn, "Foo").unwrap(), None);
        assert_eq!(
            store.release(&txn, "Foo", 1).unwrap(),
            ReleaseOutcome::NotOwner { current: None }
        );
    }

    #[test]
    fn test_empire_writes_move_claims() {
        let (engine, store) = setup();
        let txn = Transaction::new(engine.begin().unwrap(), 8);

        let foo = Empire::new(1, "Foo");
        store.update(&txn, &1, None, Some(&foo)).unwrap();
        assert_eq!(store.owner_of(&txn, "foo").unwrap(), Some(1));

        let bar = Empire::new(1, "Bar");
        store.update(&txn, &1, Some(&foo), Some(&bar)).unwrap();
        assert_eq!(store.owner_of(&txn, "Foo").unwrap(), None);
        assert_eq!(store.owner_of(&txn, "Bar").unwrap(), Some(1));

        store.update(&txn, &1, Some(&bar), None).unwrap();
        assert_eq!(store.owner_of(&txn, "Bar").unwrap(), None);
    }

    #[test]
    fn test_empire_write_with_taken_name_fails() {
        let (engine, store) = setup();
        let txn = Transaction::new(engine.begin().unwrap(), 8);

        store.try_claim(&txn, "Foo", 1).unwrap();
        let err = store
            .update(&txn, &2, None, Some(&Empire::new(2, "FOO")))
            .unwrap_err();
        assert!(matches!(err, Error::NameTaken { holder: 1, .. }));
        assert_eq!(store.owner_of(&txn, "Foo").unwrap(), Some(1));
    }

    #[test]
    fn test_purge_drops_every_claim_of_owner() {
        let (engine, store) = setup();
        let txn = Transaction::new(engine.begin().unwrap(), 2);

        for name in ["A", "B", "C"] {
            store.try_claim(&txn, name, 1).unwrap();
        }
        store.try_claim(&txn, "D", 2).unwrap();

        assert_eq!(store.purge(&txn, &1).unwrap(), 3);
        assert_eq!(store.owner_of(&txn, "A").unwrap(), None);
        assert_eq!(store.owner_of(&txn, "D").unwrap(), Some(2));
    }

    #[test]
    fn test_released_name_can_be_reclaimed() {
        let (engine, store) = setup();
        let txn = Transaction::new(engine.begin().unwrap(), 8);

        store.try_claim(&txn, "Foo", 1).unwrap();
        store.release(&txn, "Foo", 1).unwrap();
        assert!(store.try_claim(&txn, "Foo", 2).unwrap().is_claimed());
        assert_eq!(store.owner_of(&txn, "foo").unwrap(), Some(2));
    }
}
