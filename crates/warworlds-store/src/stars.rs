//! Indexes over stars: the simulation queue and empire membership.

use crate::error::Result;
use crate::index::{IndexDefinition, SecondaryStore};
use crate::txn::Transaction;
use chrono::{DateTime, Utc};
use warworlds_common::{EmpireId, Star, StarId};

/// Stars ordered by when their simulation is next due.
///
/// Key: `next_simulation` in epoch millis. Stars without a scheduled
/// simulation are not queued.
pub struct StarQueueIndex;

impl IndexDefinition for StarQueueIndex {
    type Record = Star;
    type Key = i64;
    const TABLE: &'static str = "starsQueue";

    fn derive_keys(star: &Star) -> Vec<i64> {
        star.next_simulation.into_iter().collect()
    }
}

/// Stars grouped by every empire present at them.
pub struct StarEmpireIndex;

impl IndexDefinition for StarEmpireIndex {
    type Record = Star;
    type Key = EmpireId;
    const TABLE: &'static str = "starEmpireIndex";

    fn derive_keys(star: &Star) -> Vec<EmpireId> {
        star.empire_ids().into_iter().collect()
    }
}

pub type StarQueueStore = SecondaryStore<StarQueueIndex>;
pub type StarEmpireStore = SecondaryStore<StarEmpireIndex>;

impl SecondaryStore<StarQueueIndex> {
    /// The `limit` stars due soonest, earliest first. Ties are broken by star
    /// id.
    pub fn next_due(&self, txn: &Transaction<'_>, limit: usize) -> Result<Vec<StarId>> {
        Ok(self
            .scan_range(txn, &i64::MIN, limit)?
            .into_iter()
            .map(|(_, star_id)| star_id)
            .collect())
    }

    /// Up to `limit` stars due at or before `now`, earliest first.
    pub fn due_before(
        &self,
        txn: &Transaction<'_>,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<StarId>> {
        let now = now.timestamp_millis();
        Ok(self
            .scan_range(txn, &i64::MIN, limit)?
            .into_iter()
            .take_while(|(due, _)| *due <= now)
            .map(|(_, star_id)| star_id)
            .collect())
    }
}

impl SecondaryStore<StarEmpireIndex> {
    /// Every star the empire has a presence at.
    pub fn stars_for_empire(
        &self,
        txn: &Transaction<'_>,
        empire_id: EmpireId,
    ) -> Result<Vec<StarId>> {
        self.lookup(txn, &empire_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warworlds_common::{EmpireStorage, SectorCoord};

    #[test]
    fn test_queue_key_only_when_scheduled() {
        let mut star = Star::new(1, "Sol", SectorCoord::default());
        assert!(StarQueueIndex::derive_keys(&star).is_empty());

        star.next_simulation = Some(500);
        assert_eq!(StarQueueIndex::derive_keys(&star), vec![500]);
    }

    #[test]
    fn test_empire_keys_deduplicated() {
        let mut star = Star::new(1, "Sol", SectorCoord::default());
        for id in [4, 2, 4] {
            star.empire_stores.push(EmpireStorage {
                empire_id: Some(id),
                ..Default::default()
            });
        }
        assert_eq!(StarEmpireIndex::derive_keys(&star), vec![2, 4]);
    }
}
