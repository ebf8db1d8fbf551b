//! Spatial partition of stars by sector.

use crate::error::Result;
use crate::index::{IndexDefinition, SecondaryStore};
use crate::txn::Transaction;
use warworlds_common::{SectorCoord, Star, StarId};

/// Stars grouped by the sector they are stored in. Every star is in exactly
/// one sector.
pub struct SectorIndex;

impl IndexDefinition for SectorIndex {
    type Record = Star;
    type Key = SectorCoord;
    const TABLE: &'static str = "sectors";

    fn derive_keys(star: &Star) -> Vec<SectorCoord> {
        vec![star.sector]
    }
}

pub type SectorsStore = SecondaryStore<SectorIndex>;

impl SecondaryStore<SectorIndex> {
    /// Stars in one sector, by id.
    pub fn stars_in_sector(
        &self,
        txn: &Transaction<'_>,
        coord: SectorCoord,
    ) -> Result<Vec<StarId>> {
        self.lookup(txn, &coord)
    }

    pub fn count_in_sector(&self, txn: &Transaction<'_>, coord: SectorCoord) -> Result<usize> {
        Ok(self.stars_in_sector(txn, coord)?.len())
    }

    /// Stars in every sector of the rectangle spanned by `min` and `max`
    /// (inclusive), ordered by x, then y, then star id.
    ///
    /// Each column of the rectangle is one contiguous range of the index.
    /// Empty columns are skipped by seeking to the next stored sector, so
    /// the cost follows the occupied columns rather than the width.
    pub fn stars_in_rect(
        &self,
        txn: &Transaction<'_>,
        min: SectorCoord,
        max: SectorCoord,
    ) -> Result<Vec<(SectorCoord, StarId)>> {
        let (x0, x1) = (min.x.min(max.x), min.x.max(max.x));
        let (y0, y1) = (min.y.min(max.y), min.y.max(max.y));

        let mut stars = Vec::new();
        let mut x = x0;
        loop {
            let Some((next, _)) = self.scan_range(txn, &SectorCoord::new(x, y0), 1)?.pop() else {
                break;
            };
            if next.x > x1 {
                break;
            }
            stars.extend(self.scan_between(
                txn,
                &SectorCoord::new(next.x, y0),
                &SectorCoord::new(next.x, y1),
            )?);
            match next.x.checked_add(1) {
                Some(after) => x = after,
                None => break,
            }
        }
        Ok(stars)
    }

    /// Every sector holding at least one star, in order.
    pub fn sectors(&self, txn: &Transaction<'_>) -> Result<Vec<SectorCoord>> {
        let mut sectors: Vec<SectorCoord> = Vec::new();
        for entry in self.entries(txn) {
            let (coord, _) = entry?;
            if sectors.last() != Some(&coord) {
                sectors.push(coord);
            }
        }
        Ok(sectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Engine, NativeEngine};
    use crate::index::IndexMaintainer;

    fn at(id: StarId, x: i64, y: i64) -> Star {
        Star::new(id, "s", SectorCoord::new(x, y))
    }

    #[test]
    fn test_wide_rect_with_sparse_columns() {
        let engine = NativeEngine::in_memory().unwrap();
        let sectors = SectorsStore::new(engine.open_table("sectors").unwrap());
        let txn = Transaction::new(engine.begin().unwrap(), 4);

        let stars = [
            at(1, -1_000_000, 0),
            at(2, -1_000_000, 9),
            at(3, 0, 5),
            at(4, 0, -1),
            at(5, 999_999, 2),
            at(6, i64::MAX, 0),
        ];
        for star in &stars {
            sectors.update(&txn, &star.id, None, Some(star)).unwrap();
        }

        let found = sectors
            .stars_in_rect(
                &txn,
                SectorCoord::new(1_000_000, 5),
                SectorCoord::new(-1_000_000, 0),
            )
            .unwrap();
        assert_eq!(
            found,
            vec![
                (SectorCoord::new(-1_000_000, 0), 1),
                (SectorCoord::new(0, 5), 3),
                (SectorCoord::new(999_999, 2), 5),
            ]
        );

        let edge = sectors
            .stars_in_rect(&txn, SectorCoord::new(i64::MAX, 0), SectorCoord::new(i64::MAX, 0))
            .unwrap();
        assert_eq!(edge, vec![(SectorCoord::new(i64::MAX, 0), 6)]);
    }
}
