//! Shared helpers for store integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;
use warworlds_common::{EmpireId, EmpireStorage, SectorCoord, Star, StarId};
use warworlds_store::{DataStore, Transaction};

/// A star in `sector`, due at `due`, with storage for each of `empires`.
pub fn star(id: StarId, sector: (i64, i64), due: Option<i64>, empires: &[EmpireId]) -> Star {
    let mut star = Star::new(id, format!("Star {}", id), SectorCoord::new(sector.0, sector.1));
    star.next_simulation = due;
    star.empire_stores = empires
        .iter()
        .map(|&empire_id| EmpireStorage {
            empire_id: Some(empire_id),
            ..Default::default()
        })
        .collect();
    star
}

/// Assert every star index matches the live stars.
pub fn assert_indexes_consistent(store: &DataStore, txn: &Transaction<'_>) {
    for report in store.stars().check_indexes(txn).unwrap() {
        assert!(report.is_consistent(), "index diverged: {:?}", report);
    }
}

pub fn sector_members(store: &DataStore, txn: &Transaction<'_>, x: i64, y: i64) -> BTreeSet<StarId> {
    store
        .sectors()
        .stars_in_sector(txn, SectorCoord::new(x, y))
        .unwrap()
        .into_iter()
        .collect()
}
