//! Reads spanning more than one scan batch at the default batch size.

mod common;

use common::{assert_indexes_consistent, star};
use warworlds_common::{Account, SectorCoord};
use warworlds_store::{DataStore, StoreConfig};

const N: i64 = 300;

fn filled_store() -> DataStore {
    assert!(StoreConfig::default().scan_batch_size() < N as usize);
    let store = DataStore::in_memory().unwrap();
    let txn = store.begin_transaction().unwrap();
    for i in 0..N {
        store
            .accounts()
            .put(&txn, &Account::new(format!("cookie-{:04}", i), i))
            .unwrap();
        // Every star in sector (1, 1), owned by empire 5, due in reverse order.
        store
            .stars()
            .put(&txn, &star(i, (1, 1), Some(N - i), &[5]))
            .unwrap();
    }
    txn.commit().unwrap();
    store
}

#[test]
fn test_primary_scans_cross_batches() {
    let store = filled_store();
    let txn = store.begin_transaction().unwrap();

    assert_eq!(store.accounts().count(&txn).unwrap(), N as usize);
    let cookies: Vec<String> = store
        .accounts()
        .scan_all(&txn)
        .map(|entry| entry.unwrap().0)
        .collect();
    assert_eq!(cookies.len(), N as usize);
    assert!(cookies.windows(2).all(|pair| pair[0] < pair[1]));

    let tail = store.stars().scan_from(&txn, &(N - 10), 100).unwrap();
    assert_eq!(tail.len(), 10);
}

#[test]
fn test_index_reads_cross_batches() {
    let store = filled_store();
    let txn = store.begin_transaction().unwrap();

    let in_sector = store.sectors().stars_in_sector(&txn, SectorCoord::new(1, 1)).unwrap();
    assert_eq!(in_sector, (0..N).collect::<Vec<_>>());
    assert_eq!(
        store
            .sectors()
            .stars_in_rect(&txn, SectorCoord::new(0, 0), SectorCoord::new(2, 2))
            .unwrap()
            .len(),
        N as usize
    );
    assert_eq!(
        store.star_empire_index().stars_for_empire(&txn, 5).unwrap().len(),
        N as usize
    );

    let due = store.stars_queue().next_due(&txn, 1_000).unwrap();
    assert_eq!(due, (0..N).rev().collect::<Vec<_>>());

    assert_indexes_consistent(&store, &txn);
    store.stars().rebuild_indexes(&txn).unwrap();
    assert_indexes_consistent(&store, &txn);
}

#[test]
fn test_read_transaction_crosses_batches() {
    let store = filled_store();
    let txn = store.begin_read().unwrap();
    assert_eq!(store.stars().count(&txn).unwrap(), N as usize);
    assert_eq!(
        store.sectors().count_in_sector(&txn, SectorCoord::new(1, 1)).unwrap(),
        N as usize
    );
}
