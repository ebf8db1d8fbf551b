mod common;

use warworlds_common::Empire;
use warworlds_store::{ClaimOutcome, DataStore, ReleaseOutcome};

#[test]
fn test_claim_semantics_across_transactions() {
    let store = DataStore::in_memory().unwrap();
    let names = store.unique_empire_names();
    let (owner_a, owner_b) = (1, 2);

    let txn = store.begin_transaction().unwrap();
    assert_eq!(names.try_claim(&txn, "Foo", owner_a).unwrap(), ClaimOutcome::Claimed);
    txn.commit().unwrap();

    let txn2 = store.begin_transaction().unwrap();
    assert_eq!(
        names.try_claim(&txn2, "Foo", owner_b).unwrap(),
        ClaimOutcome::AlreadyClaimed(owner_a)
    );
    txn2.commit().unwrap();

    let txn3 = store.begin_transaction().unwrap();
    assert_eq!(names.try_claim(&txn3, "Foo", owner_a).unwrap(), ClaimOutcome::Claimed);
    assert_eq!(names.owner_of(&txn3, "Foo").unwrap(), Some(owner_a));
    txn3.commit().unwrap();
}

#[test]
fn test_aborted_claim_is_not_kept() {
    let store = DataStore::in_memory().unwrap();
    let names = store.unique_empire_names();

    let txn = store.begin_transaction().unwrap();
    names.try_claim(&txn, "Foo", 1).unwrap();
    txn.abort().unwrap();

    let txn = store.begin_transaction().unwrap();
    assert_eq!(names.try_claim(&txn, "Foo", 2).unwrap(), ClaimOutcome::Claimed);
}

#[test]
fn test_release_requires_owner() {
    let store = DataStore::in_memory().unwrap();
    let names = store.unique_empire_names();

    let txn = store.begin_transaction().unwrap();
    names.try_claim(&txn, "Foo", 1).unwrap();
    assert_eq!(
        names.release(&txn, "Foo", 2).unwrap(),
        ReleaseOutcome::NotOwner { current: Some(1) }
    );
    assert_eq!(names.release(&txn, "Foo", 1).unwrap(), ReleaseOutcome::Released);
}

#[test]
fn test_create_empire_with_taken_name_writes_nothing() {
    let store = DataStore::in_memory().unwrap();

    let txn = store.begin_transaction().unwrap();
    assert!(store.create_empire(&txn, &Empire::new(1, "Foo")).unwrap().is_claimed());
    assert_eq!(
        store.create_empire(&txn, &Empire::new(2, "FOO")).unwrap(),
        ClaimOutcome::AlreadyClaimed(1)
    );
    txn.commit().unwrap();

    let txn = store.begin_transaction().unwrap();
    assert_eq!(store.empires().get(&txn, &2).unwrap(), None);
    assert_eq!(store.empires().count(&txn).unwrap(), 1);
}

#[test]
fn test_delete_empire_releases_name() {
    let store = DataStore::in_memory().unwrap();

    let txn = store.begin_transaction().unwrap();
    store.create_empire(&txn, &Empire::new(1, "Foo")).unwrap();
    txn.commit().unwrap();

    let txn = store.begin_transaction().unwrap();
    assert!(store.delete_empire(&txn, 1).unwrap());
    txn.commit().unwrap();

    let txn = store.begin_transaction().unwrap();
    assert_eq!(store.empires().get(&txn, &1).unwrap(), None);
    assert_eq!(store.unique_empire_names().owner_of(&txn, "Foo").unwrap(), None);
    assert!(store
        .create_empire(&txn, &Empire::new(2, "Foo"))
        .unwrap()
        .is_claimed());
    assert!(!store.delete_empire(&txn, 1).unwrap());
}
