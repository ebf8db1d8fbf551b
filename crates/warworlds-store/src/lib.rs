//! War Worlds store - transactional typed object store
//!
//! Persists the server's records on an embedded transactional engine
//! (`native_db`) and keeps derived tables consistent with them:
//! - Primary tables: `accounts`, `empires`, `stars`, `adminUsers`
//! - Star indexes: `starsQueue` (simulation due time), `starEmpireIndex`
//!   (empire presence) and `sectors` (spatial partition)
//! - `uniqueEmpireNames`: one owner per empire name
//!
//! Every index entry is written in the same transaction as the record it
//! derives from, so indexes never diverge from their primary table at a
//! commit boundary.
//!
//! ```
//! use warworlds_common::{Empire, SectorCoord, Star};
//! use warworlds_store::DataStore;
//!
//! let store = DataStore::in_memory().unwrap();
//! let txn = store.begin_transaction().unwrap();
//! store.create_empire(&txn, &Empire::new(1, "Terran Federation")).unwrap();
//!
//! let mut star = Star::new(10, "Sol", SectorCoord::new(0, 0));
//! star.next_simulation = Some(1_000);
//! store.stars().put(&txn, &star).unwrap();
//! txn.commit().unwrap();
//!
//! let txn = store.begin_transaction().unwrap();
//! assert_eq!(store.stars_queue().next_due(&txn, 10).unwrap(), vec![10]);
//! ```

mod codec;
mod config;
mod cursor;
pub mod engine;
mod error;
mod index;
mod keys;
mod primary;
mod sectors;
mod stars;
mod store;
mod txn;
mod unique_name;

pub use codec::{decode, encode, Record};
pub use config::StoreConfig;
pub use cursor::{RawCursor, Scan};
pub use error::{Error, Result};
pub use index::{IndexDefinition, IndexEntries, IndexMaintainer, IndexReport, SecondaryStore};
pub use keys::StoreKey;
pub use primary::PrimaryStore;
pub use sectors::{SectorIndex, SectorsStore};
pub use stars::{StarEmpireIndex, StarEmpireStore, StarQueueIndex, StarQueueStore};
pub use store::{DataStore, UNIQUE_EMPIRE_NAMES_TABLE};
pub use txn::Transaction;
pub use unique_name::{normalize_name, ClaimOutcome, NameClaim, ReleaseOutcome, UniqueNameStore};
