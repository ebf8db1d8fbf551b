//! The data store facade.

use crate::codec::Record;
use crate::config::StoreConfig;
use crate::engine::{Engine, NativeEngine};
use crate::error::{Error, Result};
use crate::index::IndexDefinition;
use crate::primary::PrimaryStore;
use crate::sectors::{SectorIndex, SectorsStore};
use crate::stars::{StarEmpireIndex, StarEmpireStore, StarQueueIndex, StarQueueStore};
use crate::txn::Transaction;
use crate::unique_name::{ClaimOutcome, UniqueNameStore};
use std::fs;
use std::sync::Arc;
use warworlds_common::{Account, AdminUser, Empire, EmpireId, SectorCoord, Star, StarId};

/// Name of the unique empire name table.
pub const UNIQUE_EMPIRE_NAMES_TABLE: &str = "uniqueEmpireNames";

/// Handle to every store, over one engine.
///
/// Construct one with [`DataStore::open`] and pass it by reference to
/// whatever needs storage. All tables are opened once, here. Work that must
/// be atomic across stores runs in one [`Transaction`] from
/// [`begin_transaction`](Self::begin_transaction).
///
/// The unique-name store is registered as an index of `empires`, so every
/// empire write or delete through [`empires`](Self::empires) keeps the name
/// claims in step.
pub struct DataStore {
    accounts: PrimaryStore<Account>,
    empires: PrimaryStore<Empire>,
    stars: PrimaryStore<Star>,
    admin_users: PrimaryStore<AdminUser>,
    stars_queue: Arc<StarQueueStore>,
    star_empire_index: Arc<StarEmpireStore>,
    sectors: Arc<SectorsStore>,
    unique_empire_names: Arc<UniqueNameStore>,
    scan_batch_size: usize,
    engine: Box<dyn Engine>,
}

impl DataStore {
    /// Open (creating if needed) the store under `config.home()`.
    ///
    /// Fails with [`Error::EnvironmentInit`] if the directory or the engine
    /// cannot be created. The process cannot serve anything without the
    /// store, so callers should treat this as fatal.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let home = config.home();
        if !home.exists() {
            fs::create_dir_all(home).map_err(|e| Error::EnvironmentInit {
                path: home.to_path_buf(),
                reason: e.to_string(),
            })?;
        }
        let engine = NativeEngine::open(config.database_path())?;
        Self::with_engine(Box::new(engine), config)
    }

    /// A store that lives only in memory.
    pub fn in_memory() -> Result<Self> {
        Self::with_engine(Box::new(NativeEngine::in_memory()?), &StoreConfig::default())
    }

    /// Wire every store onto an existing engine.
    pub fn with_engine(engine: Box<dyn Engine>, config: &StoreConfig) -> Result<Self> {
        let open = |name: &'static str| {
            engine.open_table(name).map_err(|e| Error::EnvironmentInit {
                path: engine.describe().into(),
                reason: format!("opening table {}: {}", name, e),
            })
        };

        let stars_queue = Arc::new(StarQueueStore::new(open(StarQueueIndex::TABLE)?));
        let star_empire_index = Arc::new(StarEmpireStore::new(open(StarEmpireIndex::TABLE)?));
        let sectors = Arc::new(SectorsStore::new(open(SectorIndex::TABLE)?));

        let stars = PrimaryStore::new(open(Star::TABLE)?)
            .with_index(stars_queue.clone())
            .with_index(star_empire_index.clone())
            .with_index(sectors.clone());

        let unique_empire_names =
            Arc::new(UniqueNameStore::new(open(UNIQUE_EMPIRE_NAMES_TABLE)?));
        let empires =
            PrimaryStore::new(open(Empire::TABLE)?).with_index(unique_empire_names.clone());

        let accounts = PrimaryStore::new(open(Account::TABLE)?);
        let admin_users = PrimaryStore::new(open(AdminUser::TABLE)?);

        let store = Self {
            accounts,
            empires,
            stars,
            unique_empire_names,
            admin_users,
            stars_queue,
            star_empire_index,
            sectors,
            scan_batch_size: config.scan_batch_size(),
            engine,
        };
        tracing::info!(location = %store.engine.describe(), "Opened data store");
        Ok(store)
    }

    /// Release every store, then the engine.
    pub fn close(self) {
        let location = self.engine.describe();
        let DataStore {
            accounts,
            empires,
            stars,
            admin_users,
            stars_queue,
            star_empire_index,
            sectors,
            unique_empire_names,
            engine,
            ..
        } = self;

        // Primaries hold the other handles to the index stores.
        drop((accounts, empires, stars, admin_users));
        drop((stars_queue, star_empire_index, sectors, unique_empire_names));
        drop(engine);
        tracing::info!(%location, "Closed data store");
    }

    /// Begin a read-write transaction spanning any of the stores.
    ///
    /// Only one write transaction is open at a time: this blocks until any
    /// other one commits or aborts. Calling it while the same thread still
    /// holds a write transaction never returns; use
    /// [`begin_read`](Self::begin_read) for reads.
    pub fn begin_transaction(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::new(self.engine.begin()?, self.scan_batch_size))
    }

    /// Begin a read-only transaction on the last committed state. It never
    /// waits for writers; writes through it fail with [`Error::ReadOnly`].
    pub fn begin_read(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::new(self.engine.begin_read()?, self.scan_batch_size))
    }

    pub fn accounts(&self) -> &PrimaryStore<Account> {
        &self.accounts
    }

    pub fn empires(&self) -> &PrimaryStore<Empire> {
        &self.empires
    }

    pub fn stars(&self) -> &PrimaryStore<Star> {
        &self.stars
    }

    pub fn stars_queue(&self) -> &StarQueueStore {
        &self.stars_queue
    }

    pub fn star_empire_index(&self) -> &StarEmpireStore {
        &self.star_empire_index
    }

    pub fn sectors(&self) -> &SectorsStore {
        &self.sectors
    }

    pub fn unique_empire_names(&self) -> &UniqueNameStore {
        &self.unique_empire_names
    }

    pub fn admin_users(&self) -> &PrimaryStore<AdminUser> {
        &self.admin_users
    }

    /// Write an empire together with the claim on its name.
    ///
    /// Returns `AlreadyClaimed` and writes nothing when another empire holds
    /// the name. Otherwise the write claims the new name and, if the name
    /// changed, releases the old one.
    pub fn save_empire(&self, txn: &Transaction<'_>, empire: &Empire) -> Result<ClaimOutcome> {
        if let Some(holder) = self.unique_empire_names.owner_of(txn, &empire.display_name)? {
            if holder != empire.id {
                return Ok(ClaimOutcome::AlreadyClaimed(holder));
            }
        }
        self.empires.put(txn, empire)?;
        Ok(ClaimOutcome::Claimed)
    }

    /// Create an empire, claiming its name. Same as [`save_empire`](Self::save_empire).
    pub fn create_empire(&self, txn: &Transaction<'_>, empire: &Empire) -> Result<ClaimOutcome> {
        self.save_empire(txn, empire)
    }

    /// Rename an empire, moving its name claim.
    pub fn rename_empire(
        &self,
        txn: &Transaction<'_>,
        empire_id: EmpireId,
        new_name: &str,
    ) -> Result<ClaimOutcome> {
        let mut empire = self
            .empires
            .get(txn, &empire_id)?
            .ok_or_else(|| Error::NotFound(format!("empire {}", empire_id)))?;
        empire.display_name = new_name.to_string();
        self.save_empire(txn, &empire)
    }

    /// Delete an empire and release its name claim. Returns whether the
    /// empire existed.
    pub fn delete_empire(&self, txn: &Transaction<'_>, empire_id: EmpireId) -> Result<bool> {
        self.empires.delete(txn, &empire_id)
    }

    /// Move a star to another sector. Returns whether the star exists.
    pub fn move_star(
        &self,
        txn: &Transaction<'_>,
        star_id: StarId,
        to: SectorCoord,
    ) -> Result<bool> {
        let Some(mut star) = self.stars.get(txn, &star_id)? else {
            return Ok(false);
        };
        if star.sector != to {
            tracing::debug!(star_id, from = ?star.sector, ?to, "Moving star");
            star.sector = to;
            self.stars.put(txn, &star)?;
        }
        Ok(true)
    }
}
