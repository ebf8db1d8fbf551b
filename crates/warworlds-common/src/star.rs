//! Stars and everything embedded in them.
//!
//! A star owns its planets, the fleets currently at it, and one storage entry
//! per empire with a presence there. Empire presence is never stored
//! separately: it is derived from this embedded data.

use crate::{EmpireId, JsonCodec, StarId};
use chrono::{DateTime, TimeZone, Utc};
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Integer coordinates of a sector, the spatial partition stars are grouped by.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct SectorCoord {
    pub x: i64,
    pub y: i64,
}

impl SectorCoord {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Spectral classification of a star.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StarClassification {
    Blue,
    White,
    #[default]
    Yellow,
    Orange,
    Red,
    Neutron,
    Blackhole,
    Wormhole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanetType {
    Gasgiant,
    Radiated,
    Inferno,
    Asteroids,
    Water,
    Toxic,
    Desert,
    Swamp,
    Terran,
}

/// A queued construction at a colony. Progress and end time are written by
/// the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub id: i64,
    pub design_type: String,
    pub count: i32,
    /// Fraction complete in `[0, 1]`.
    pub progress: f32,
    /// Estimated completion, epoch millis.
    pub end_time: Option<i64>,
}

/// A colony on a planet. Native colonies have no empire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Colony {
    pub id: i64,
    pub empire_id: Option<EmpireId>,
    pub population: f32,
    pub defence_bonus: f32,
    pub build_requests: Vec<BuildRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    pub index: i32,
    pub planet_type: PlanetType,
    pub population_congeniality: i32,
    pub farming_congeniality: i32,
    pub mining_congeniality: i32,
    pub energy_congeniality: i32,
    pub colony: Option<Colony>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FleetState {
    #[default]
    Idle,
    Moving,
    Attacking,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fleet {
    pub id: i64,
    /// Owning empire, `None` for native fleets.
    pub empire_id: Option<EmpireId>,
    pub design_type: String,
    pub num_ships: f32,
    pub state: FleetState,
    pub destination_star_id: Option<StarId>,
}

/// Goods, minerals and energy an empire has stored at a star.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmpireStorage {
    pub empire_id: Option<EmpireId>,
    pub total_goods: f32,
    pub total_minerals: f32,
    pub total_energy: f32,
    pub max_goods: f32,
    pub max_minerals: f32,
    pub max_energy: f32,
}

/// A star.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[native_model(id = 3, version = 1, with = JsonCodec)]
pub struct Star {
    /// Numeric id (primary key).
    pub id: StarId,
    pub name: String,
    /// Sector this star lives in.
    pub sector: SectorCoord,
    /// Position within the sector.
    pub offset_x: i32,
    pub offset_y: i32,
    pub classification: StarClassification,
    pub size: i32,
    #[serde(default)]
    pub planets: Vec<Planet>,
    #[serde(default)]
    pub fleets: Vec<Fleet>,
    #[serde(default)]
    pub empire_stores: Vec<EmpireStorage>,
    /// When the simulation last ran, epoch millis.
    #[serde(default)]
    pub last_simulation: Option<i64>,
    /// When the simulation is next due, epoch millis. `None` means the star
    /// needs no processing.
    #[serde(default)]
    pub next_simulation: Option<i64>,
}

impl Star {
    /// Create an empty star in `sector`.
    pub fn new(id: StarId, name: impl Into<String>, sector: SectorCoord) -> Self {
        Self {
            id,
            name: name.into(),
            sector,
            offset_x: 0,
            offset_y: 0,
            classification: StarClassification::default(),
            size: 0,
            planets: Vec::new(),
            fleets: Vec::new(),
            empire_stores: Vec::new(),
            last_simulation: None,
            next_simulation: None,
        }
    }

    /// Every empire with a presence at this star: a storage entry, a colony
    /// or a fleet.
    pub fn empire_ids(&self) -> BTreeSet<EmpireId> {
        let stores = self.empire_stores.iter().filter_map(|s| s.empire_id);
        let colonies = self
            .planets
            .iter()
            .filter_map(|p| p.colony.as_ref())
            .filter_map(|c| c.empire_id);
        let fleets = self.fleets.iter().filter_map(|f| f.empire_id);
        stores.chain(colonies).chain(fleets).collect()
    }

    /// `next_simulation` as a timestamp.
    pub fn next_simulation_at(&self) -> Option<DateTime<Utc>> {
        self.next_simulation
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
    }

    /// Schedule the next simulation pass, or clear it with `None`.
    pub fn schedule_simulation(&mut self, at: Option<DateTime<Utc>>) {
        self.next_simulation = at.map(|t| t.timestamp_millis());
    }
}
