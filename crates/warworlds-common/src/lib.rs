//! War Worlds common - domain records
//!
//! The records the server persists:
//! - [`Account`]: a player's login, keyed by its session cookie
//! - [`Empire`]: a player's empire, keyed by numeric id
//! - [`Star`]: a star with its planets, fleets and per-empire storage
//! - [`AdminUser`]: an operator of the backend, keyed by email address
//!
//! Every record is a `native_model` model so it carries a stable model id and
//! schema version when encoded. Bodies are written by [`JsonCodec`], which
//! keeps field names so records stay readable across added fields. Simulation output (populations, minerals,
//! build progress) is stored as computed by the simulation engine; nothing in
//! this crate evaluates it.

mod account;
mod admin;
mod codec;
mod empire;
mod star;

pub use account::{Account, EmailStatus};
pub use admin::{AdminRole, AdminUser};
pub use codec::JsonCodec;
pub use empire::{Empire, EmpireState, EmpireV1};
pub use star::{
    BuildRequest, Colony, EmpireStorage, Fleet, FleetState, Planet, PlanetType, SectorCoord, Star,
    StarClassification,
};

/// Numeric identifier of an [`Empire`].
pub type EmpireId = i64;

/// Numeric identifier of a [`Star`].
pub type StarId = i64;
