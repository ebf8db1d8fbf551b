//! Empires.
//!
//! `Empire` is at schema version 2. Version 1 records (written before the
//! home star was tracked) upgrade on decode with `home_star_id: None`.
//! Records written by a newer version decode with the fields this version
//! knows; see [`JsonCodec`].

use crate::{EmpireId, JsonCodec, StarId};
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an empire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmpireState {
    #[default]
    Active,
    /// All colonies lost; the player may restart.
    Abandoned,
    /// The empire was banned by an admin.
    Banned,
}

/// Schema version 1 of [`Empire`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[native_model(id = 2, version = 1, with = JsonCodec)]
pub struct EmpireV1 {
    pub id: EmpireId,
    pub display_name: String,
    pub state: EmpireState,
}

/// A player's empire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[native_model(id = 2, version = 2, with = JsonCodec, from = EmpireV1)]
pub struct Empire {
    /// Numeric id (primary key).
    pub id: EmpireId,
    /// Name shown to other players. Unique across all empires.
    pub display_name: String,
    pub state: EmpireState,
    /// Star the empire started on, if known.
    #[serde(default)]
    pub home_star_id: Option<StarId>,
}

impl Empire {
    pub fn new(id: EmpireId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            state: EmpireState::Active,
            home_star_id: None,
        }
    }
}

impl From<EmpireV1> for Empire {
    fn from(v1: EmpireV1) -> Self {
        Self {
            id: v1.id,
            display_name: v1.display_name,
            state: v1.state,
            home_star_id: None,
        }
    }
}

impl From<Empire> for EmpireV1 {
    fn from(empire: Empire) -> Self {
        Self {
            id: empire.id,
            display_name: empire.display_name,
            state: empire.state,
        }
    }
}
