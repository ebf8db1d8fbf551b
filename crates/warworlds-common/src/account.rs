//! Player accounts.

use crate::{EmpireId, JsonCodec};
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};

/// Verification state of an account's email address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmailStatus {
    /// No address has been associated.
    #[default]
    Unverified,
    /// A verification mail was sent and not yet confirmed.
    Pending,
    /// The address was confirmed.
    Verified,
}

/// A player's account.
///
/// Keyed by `cookie`, the opaque session token handed to the client on first
/// login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[native_model(id = 1, version = 1, with = JsonCodec)]
pub struct Account {
    /// Session cookie (primary key).
    pub cookie: String,
    /// The empire this account plays.
    pub empire_id: EmpireId,
    /// Email address, if one was associated.
    #[serde(default)]
    pub email: Option<String>,
    /// Verification state of `email`.
    #[serde(default)]
    pub email_status: EmailStatus,
}

impl Account {
    /// Create an account for an empire with no associated email.
    pub fn new(cookie: impl Into<String>, empire_id: EmpireId) -> Self {
        Self {
            cookie: cookie.into(),
            empire_id,
            email: None,
            email_status: EmailStatus::Unverified,
        }
    }
}
