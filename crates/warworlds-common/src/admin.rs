//! Backend operators.

use crate::JsonCodec;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};

/// Capability granted to an admin user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AdminRole {
    /// Can manage other admin users.
    Administrator,
    /// Can inspect and edit empires.
    EmpireRead,
    EmpireWrite,
    /// Can inspect and edit stars.
    StarRead,
    StarWrite,
    /// Can send chat and notifications.
    Chat,
}

/// An operator of the backend, keyed by email address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[native_model(id = 4, version = 1, with = JsonCodec)]
pub struct AdminUser {
    /// Email address (primary key).
    pub email_addr: String,
    /// Granted roles.
    pub roles: Vec<AdminRole>,
}

impl AdminUser {
    pub fn new(email_addr: impl Into<String>) -> Self {
        Self {
            email_addr: email_addr.into(),
            roles: Vec::new(),
        }
    }

    /// Whether this user holds `role`. Administrators hold every role.
    pub fn has_role(&self, role: AdminRole) -> bool {
        self.roles
            .iter()
            .any(|r| *r == role || *r == AdminRole::Administrator)
    }
}
