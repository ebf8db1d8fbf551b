//! Error types for store operations.

use std::path::PathBuf;
use thiserror::Error;
use warworlds_common::EmpireId;

/// Errors that can occur during store operations.
///
/// Business-rule outcomes of the unique-name store (a name already claimed,
/// a release by the wrong owner) are not errors; see
/// [`ClaimOutcome`](crate::ClaimOutcome) and
/// [`ReleaseOutcome`](crate::ReleaseOutcome).
#[derive(Debug, Error)]
pub enum Error {
    /// The engine could not service the request. The transaction it happened
    /// in is poisoned and will not commit.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Stored bytes could not be decoded into a record.
    #[error("Corrupt record in {table}: {reason}")]
    CorruptRecord {
        /// Table the bytes were read from.
        table: String,
        /// Decoder message.
        reason: String,
    },

    /// A record could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The home directory or the engine could not be initialized.
    #[error("Failed to initialize store environment at {path}: {reason}")]
    EnvironmentInit {
        /// Home directory or database file.
        path: PathBuf,
        /// Underlying failure.
        reason: String,
    },

    /// The transaction was poisoned by an earlier engine failure.
    #[error("Transaction aborted: {0}")]
    Aborted(String),

    /// A write was attempted through a read-only transaction.
    #[error("Read-only transaction cannot write to {0}")]
    ReadOnly(String),

    /// A write would give an empire a name another empire holds.
    #[error("Name {name:?} is already claimed by empire {holder}")]
    NameTaken {
        /// Name as requested.
        name: String,
        /// Current holder of the claim.
        holder: EmpireId,
    },

    /// A record required by a cross-store operation does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A stored key could not be decoded, or a table name is not usable.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn corrupt(table: &str, reason: impl ToString) -> Self {
        Error::CorruptRecord {
            table: table.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error came from the engine rather than from the data.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Error::StorageUnavailable(_) | Error::Aborted(_))
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<native_db::db_type::Error> for Error {
    fn from(err: native_db::db_type::Error) -> Self {
        Error::StorageUnavailable(err.to_string())
    }
}
