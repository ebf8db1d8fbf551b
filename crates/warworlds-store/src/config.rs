//! Store configuration
//!
//! The only externally configurable input is where the store lives on disk.
//! Configuration is plain data: callers resolve it (typically from a RON
//! file) before calling [`DataStore::open`](crate::DataStore::open).
//!
//! ```
//! use warworlds_store::StoreConfig;
//!
//! let config = StoreConfig::from_ron_str(r#"(home: "/var/lib/warworlds")"#).unwrap();
//! assert_eq!(config.home().to_str(), Some("/var/lib/warworlds"));
//! assert_eq!(config.file_name(), "store.db");
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where and how the store is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Home directory, created on open if absent.
    #[serde(default = "default_home")]
    home: PathBuf,
    /// Database file inside `home`.
    #[serde(default = "default_file_name")]
    file_name: String,
    /// Entries fetched per engine read when iterating a table.
    ///
    /// Clamped to at least 1.
    #[serde(default = "default_scan_batch_size")]
    scan_batch_size: usize,
}

fn default_home() -> PathBuf {
    PathBuf::from("data/store")
}

fn default_file_name() -> String {
    "store.db".to_string()
}

fn default_scan_batch_size() -> usize {
    256
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            home: default_home(),
            file_name: default_file_name(),
            scan_batch_size: default_scan_batch_size(),
        }
    }
}

impl StoreConfig {
    /// Default configuration rooted at `home`.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            ..Self::default()
        }
    }

    /// Parse a configuration from RON.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read and parse a RON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_ron_str(&source)
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Full path of the database file.
    pub fn database_path(&self) -> PathBuf {
        self.home.join(&self.file_name)
    }

    pub fn scan_batch_size(&self) -> usize {
        self.scan_batch_size.max(1)
    }

    pub fn set_file_name(&mut self, file_name: impl Into<String>) {
        self.file_name = file_name.into();
    }

    pub fn set_scan_batch_size(&mut self, n: usize) {
        self.scan_batch_size = n.max(1);
    }
}
