//! Record codec.
//!
//! Records are encoded with `native_model`: a model id and schema version
//! header followed by the body (JSON with named fields, see
//! [`JsonCodec`](warworlds_common::JsonCodec)).
//!
//! Decoding bytes written by an older schema version upgrades them through
//! the model's `from` chain. Bytes written by a newer version are read as the
//! current version: fields this version does not know are skipped. Bytes too
//! short for the header, with a foreign model id, or with a malformed body
//! are rejected as [`Error::CorruptRecord`].

use crate::error::{Error, Result};
use crate::keys::StoreKey;
use native_model::wrapper::Wrapper;
use native_model::Model;
use std::fmt::Debug;
use warworlds_common::{Account, AdminUser, Empire, EmpireId, Star, StarId};

/// A record type the store can persist.
///
/// Bundles the encode/decode capability (`native_model::Model`) with the
/// record's natural key.
pub trait Record: Model + Clone + Debug {
    /// Primary key type.
    type Key: StoreKey;

    /// Name of the primary table.
    const TABLE: &'static str;

    /// The record's primary key.
    fn key(&self) -> Self::Key;
}

/// Encode a record.
pub fn encode<R: Model>(record: &R) -> Result<Vec<u8>> {
    native_model::encode(record).map_err(|e| Error::Serialization(e.to_string()))
}

/// Decode a record read from `table`.
pub fn decode<R: Model>(table: &str, bytes: Vec<u8>) -> Result<R> {
    let wrapper = Wrapper::deserialize(&bytes[..]).ok_or_else(|| {
        Error::corrupt(table, format!("{} bytes is too short for a header", bytes.len()))
    })?;
    let id = wrapper.get_id();
    let version = wrapper.get_version();
    if id != R::native_model_id() {
        return Err(Error::corrupt(
            table,
            format!("model id {} where {} was expected", id, R::native_model_id()),
        ));
    }

    let body = wrapper.value().to_vec();
    if version > R::native_model_version() {
        R::native_model_decode_body(body, id).map_err(|e| Error::corrupt(table, e))
    } else {
        R::native_model_decode_upgrade_body(body, id, version)
            .map_err(|e| Error::corrupt(table, e))
    }
}

impl Record for Account {
    type Key = String;
    const TABLE: &'static str = "accounts";

    fn key(&self) -> String {
        self.cookie.clone()
    }
}

impl Record for Empire {
    type Key = EmpireId;
    const TABLE: &'static str = "empires";

    fn key(&self) -> EmpireId {
        self.id
    }
}

impl Record for Star {
    type Key = StarId;
    const TABLE: &'static str = "stars";

    fn key(&self) -> StarId {
        self.id
    }
}

impl Record for AdminUser {
    type Key = String;
    const TABLE: &'static str = "adminUsers";

    fn key(&self) -> String {
        self.email_addr.clone()
    }
}
