//! Order-preserving key encodings.
//!
//! The engine orders keys bytewise, so every key type encodes such that byte
//! order equals logical order. Fixed-width encodings are prefix-free and can be
//! composed; a `String` consumes the rest of its input and must come last.

use crate::error::{Error, Result};
use std::fmt::Debug;
use warworlds_common::SectorCoord;

/// A value usable as a primary or index key.
pub trait StoreKey: Sized + Clone + Debug + Ord {
    /// Append the encoding of `self` to `out`.
    fn encode_key(&self, out: &mut Vec<u8>);

    /// Decode a key from the front of `bytes`, returning it and the remainder.
    fn decode_key(bytes: &[u8]) -> Result<(Self, &[u8])>;

    /// The encoding of `self` on its own.
    fn to_key_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_key(&mut out);
        out
    }

    /// Decode a key that must span all of `bytes`.
    fn from_key_bytes(bytes: &[u8]) -> Result<Self> {
        let (key, rest) = Self::decode_key(bytes)?;
        if !rest.is_empty() {
            return Err(Error::InvalidKey(format!(
                "{} trailing bytes after key {:?}",
                rest.len(),
                key
            )));
        }
        Ok(key)
    }
}

fn split_fixed<const N: usize>(bytes: &[u8]) -> Result<([u8; N], &[u8])> {
    if bytes.len() < N {
        return Err(Error::InvalidKey(format!(
            "expected {} bytes, found {}",
            N,
            bytes.len()
        )));
    }
    let (head, rest) = bytes.split_at(N);
    let mut buf = [0u8; N];
    buf.copy_from_slice(head);
    Ok((buf, rest))
}

impl StoreKey for u64 {
    fn encode_key(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_be_bytes());
    }

    fn decode_key(bytes: &[u8]) -> Result<(Self, &[u8])> {
        let (buf, rest) = split_fixed::<8>(bytes)?;
        Ok((u64::from_be_bytes(buf), rest))
    }
}

// Flipping the sign bit maps i64::MIN..=i64::MAX onto 0..=u64::MAX in order.
impl StoreKey for i64 {
    fn encode_key(&self, out: &mut Vec<u8>) {
        ((*self as u64) ^ (1 << 63)).encode_key(out);
    }

    fn decode_key(bytes: &[u8]) -> Result<(Self, &[u8])> {
        let (raw, rest) = u64::decode_key(bytes)?;
        Ok(((raw ^ (1 << 63)) as i64, rest))
    }
}

impl StoreKey for String {
    fn encode_key(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes());
    }

    fn decode_key(bytes: &[u8]) -> Result<(Self, &[u8])> {
        let s = std::str::from_utf8(bytes).map_err(|e| Error::InvalidKey(e.to_string()))?;
        Ok((s.to_string(), &[]))
    }
}

impl StoreKey for SectorCoord {
    fn encode_key(&self, out: &mut Vec<u8>) {
        self.x.encode_key(out);
        self.y.encode_key(out);
    }

    fn decode_key(bytes: &[u8]) -> Result<(Self, &[u8])> {
        let (x, rest) = i64::decode_key(bytes)?;
        let (y, rest) = i64::decode_key(rest)?;
        Ok((SectorCoord { x, y }, rest))
    }
}

/// Smallest byte string greater than every string starting with `prefix`.
///
/// Returns `None` when no such bound exists (empty or all-`0xff` prefix).
pub(crate) fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}
