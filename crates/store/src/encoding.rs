//! Encoding for stored keys and values
//!
//! Version keys are `{escaped key}{0x00 0x00}{order index (8, big-endian)}`.
//! Escaping replaces every `0x00` in the user key with `0x00 0xff`, so the
//! terminator sorts before any continuation of the key. All versions of one
//! key are therefore contiguous, ordered by index, and a key prefix maps to a
//! byte prefix of the encoded form.

use crate::error::{Error, Result};
use ordo_common::{Anchor, OrderIndex, Term};

/// Encode a value to bytes
pub trait Encode {
    fn encode(&self) -> Result<Vec<u8>>;
}

/// Decode a value from bytes
pub trait Decode: Sized {
    fn decode(bytes: &[u8]) -> Result<Self>;
}

impl Encode for OrderIndex {
    fn encode(&self) -> Result<Vec<u8>> {
        Ok(self.to_be_bytes().to_vec())
    }
}

impl Decode for OrderIndex {
    fn decode(bytes: &[u8]) -> Result<Self> {
        let buf: [u8; 8] = bytes.try_into().map_err(|_| {
            Error::Encoding(format!("Expected 8 bytes for u64, got {}", bytes.len()))
        })?;
        Ok(u64::from_be_bytes(buf))
    }
}

impl Encode for Term {
    fn encode(&self) -> Result<Vec<u8>> {
        Ok(Term::encode(self)?)
    }
}

impl Decode for Term {
    fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(Term::decode(bytes)?)
    }
}

impl Encode for Anchor {
    fn encode(&self) -> Result<Vec<u8>> {
        Ok(self.as_bytes().to_vec())
    }
}

impl Decode for Anchor {
    fn decode(bytes: &[u8]) -> Result<Self> {
        Anchor::from_slice(bytes)
            .ok_or_else(|| Error::Encoding(format!("Expected 32 bytes for anchor, got {}", bytes.len())))
    }
}

/// Escape a user key (without terminator). Also the encoding of a key prefix.
pub fn escape_key(key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(key.len() + 2);
    for &b in key {
        out.push(b);
        if b == 0x00 {
            out.push(0xff);
        }
    }
    out
}

/// Encode the storage key for one version of `key`
pub fn encode_version_key(key: &[u8], index: OrderIndex) -> Vec<u8> {
    let mut out = escape_key(key);
    out.extend_from_slice(&[0x00, 0x00]);
    out.extend_from_slice(&index.to_be_bytes());
    out
}

/// Split a version key back into the user key and its order index
pub fn decode_version_key(bytes: &[u8]) -> Result<(Vec<u8>, OrderIndex)> {
    let mut key = Vec::new();
    let mut pos = 0;
    loop {
        match bytes.get(pos) {
            Some(0x00) => match bytes.get(pos + 1) {
                Some(0xff) => {
                    key.push(0x00);
                    pos += 2;
                }
                Some(0x00) => {
                    pos += 2;
                    break;
                }
                _ => return Err(Error::Encoding("Invalid escape in version key".to_string())),
            },
            Some(&b) => {
                key.push(b);
                pos += 1;
            }
            None => return Err(Error::Encoding("Unterminated version key".to_string())),
        }
    }
    let index = OrderIndex::decode(&bytes[pos..])?;
    Ok((key, index))
}

/// Root index key ordered by anchor then height: `{anchor(32)}{height(8)}`
pub fn encode_root_key(anchor: &Anchor, height: OrderIndex) -> Vec<u8> {
    let mut out = Vec::with_capacity(Anchor::LEN + 8);
    out.extend_from_slice(anchor.as_bytes());
    out.extend_from_slice(&height.to_be_bytes());
    out
}
