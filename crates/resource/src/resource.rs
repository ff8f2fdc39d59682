//! Resources and the labels derived from them
//!
//! A resource's canonical body is its CBOR encoding. The commitment is
//! `CM_` followed by the body and the nullifier is `NF_` followed by the same
//! body, so either label can be turned back into the resource it names.

use crate::error::ParseError;
use ordo_common::Term;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const COMMITMENT_PREFIX: &[u8] = b"CM_";
pub const NULLIFIER_PREFIX: &[u8] = b"NF_";

/// A unit of value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub logic_ref: [u8; 32],
    pub label_ref: [u8; 32],
    pub value_ref: [u8; 32],
    pub nullifier_key_commitment: [u8; 32],
    pub quantity: u64,
    pub nonce: [u8; 32],
    pub rand_seed: [u8; 32],
    /// Ephemeral resources may be consumed without an anchored commitment
    pub ephemeral: bool,
}

impl Resource {
    pub fn new(logic_ref: [u8; 32], label_ref: [u8; 32], quantity: u64) -> Self {
        Self {
            logic_ref,
            label_ref,
            value_ref: [0u8; 32],
            nullifier_key_commitment: [0u8; 32],
            quantity,
            nonce: [0u8; 32],
            rand_seed: [0u8; 32],
            ephemeral: false,
        }
    }

    pub fn with_value_ref(mut self, value_ref: [u8; 32]) -> Self {
        self.value_ref = value_ref;
        self
    }

    pub fn with_nullifier_key_commitment(mut self, commitment: [u8; 32]) -> Self {
        self.nullifier_key_commitment = commitment;
        self
    }

    pub fn with_nonce(mut self, nonce: [u8; 32]) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn with_rand_seed(mut self, rand_seed: [u8; 32]) -> Self {
        self.rand_seed = rand_seed;
        self
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    /// Canonical encoding shared by the commitment and the nullifier
    pub fn body(&self) -> Result<Vec<u8>, ParseError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| ParseError::Body(e.to_string()))?;
        Ok(buf)
    }

    pub fn from_body(body: &[u8]) -> Result<Self, ParseError> {
        ciborium::from_reader(body).map_err(|e| ParseError::Body(e.to_string()))
    }

    pub fn commitment(&self) -> Result<Commitment, ParseError> {
        Ok(Commitment(prefixed(COMMITMENT_PREFIX, &self.body()?)))
    }

    pub fn nullifier(&self) -> Result<Nullifier, ParseError> {
        Ok(Nullifier(prefixed(NULLIFIER_PREFIX, &self.body()?)))
    }
}

fn prefixed(prefix: &[u8], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(prefix.len() + body.len());
    out.extend_from_slice(prefix);
    out.extend_from_slice(body);
    out
}

fn strip<'a>(prefix: &[u8], bytes: &'a [u8]) -> Result<&'a [u8], ParseError> {
    bytes
        .strip_prefix(prefix)
        .ok_or_else(|| ParseError::MissingPrefix {
            expected: String::from_utf8_lossy(prefix).into_owned(),
            label: hex::encode(&bytes[..bytes.len().min(8)]),
        })
}

/// Proof that a resource was created: `CM_` + body
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Commitment(Vec<u8>);

impl Commitment {
    /// Validate raw label bytes, including that the body decodes
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ParseError> {
        Resource::from_body(strip(COMMITMENT_PREFIX, &bytes)?)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn body(&self) -> &[u8] {
        &self.0[COMMITMENT_PREFIX.len()..]
    }

    pub fn resource(&self) -> Result<Resource, ParseError> {
        Resource::from_body(self.body())
    }

    pub fn to_term(&self) -> Term {
        Term::atom(self.0.clone())
    }
}

/// Proof that a resource was consumed: `NF_` + body
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Nullifier(Vec<u8>);

impl Nullifier {
    /// Validate raw label bytes, including that the body decodes
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ParseError> {
        Resource::from_body(strip(NULLIFIER_PREFIX, &bytes)?)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn body(&self) -> &[u8] {
        &self.0[NULLIFIER_PREFIX.len()..]
    }

    pub fn resource(&self) -> Result<Resource, ParseError> {
        Resource::from_body(self.body())
    }

    /// The commitment of the resource this nullifier consumes
    pub fn commitment(&self) -> Commitment {
        Commitment(prefixed(COMMITMENT_PREFIX, self.body()))
    }

    pub fn to_term(&self) -> Term {
        Term::atom(self.0.clone())
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CM_{}", short_hex(self.body()))
    }
}

impl fmt::Display for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NF_{}", short_hex(self.body()))
    }
}

fn short_hex(body: &[u8]) -> String {
    if body.len() <= 16 {
        hex::encode(body)
    } else {
        format!("{}..", hex::encode(&body[body.len() - 16..]))
    }
}
