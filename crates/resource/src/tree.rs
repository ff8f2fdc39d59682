//! Append-only commitment tree
//!
//! A fixed-arity, fixed-depth Merkle tree over commitment labels. Leaves are
//! `sha256(0x00 || commitment)` and inner nodes `sha256(0x01 || children)`.
//! Unfilled positions hold the empty subtree hash of their level, with the
//! empty leaf being all zeroes. The anchor is the root hash.
//!
//! Only the frontier is kept: for each level, the completed nodes to the
//! left of the position the next leaf falls under. That is enough to append
//! and to compute the root, and its size depends on the depth alone.
//!
//! Trees are values: [`CommitmentTree::add`] returns a new tree and leaves
//! the receiver untouched.

use crate::error::TreeError;
use crate::resource::Commitment;
use ordo_common::{Anchor, Term};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

type Hash = [u8; 32];

const EMPTY_LEAF: Hash = [0u8; 32];
const LEAF_TAG: u8 = 0x00;
const NODE_TAG: u8 = 0x01;

/// Shape of a commitment tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSpec {
    pub arity: u32,
    pub depth: u32,
}

impl Default for TreeSpec {
    fn default() -> Self {
        Self {
            arity: 2,
            depth: 32,
        }
    }
}

impl TreeSpec {
    pub fn new(arity: u32, depth: u32) -> Result<Self, TreeError> {
        let spec = Self { arity, depth };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), TreeError> {
        if self.arity < 2 || self.depth < 1 {
            return Err(TreeError::InvalidSpec {
                arity: self.arity,
                depth: self.depth,
            });
        }
        Ok(())
    }

    /// Maximum number of leaves, saturating at `u64::MAX`
    pub fn capacity(&self) -> u64 {
        (self.arity as u64).checked_pow(self.depth).unwrap_or(u64::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitmentTree {
    spec: TreeSpec,
    /// Leaves appended so far
    size: u64,
    /// Per level, the completed left siblings of the open node at that level
    frontier: Vec<Vec<Hash>>,
    /// Empty subtree hash per level, `empty[0]` being the empty leaf
    empty: Vec<Hash>,
    root: Hash,
}

impl CommitmentTree {
    pub fn new(spec: TreeSpec) -> Result<Self, TreeError> {
        spec.validate()?;
        let empty = empty_hashes(&spec);
        let root = empty[spec.depth as usize];
        Ok(Self {
            spec,
            size: 0,
            frontier: vec![Vec::new(); spec.depth as usize],
            empty,
            root,
        })
    }

    pub fn spec(&self) -> TreeSpec {
        self.spec
    }

    pub fn len(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn anchor(&self) -> Anchor {
        Anchor::from_bytes(self.root)
    }

    /// Append `commitments` in sorted byte order
    ///
    /// Returns the new tree and its anchor. Adding nothing returns an equal
    /// tree with the same anchor. Cost is proportional to the number of
    /// commitments times the depth, independent of the tree's size.
    pub fn add(
        &self,
        commitments: &BTreeSet<Commitment>,
    ) -> Result<(CommitmentTree, Anchor), TreeError> {
        if commitments.is_empty() {
            return Ok((self.clone(), self.anchor()));
        }

        let capacity = self.spec.capacity();
        let total = self.size + commitments.len() as u64;
        if total > capacity {
            return Err(TreeError::TreeFull { capacity });
        }

        let mut next = self.clone();
        let mut completed = None;
        for cm in commitments {
            completed = next.push(leaf_hash(cm.as_bytes()));
        }
        next.size = total;
        next.root = completed.unwrap_or_else(|| next.frontier_root());

        let anchor = next.anchor();
        Ok((next, anchor))
    }

    /// Append one leaf hash, folding every level it completes
    ///
    /// Returns the root when this leaf fills the tree.
    fn push(&mut self, leaf: Hash) -> Option<Hash> {
        let arity = self.spec.arity as usize;
        let mut node = leaf;
        for siblings in self.frontier.iter_mut() {
            siblings.push(node);
            if siblings.len() < arity {
                return None;
            }
            node = node_hash(siblings);
            siblings.clear();
        }
        Some(node)
    }

    /// Root of a tree that is not full, from the frontier and empty subtrees
    fn frontier_root(&self) -> Hash {
        let arity = self.spec.arity as usize;
        let mut carry: Option<Hash> = None;

        for (level, siblings) in self.frontier.iter().enumerate() {
            if siblings.is_empty() && carry.is_none() {
                continue;
            }
            let mut children = siblings.clone();
            children.extend(carry);
            children.resize(arity, self.empty[level]);
            carry = Some(node_hash(&children));
        }

        carry.unwrap_or(self.empty[self.spec.depth as usize])
    }

    /// `[arity depth size root [[hash ...] ...]]`
    ///
    /// Arity and depth are 4-byte, size 8-byte big-endian atoms. The last
    /// field holds the frontier, one list per level from the leaves up.
    pub fn to_term(&self) -> Term {
        Term::List(vec![
            Term::atom(self.spec.arity.to_be_bytes().to_vec()),
            Term::atom(self.spec.depth.to_be_bytes().to_vec()),
            Term::atom(self.size.to_be_bytes().to_vec()),
            Term::atom(self.root.to_vec()),
            Term::List(
                self.frontier
                    .iter()
                    .map(|siblings| {
                        Term::List(siblings.iter().map(|h| Term::atom(h.to_vec())).collect())
                    })
                    .collect(),
            ),
        ])
    }

    pub fn from_term(term: &Term) -> Result<Self, TreeError> {
        let malformed = |what: &str| TreeError::Malformed(what.to_string());

        let [arity, depth, size, root, frontier] = term
            .as_list()
            .ok_or_else(|| malformed("tree must be a list"))?
        else {
            return Err(malformed("tree must have five fields"));
        };

        let spec = TreeSpec {
            arity: read_u32(arity).ok_or_else(|| malformed("bad arity"))?,
            depth: read_u32(depth).ok_or_else(|| malformed("bad depth"))?,
        };
        let mut tree = Self::new(spec)?;
        tree.size = read_u64(size).ok_or_else(|| malformed("bad size"))?;
        if tree.size > spec.capacity() {
            return Err(malformed("more leaves than the tree holds"));
        }

        let levels = frontier
            .as_list()
            .ok_or_else(|| malformed("frontier must be a list"))?;
        if levels.len() != spec.depth as usize {
            return Err(malformed("frontier needs one entry per level"));
        }

        // Level `l` holds digit `l` of the size written in base `arity`
        let mut rest = tree.size;
        for (siblings, level) in tree.frontier.iter_mut().zip(levels) {
            let hashes = level
                .as_list()
                .ok_or_else(|| malformed("frontier level must be a list"))?;
            if hashes.len() as u64 != rest % spec.arity as u64 {
                return Err(malformed("frontier does not match the size"));
            }
            rest /= spec.arity as u64;
            for hash in hashes {
                siblings.push(read_hash(hash).ok_or_else(|| malformed("bad frontier hash"))?);
            }
        }

        let root = read_hash(root).ok_or_else(|| malformed("bad root"))?;
        tree.root = if tree.size == spec.capacity() {
            root
        } else {
            tree.frontier_root()
        };
        if tree.root != root {
            return Err(malformed("root does not match the frontier"));
        }

        Ok(tree)
    }
}

fn read_u32(term: &Term) -> Option<u32> {
    let bytes: [u8; 4] = term.as_atom()?.try_into().ok()?;
    Some(u32::from_be_bytes(bytes))
}

fn read_u64(term: &Term) -> Option<u64> {
    let bytes: [u8; 8] = term.as_atom()?.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

fn read_hash(term: &Term) -> Option<Hash> {
    term.as_atom()?.try_into().ok()
}

fn leaf_hash(commitment: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_TAG]);
    hasher.update(commitment);
    hasher.finalize().into()
}

fn node_hash(children: &[Hash]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([NODE_TAG]);
    for child in children {
        hasher.update(child);
    }
    hasher.finalize().into()
}

fn empty_hashes(spec: &TreeSpec) -> Vec<Hash> {
    let mut empty = Vec::with_capacity(spec.depth as usize + 1);
    empty.push(EMPTY_LEAF);
    for height in 0..spec.depth as usize {
        let children = vec![empty[height]; spec.arity as usize];
        empty.push(node_hash(&children));
    }
    empty
}
