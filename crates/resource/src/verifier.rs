//! Double-spend and root anchoring checks
//!
//! All verification state lives in versioned keys under the store's reserved
//! prefix, and is read through the ordering engine under the transaction's
//! own id:
//! - `nullifiers`: set of every accepted nullifier
//! - `commitments`: set of every accepted commitment
//! - `anchor`: the current commitment tree root
//! - `commitment_tree`: the current tree, in term form
//!
//! Verification never writes. On success it returns the effects to apply at
//! the transaction's index.

use crate::error::VerifyError;
use crate::resource::{Commitment, Nullifier};
use crate::transaction::Transaction;
use crate::tree::{CommitmentTree, TreeSpec};
use ordo_common::{Anchor, OrderIndex, Term, TransactionId};
use ordo_ordering::OrderingEngine;
use ordo_store::Effects;
use std::collections::BTreeSet;
use std::sync::Arc;

pub const NULLIFIERS_KEY: &[u8] = b"\x00ordo/nullifiers";
pub const COMMITMENTS_KEY: &[u8] = b"\x00ordo/commitments";
pub const ANCHOR_KEY: &[u8] = b"\x00ordo/anchor";
pub const TREE_KEY: &[u8] = b"\x00ordo/commitment_tree";

/// An accepted transaction and what accepting it changes
#[derive(Debug, Clone)]
pub struct Verified {
    pub transaction: Transaction,
    pub nullifiers: BTreeSet<Nullifier>,
    pub anchor: Anchor,
    pub effects: Effects,
}

pub struct ResourceVerifier {
    ordering: Arc<OrderingEngine>,
    spec: TreeSpec,
}

impl ResourceVerifier {
    pub fn new(ordering: Arc<OrderingEngine>, spec: TreeSpec) -> Self {
        Self { ordering, spec }
    }

    pub async fn verify(
        &self,
        id: &TransactionId,
        transaction: Transaction,
    ) -> Result<Verified, VerifyError> {
        let commitments = transaction.commitments();
        let nullifiers = transaction.nullifiers();

        self.check_unique(id, &commitments, &nullifiers).await?;
        self.check_roots(id, &transaction.roots, &nullifiers).await?;

        let tree = match self.ordering.read(id, TREE_KEY).await? {
            Some(term) => CommitmentTree::from_term(&term)?,
            None => CommitmentTree::new(self.spec)?,
        };
        let (tree, anchor) = tree.add(&commitments)?;

        let mut effects = Effects::none()
            .with_append(NULLIFIERS_KEY, nullifiers.iter().map(Nullifier::to_term).collect())
            .with_append(COMMITMENTS_KEY, commitments.iter().map(Commitment::to_term).collect())
            .with_write(ANCHOR_KEY, Term::atom(anchor.as_bytes().to_vec()))
            .with_write(TREE_KEY, tree.to_term());
        if !commitments.is_empty() {
            effects = effects.with_anchor(anchor);
        }

        tracing::debug!(
            "Verified {}: {} commitments, {} nullifiers, anchor {}",
            id,
            commitments.len(),
            nullifiers.len(),
            anchor
        );

        Ok(Verified {
            transaction,
            nullifiers,
            anchor,
            effects,
        })
    }

    /// Reject labels already accepted by an earlier transaction
    async fn check_unique(
        &self,
        id: &TransactionId,
        commitments: &BTreeSet<Commitment>,
        nullifiers: &BTreeSet<Nullifier>,
    ) -> Result<(), VerifyError> {
        let spent = self.read_set(id, NULLIFIERS_KEY, None).await?;
        if let Some(nf) = nullifiers.iter().find(|nf| spent.contains(&nf.to_term())) {
            return Err(VerifyError::DoubleSpend(nf.to_string()));
        }

        let created = self.read_set(id, COMMITMENTS_KEY, None).await?;
        if let Some(cm) = commitments.iter().find(|cm| created.contains(&cm.to_term())) {
            return Err(VerifyError::DuplicateCommitment(cm.to_string()));
        }

        Ok(())
    }

    /// Every non-ephemeral nullifier needs its commitment at the highest
    /// declared root that was actually recorded
    async fn check_roots(
        &self,
        id: &TransactionId,
        roots: &BTreeSet<Anchor>,
        nullifiers: &BTreeSet<Nullifier>,
    ) -> Result<(), VerifyError> {
        let mut anchored = Vec::new();
        for nf in nullifiers {
            if !nf.resource()?.ephemeral {
                anchored.push(nf);
            }
        }
        if anchored.is_empty() {
            return Ok(());
        }

        let Some(height) = self.highest_root(id, roots).await? else {
            return Err(VerifyError::StaleOrInvalidRoot(format!(
                "none of {} declared roots is recorded, and {} nullifiers are not ephemeral",
                roots.len(),
                anchored.len()
            )));
        };

        let committed = self.read_set(id, COMMITMENTS_KEY, Some(height)).await?;
        for nf in anchored {
            if !committed.contains(&nf.commitment().to_term()) {
                return Err(VerifyError::StaleOrInvalidRoot(format!(
                    "{} has no commitment at height {}",
                    nf, height
                )));
            }
        }
        Ok(())
    }

    async fn highest_root(
        &self,
        id: &TransactionId,
        roots: &BTreeSet<Anchor>,
    ) -> Result<Option<OrderIndex>, VerifyError> {
        let mut highest = None;
        for root in roots {
            if let Some(height) = self.ordering.root_height(id, root).await? {
                highest = highest.max(Some(height));
            }
        }
        Ok(highest)
    }

    async fn read_set(
        &self,
        id: &TransactionId,
        key: &[u8],
        height: Option<OrderIndex>,
    ) -> Result<BTreeSet<Term>, VerifyError> {
        let value = match height {
            Some(height) => self.ordering.read_at(id, key, height).await?,
            None => self.ordering.read(id, key).await?,
        };
        match value {
            None => Ok(BTreeSet::new()),
            Some(Term::Set(items)) => Ok(items),
            Some(_) => Err(VerifyError::CorruptState(
                String::from_utf8_lossy(key).into_owned(),
            )),
        }
    }
}
