//! The validator client: peer-to-peer attestation gossip and signature aggregation live on the
//! other side of this trait (§1's explicit out-of-scope list).

use crate::error::CollaboratorError;
use crate::publisher::Attestation;
use sequencer_types::{GlobalVariables, L1Address, ProposedBlockHeader, TxHash};
use std::time::Duration;

/// A candidate block broadcast to the committee for attestation.
#[derive(Debug, Clone)]
pub struct BlockProposal {
    /// L2 block number this proposal is for.
    pub block_number: u64,
    /// The finalized (or about-to-be-finalized) header.
    pub header: ProposedBlockHeader,
    /// Transaction hashes included in the block.
    pub tx_hashes: Vec<TxHash>,
    /// Full transaction bodies, present only when `publish_txs_with_proposals` is set.
    pub tx_bodies: Option<Vec<Vec<u8>>>,
}

/// Result of a foreign proposal handed back to the sequencer via
/// [`BuildBlockFromProposal::build_block_from_proposal`].
#[derive(Debug, Clone)]
pub struct BuildResult {
    /// The re-executed, finalized header.
    pub header: ProposedBlockHeader,
}

/// Registered with the validator client so that, when this node is re-executing someone else's
/// proposal as a validator, it can call back into the sequencer's own block-building logic.
///
/// This is the Rust shape of the teacher's `BlockProducer` trait registered with a slot worker:
/// a single-method callback object handed to the collaborator at construction time, resolving
/// the sequencer ↔ validator cyclic reference by injection rather than a raw function pointer.
pub trait BuildBlockFromProposal: Send + Sync {
    /// Re-execute `proposal` against local world state and return the resulting header.
    fn build_block_from_proposal(
        &self,
        block_number: u64,
        globals: GlobalVariables,
        proposal: &BlockProposal,
    ) -> impl Future<Output = Result<BuildResult, CollaboratorError>> + Send;
}

/// Peer-to-peer attestation gossip and signature aggregation.
pub trait ValidatorClient: Clone + Send + Sync {
    /// This node's validator (attestation-signing) address.
    fn get_validator_address(&self) -> L1Address;

    /// Broadcast `proposal` to the committee over the peer network.
    fn broadcast_block_proposal(
        &self,
        proposal: BlockProposal,
    ) -> impl Future<Output = Result<(), CollaboratorError>> + Send;

    /// Collect attestations for `proposal` until `required` signatures are gathered or `deadline`
    /// elapses, whichever comes first.
    fn collect_attestations(
        &self,
        proposal: &BlockProposal,
        required: usize,
        deadline: Duration,
    ) -> impl Future<Output = Result<Vec<Attestation>, CollaboratorError>> + Send;

    /// Register the callback invoked when this node is asked to re-execute a foreign proposal as
    /// a validator. Resolves the sequencer ↔ validator cyclic reference by injection: the
    /// validator client holds a non-owning handle to the callback, the composition root owns
    /// both (§9).
    fn register_build_block_from_proposal<B>(&self, callback: B)
    where
        B: BuildBlockFromProposal + 'static;

    /// Tear down any in-flight gossip/aggregation work. Called by `stop()`.
    fn stop(&self);
}

/// Reorder `attestations` to match `committee`'s index order.
///
/// The L1 contract requires attestations in committee order (§4.5.8); attestations from signers
/// absent from the committee are dropped.
#[must_use]
pub fn order_attestations_by_committee(
    committee: &[L1Address],
    mut attestations: Vec<Attestation>,
) -> Vec<Attestation> {
    attestations.retain(|attestation| committee.contains(&attestation.signer));
    attestations.sort_by_key(|attestation| {
        committee
            .iter()
            .position(|member| *member == attestation.signer)
            .unwrap_or(usize::MAX)
    });
    attestations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(byte: u8) -> L1Address {
        L1Address::new([byte; 20])
    }

    fn attestation(byte: u8) -> Attestation {
        Attestation {
            signer: address(byte),
            signature: vec![byte],
        }
    }

    #[test]
    fn reorders_to_committee_index_order() {
        let committee = vec![address(3), address(1), address(2)];
        let attestations = vec![attestation(1), attestation(2), attestation(3)];

        let ordered = order_attestations_by_committee(&committee, attestations);

        assert_eq!(
            ordered.iter().map(|a| a.signer).collect::<Vec<_>>(),
            vec![address(3), address(1), address(2)]
        );
    }

    #[test]
    fn drops_attestations_from_non_committee_signers() {
        let committee = vec![address(1), address(2)];
        let attestations = vec![attestation(1), attestation(99), attestation(2)];

        let ordered = order_attestations_by_committee(&committee, attestations);

        assert_eq!(ordered.len(), 2);
        assert!(ordered.iter().all(|a| a.signer != address(99)));
    }
}
