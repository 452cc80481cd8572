//! Attestation collection (§4.5.8): broadcast the proposal, collect a supermajority, and reorder
//! the result to match committee index order before it can be handed to the publisher.

use sequencer_collaborators::{
    order_attestations_by_committee, Attestation, BlockProposal, CollaboratorError, ValidatorClient,
};
use sequencer_types::L1Address;
use std::time::Duration;

/// Minimum attestation count for `committee` to be considered a supermajority: `⌊2n/3⌋ + 1`.
#[must_use]
pub fn required_attestations(committee_size: usize) -> usize {
    (2 * committee_size) / 3 + 1
}

/// Broadcast `proposal` and collect a supermajority of attestations, reordered to match
/// `committee`'s index order. Returns an empty vector without broadcasting when `committee` is
/// empty (solo-proposer / testnet mode, §4.5.8).
pub async fn collect<Val>(
    validator_client: &Val,
    committee: &[L1Address],
    proposal: BlockProposal,
    deadline: Duration,
) -> Result<Vec<Attestation>, CollaboratorError>
where
    Val: ValidatorClient,
{
    if committee.is_empty() {
        return Ok(Vec::new());
    }

    let required = required_attestations(committee.len());

    validator_client
        .broadcast_block_proposal(proposal.clone())
        .await?;

    let attestations = validator_client
        .collect_attestations(&proposal, required, deadline)
        .await?;

    Ok(order_attestations_by_committee(committee, attestations))
}
