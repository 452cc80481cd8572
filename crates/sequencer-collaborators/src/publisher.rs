//! The L1 publisher: transaction batching, gas pricing, and nonce management live entirely on
//! the other side of this trait (§1's explicit out-of-scope list).

use crate::error::CollaboratorError;
use sequencer_types::{ArchiveRoot, L1Address, ProposedBlockHeader, Slot, TxHash};

/// A signature over a block proposal from one committee member.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Attestation {
    /// Committee member that produced this signature.
    pub signer: L1Address,
    /// Raw signature bytes.
    pub signature: Vec<u8>,
}

/// Which kind of vote is being cast this slot; §4.5.1 enqueues both independently of block
/// assembly succeeding.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum VoteType {
    /// A governance proposal vote.
    Governance,
    /// A validator slashing vote.
    Slashing,
}

/// Options accompanying a block enqueued for publication.
#[derive(Debug, Clone)]
pub struct EnqueueProposeOptions {
    /// Whether to include full transaction bodies alongside the proposal.
    pub publish_txs_with_proposals: bool,
    /// Unix timestamp after which the enqueued transaction should be considered abandoned.
    pub tx_timeout_at: u64,
}

/// Result of flushing all enqueued publisher requests (block proposal and votes) in one batch.
#[derive(Debug, Clone, Default)]
pub struct SendRequestsResult {
    /// Names of the actions that were accepted by L1 this round (e.g. `"propose"`, `"vote"`).
    pub valid_actions: Vec<String>,
}

impl SendRequestsResult {
    /// Whether a `"propose"` action succeeded this round — the signal the core increments
    /// `filled_slot` on, per §4.5.9.
    #[must_use]
    pub fn proposed_successfully(&self) -> bool {
        self.valid_actions.iter().any(|action| action == "propose")
    }
}

/// The L1 rollup contract's view of proposer eligibility and submission validity.
pub trait SequencerPublisher: Clone + Send + Sync {
    /// Ask whether the local operator may propose at the next Ethereum block, given the tip
    /// archive root it observed. Returns `None` if it is not our turn or the chain has advanced.
    fn can_propose_at_next_eth_block(
        &self,
        tip_archive: ArchiveRoot,
    ) -> impl Future<Output = Result<Option<(Slot, u64)>, CollaboratorError>> + Send;

    /// Check that L1 will still accept a block for this slot (no other proposer has published,
    /// slot not expired). Called twice per §3 invariant 4: before processing and after assembly.
    fn validate_block_for_submission(
        &self,
        header: &ProposedBlockHeader,
    ) -> impl Future<Output = Result<(), CollaboratorError>> + Send;

    /// Enqueue (not send) a proposed block along with its attestations and transaction hashes.
    /// Returns `false` if L1 rejected the enqueue outright, which is fatal for the slot.
    fn enqueue_propose_l2_block(
        &self,
        header: ProposedBlockHeader,
        attestations: Vec<Attestation>,
        tx_hashes: Vec<TxHash>,
        options: EnqueueProposeOptions,
    ) -> impl Future<Output = Result<bool, CollaboratorError>> + Send;

    /// Enqueue a governance or slashing vote for `slot`. Failures here are logged and swallowed
    /// by the caller — they never fail a block, per §7's propagation policy.
    fn enqueue_cast_vote(
        &self,
        slot: Slot,
        timestamp: u64,
        vote_type: VoteType,
    ) -> impl Future<Output = Result<(), CollaboratorError>> + Send;

    /// Flush every enqueued request (block proposal and votes) in one L1 round trip.
    fn send_requests(
        &self,
    ) -> impl Future<Output = Result<SendRequestsResult, CollaboratorError>> + Send;

    /// The current epoch's attestation committee, in the order attestations must be returned in.
    /// An empty committee means solo-proposer mode (§4.5.8): attestations are skipped entirely.
    fn get_current_epoch_committee(
        &self,
    ) -> impl Future<Output = Result<Vec<L1Address>, CollaboratorError>> + Send;

    /// The L1 address this publisher signs transactions as.
    fn get_sender_address(&self) -> L1Address;

    /// The L1 address of the forwarder contract transactions are routed through, if any.
    fn get_forwarder_address(&self) -> Option<L1Address>;

    /// Set the opaque governance payload routed through future proposals.
    fn set_governance_payload(&self, payload: Vec<u8>);

    /// Register the callback used to produce a slashing payload lazily, only when a vote is
    /// actually about to be cast.
    fn register_slash_payload_getter(&self, getter: impl Fn() -> Vec<u8> + Send + Sync + 'static);

    /// Abort any in-flight L1 submission. Called by `stop()`.
    fn interrupt(&self);

    /// Restart the publisher's internal connection/queue state. Called by `restart()`.
    fn restart(&self);
}
