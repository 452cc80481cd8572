//! The sequencer's phase alphabet.

use core::fmt;

/// A phase in the per-slot sequencer state machine.
///
/// See `sequencer-state-machine` for the transition table and `sequencer-timetable` for the
/// per-phase deadlines.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Phase {
    /// The sequencer is not running. Only `start`/`restart` can leave this phase.
    Stopped,
    /// Waiting for the next poll tick; no slot is currently being worked on.
    Idle,
    /// Confirming chain-tip consensus across the four upstream sources.
    Synchronizing,
    /// Asking L1 whether the local operator is the proposer for the next slot.
    ProposerCheck,
    /// Building `GlobalVariables`/`ProposedBlockHeader` and enqueueing governance/slashing votes.
    InitializingProposal,
    /// Forking world state, running public processing, and building the block.
    CreatingBlock,
    /// Broadcasting the proposal and waiting for a supermajority of attestations.
    CollectingAttestations,
    /// Enqueueing the block (with attestations) for L1 publication.
    PublishingBlock,
}

impl Phase {
    /// All phases, in no particular order; useful for exhaustive iteration in tests.
    pub const ALL: [Phase; 8] = [
        Phase::Stopped,
        Phase::Idle,
        Phase::Synchronizing,
        Phase::ProposerCheck,
        Phase::InitializingProposal,
        Phase::CreatingBlock,
        Phase::CollectingAttestations,
        Phase::PublishingBlock,
    ];

    /// Whether this phase has no time constraint (`slot` is treated as `Slot::ZERO`).
    #[must_use]
    pub const fn is_timeless(self) -> bool {
        matches!(self, Phase::Idle | Phase::Stopped)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Stopped => "STOPPED",
            Phase::Idle => "IDLE",
            Phase::Synchronizing => "SYNCHRONIZING",
            Phase::ProposerCheck => "PROPOSER_CHECK",
            Phase::InitializingProposal => "INITIALIZING_PROPOSAL",
            Phase::CreatingBlock => "CREATING_BLOCK",
            Phase::CollectingAttestations => "COLLECTING_ATTESTATIONS",
            Phase::PublishingBlock => "PUBLISHING_BLOCK",
        };
        f.write_str(name)
    }
}
