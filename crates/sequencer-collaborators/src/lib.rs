//! External interfaces the sequencer core is driven through.
//!
//! Every collaborator the core depends on — the L1 publisher, the validator client, the peer
//! network, world state, the public processor, and the block builder — is expressed here as a
//! trait. The core is generic over these traits rather than over trait objects, so a concrete
//! node wires in its own implementations at the composition root and the core itself never names
//! a concrete collaborator type.

pub mod block_builder;
pub mod block_source;
pub mod error;
pub mod peer_network;
pub mod processing;
pub mod publisher;
pub mod validator_client;
pub mod world_state;

pub use block_builder::{BlockBuilderFactory, FinalizedBlock, L2BlockBuilder};
pub use block_source::{L1ToL2Message, L1ToL2MessageSource, L2Block, L2BlockSource, L2Tip};
pub use error::CollaboratorError;
pub use peer_network::{PeerNetwork, PeerNetworkStatus, PendingTx};
pub use processing::{
    FailedTx, ProcessLimits, ProcessOutcome, ProcessedTx, PublicProcessor, PublicProcessorFactory,
    TxValidator, TxValidatorFactory,
};
pub use publisher::{
    Attestation, EnqueueProposeOptions, SendRequestsResult, SequencerPublisher, VoteType,
};
pub use validator_client::{
    order_attestations_by_committee, BlockProposal, BuildBlockFromProposal, BuildResult,
    ValidatorClient,
};
pub use world_state::{Fork, WorldState, WorldStateSyncSummary};
