//! The block builder: Merkle tree insertions that turn processed transactions into a
//! finalized, content-committed block (§4.5.6).

use crate::block_source::L1ToL2Message;
use crate::error::CollaboratorError;
use crate::processing::ProcessedTx;
use sequencer_types::{ArchiveRoot, GlobalVariables, Mana, ProposedBlockHeader};

/// A fully assembled block, produced by [`L2BlockBuilder::set_block_completed`].
#[derive(Debug, Clone)]
pub struct FinalizedBlock {
    /// The header, now carrying a non-`None` content commitment and final mana total.
    pub header: ProposedBlockHeader,
    /// Archive root of the finalized block.
    pub archive_root: ArchiveRoot,
    /// Total mana consumed.
    pub total_mana_used: Mana,
}

/// Builds one block on top of an orchestrator fork.
pub trait L2BlockBuilder: Send {
    /// Begin a new block: seed the builder with global variables, pending L1→L2 messages, and
    /// the previous header.
    fn start_new_block(
        &mut self,
        globals: GlobalVariables,
        l1_to_l2_messages: Vec<L1ToL2Message>,
        prev_header: &ProposedBlockHeader,
    ) -> impl Future<Output = Result<(), CollaboratorError>> + Send;

    /// Insert processed transactions into the block's Merkle-committed trees.
    fn add_txs(
        &mut self,
        processed: Vec<ProcessedTx>,
    ) -> impl Future<Output = Result<(), CollaboratorError>> + Send;

    /// Pad to a fixed tree shape and produce the finalized block.
    fn set_block_completed(
        self,
    ) -> impl Future<Output = Result<FinalizedBlock, CollaboratorError>> + Send;
}

/// Factory for [`L2BlockBuilder`]s, bound to an orchestrator fork.
pub trait BlockBuilderFactory: Send + Sync {
    /// The fork type this factory's builders are bound to.
    type Fork;
    /// The builder type this factory creates.
    type Builder: L2BlockBuilder;

    /// Create a builder bound to `fork`.
    fn create(&self, fork: &Self::Fork) -> Self::Builder;
}
