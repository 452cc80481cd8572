//! The world-state synchronizer: Merkle tree forks and the archiver (§1's explicit out-of-scope
//! list).

use crate::error::CollaboratorError;
use sequencer_types::ArchiveRoot;

/// The world-state synchronizer's own view of how far it has synced.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct WorldStateSyncSummary {
    /// Latest block number the synchronizer has applied.
    pub latest_block_number: u64,
    /// Hash of that block, compared against the other three chain-tip sources (§4.4).
    pub latest_block_hash: [u8; 32],
}

/// A copy-on-write view of world state that can be mutated without affecting the committed
/// state (see the glossary). Two independent forks are held open for the duration of
/// `CreatingBlock` (§4.5.3: one driven by public processing, one by the block builder).
pub trait Fork: Send {
    /// Archive root of the block this fork was opened at.
    fn get_initial_header_archive_root(&self) -> ArchiveRoot;

    /// Release this fork. Errors here are logged and swallowed (§7): the node may have already
    /// stopped by the time the deferred 5-second close runs.
    fn close(self) -> impl Future<Output = Result<(), CollaboratorError>> + Send;
}

/// The world-state synchronizer.
pub trait WorldState: Clone + Send + Sync {
    /// The fork type this world state produces.
    type Fork: Fork;

    /// Current synchronization summary.
    fn status(&self) -> impl Future<Output = Result<WorldStateSyncSummary, CollaboratorError>> + Send;

    /// Block, block at `block_number − 1` per §4.5.3.
    fn sync_immediate(
        &self,
        block_number: u64,
        wait: bool,
    ) -> impl Future<Output = Result<u64, CollaboratorError>> + Send;

    /// Open a fork at `block_number`.
    fn fork(
        &self,
        block_number: u64,
    ) -> impl Future<Output = Result<Self::Fork, CollaboratorError>> + Send;

    /// Archive root of the committed (non-forked) world state, used at genesis when the L2 block
    /// source has no hash yet (§4.4).
    fn get_committed_archive_root(
        &self,
    ) -> impl Future<Output = Result<ArchiveRoot, CollaboratorError>> + Send;
}
