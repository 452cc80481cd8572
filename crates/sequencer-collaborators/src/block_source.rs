//! The canonical L2 block source and the L1→L2 message source (§1's explicit out-of-scope list).

use crate::error::CollaboratorError;
use sequencer_types::ArchiveRoot;

/// A finalized L2 block as seen by the canonical block source.
#[derive(Debug, Clone)]
pub struct L2Block {
    /// Block number.
    pub number: u64,
    /// Archive root committed by this block.
    pub archive_root: ArchiveRoot,
}

/// The advertised L2 chain tip, `None` at genesis (§4.4's consensus-rule exception).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct L2Tip {
    /// Tip block number.
    pub number: u64,
    /// Tip block hash, absent only at genesis.
    pub hash: Option<[u8; 32]>,
}

/// The canonical L2 block source.
pub trait L2BlockSource: Clone + Send + Sync {
    /// Fetch a finalized block by number, `None` if it does not exist yet.
    fn get_block(
        &self,
        number: u64,
    ) -> impl Future<Output = Result<Option<L2Block>, CollaboratorError>> + Send;

    /// The source's own advertised chain tip.
    fn get_l2_tips(&self) -> impl Future<Output = Result<L2Tip, CollaboratorError>> + Send;
}

/// A message bridged from L1 to L2, to be included in the next block's message tree.
#[derive(Debug, Clone)]
pub struct L1ToL2Message {
    /// Opaque message payload.
    pub payload: Vec<u8>,
}

/// The L1→L2 message source.
pub trait L1ToL2MessageSource: Clone + Send + Sync {
    /// Messages ready for inclusion as of `block_number`.
    fn get_l1_to_l2_messages(
        &self,
        block_number: u64,
    ) -> impl Future<Output = Result<Vec<L1ToL2Message>, CollaboratorError>> + Send;

    /// The source's own advertised chain tip.
    fn get_l2_tips(&self) -> impl Future<Output = Result<L2Tip, CollaboratorError>> + Send;
}
