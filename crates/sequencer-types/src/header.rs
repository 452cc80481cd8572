//! Global variables and the proposed block header built from them.

use crate::address::{ArchiveRoot, L1Address, L2Address};
use crate::slot::Slot;

/// Chain-wide identifiers, immutable once built for a given slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GlobalVariables {
    /// Chain identifier.
    pub chain_id: u64,
    /// Protocol version in effect for this block.
    pub protocol_version: u32,
    /// L2 block number this slot is producing.
    pub block_number: u64,
    /// The slot this block is produced for.
    pub slot_number: Slot,
    /// Unix timestamp this block claims.
    pub timestamp: u64,
    /// L1 address credited with the block reward.
    pub coinbase: L1Address,
    /// L2 address credited with transaction fees.
    pub fee_recipient: L2Address,
}

/// Aggregate work done by block execution, measured in [mana](crate) units.
pub type Mana = u64;

/// Content commitment of a block, produced by the block builder once transactions have been
/// inserted into the Merkle-committed trees. `None` until `set_block_completed` runs.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ContentCommitment {
    /// Root of the finalized block's archive tree.
    pub archive_root: ArchiveRoot,
}

/// A block header under construction. Starts with an empty content commitment and zero mana;
/// both are filled in by the block builder in §4.5.6.
#[derive(Debug, Clone)]
pub struct ProposedBlockHeader {
    /// Global variables this header was built from.
    pub globals: GlobalVariables,
    /// Archive root of the parent block.
    pub last_archive_root: ArchiveRoot,
    /// Content commitment, filled in once the block builder completes the block.
    pub content_commitment: Option<ContentCommitment>,
    /// Total mana consumed by the block, filled in alongside the content commitment.
    pub total_mana_used: Mana,
}

impl ProposedBlockHeader {
    /// Construct a new header placeholder for `globals`, with an empty commitment and zero mana,
    /// per §3's `ProposedBlockHeader` invariant.
    #[must_use]
    pub const fn new(globals: GlobalVariables, last_archive_root: ArchiveRoot) -> Self {
        Self {
            globals,
            last_archive_root,
            content_commitment: None,
            total_mana_used: 0,
        }
    }

    /// Whether the block builder has finished filling in this header.
    #[must_use]
    pub const fn is_finalized(&self) -> bool {
        self.content_commitment.is_some()
    }
}
