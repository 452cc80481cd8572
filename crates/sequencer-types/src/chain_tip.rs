//! Chain tip consensus data.

use crate::address::ArchiveRoot;

/// A `(block_number, archive_root)` pair as reported by one of the four upstream sources the
/// eligibility gate polls (world state, L2 block source, peer network, L1→L2 message source).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ChainTip {
    /// L2 block number.
    pub block_number: u64,
    /// Archive root committed at `block_number`.
    pub archive_root: ArchiveRoot,
}

impl ChainTip {
    /// Construct a new chain tip.
    #[must_use]
    pub const fn new(block_number: u64, archive_root: ArchiveRoot) -> Self {
        Self {
            block_number,
            archive_root,
        }
    }

    /// The genesis tip: block number zero, whatever the committed genesis archive root is.
    #[must_use]
    pub const fn genesis(archive_root: ArchiveRoot) -> Self {
        Self {
            block_number: 0,
            archive_root,
        }
    }
}
