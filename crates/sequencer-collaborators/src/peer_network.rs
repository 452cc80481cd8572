//! The peer-to-peer transaction pool (§1's explicit out-of-scope list).

use crate::error::CollaboratorError;
use futures::stream::BoxStream;
use sequencer_types::TxHash;

/// A pending transaction as iterated from the pool. Opaque to this crate; the public processor
/// is the only collaborator that interprets the payload.
#[derive(Debug, Clone)]
pub struct PendingTx {
    /// Hash identifying this transaction in the pool.
    pub hash: TxHash,
    /// Opaque, not-yet-decoded transaction payload.
    pub payload: Vec<u8>,
}

/// What the peer network believes the chain tip is, from its own synchronization process.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PeerNetworkStatus {
    /// Last L2 block number the peer network reports as synced.
    pub synced_to_l2_block_number: u64,
    /// Hash of that block, compared against the other three chain-tip sources (§4.4).
    pub synced_to_l2_block_hash: [u8; 32],
}

/// Transaction pool / peer network interface.
pub trait PeerNetwork: Clone + Send + Sync {
    /// Number of transactions currently sitting in the pool, used to gate block assembly
    /// against `min_txs_per_block`.
    fn get_pending_tx_count(&self) -> impl Future<Output = Result<u64, CollaboratorError>> + Send;

    /// Stream pending transactions in the order the pool would hand them to a block builder.
    fn iterate_pending_txs(&self) -> BoxStream<'static, PendingTx>;

    /// Evict the given transactions from the pool by hash. Only called in proposer mode (§4.5.5):
    /// a validator re-executing someone else's proposal must not evict on its own judgement.
    fn delete_txs(
        &self,
        hashes: &[TxHash],
    ) -> impl Future<Output = Result<(), CollaboratorError>> + Send;

    /// The peer network's own view of chain-tip synchronization.
    fn get_status(&self) -> impl Future<Output = Result<PeerNetworkStatus, CollaboratorError>> + Send;
}
