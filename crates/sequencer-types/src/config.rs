//! Hot-reloadable sequencer configuration.

use crate::address::{L1Address, L2Address};
use serde::{Deserialize, Serialize};

/// Atomic, hot-reloadable configuration snapshot.
///
/// A fresh [`Configuration`] is handed to `update_config` by whatever loads it (a file watcher,
/// an admin RPC, ...); that machinery is out of scope here. Every field is read once per slot
/// through an `Arc<Configuration>` swapped in behind a `parking_lot::RwLock` (see
/// `sequencer-core`), so a slot in flight always sees a single consistent snapshot even if
/// `update_config` runs concurrently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Cadence, in milliseconds, at which the main loop polls for work.
    pub polling_interval_ms: u64,

    /// Minimum pending transactions required to build a block (bypassed by `flush`).
    pub min_txs_per_block: usize,
    /// Maximum transactions admitted into a single block.
    pub max_txs_per_block: usize,

    /// Maximum L2 execution gas a block may consume.
    pub max_l2_block_gas: u64,
    /// Maximum serialized block size, in bytes.
    pub max_block_size_bytes: u64,

    /// L1 address credited with the block reward.
    pub coinbase: L1Address,
    /// L2 address credited with transaction fees.
    pub fee_recipient: L2Address,

    /// Identifiers of contract functions permitted to run during public setup.
    pub tx_public_setup_allow_list: Vec<String>,

    /// When `false`, `Timetable` deadlines are advisory only (no `TooSlow` is ever raised).
    pub enforce_timetable: bool,
    /// Whether to include full transaction bodies in broadcast block proposals.
    pub publish_txs_with_proposals: bool,
    /// Opaque governance payload routed to the publisher unmodified.
    pub governance_proposer_payload: Vec<u8>,
    /// Latest seconds-into-slot at which an L1 transaction may still land.
    pub max_l1_tx_inclusion_time_into_slot: u64,

    /// Duration of one Ethereum (L1) slot, in seconds.
    pub ethereum_slot_duration_secs: u64,
    /// Duration of one rollup (L2) slot, in seconds.
    pub aztec_slot_duration_secs: u64,
    /// Unix timestamp of the L1 genesis block.
    pub l1_genesis_time: u64,
    /// First L2 block number the chain tip is allowed to report as non-genesis.
    pub initial_l2_block_num: u64,
}

impl Configuration {
    /// Whether `count` pending transactions satisfy the minimum, honoring an active flush.
    #[must_use]
    pub const fn meets_minimum(&self, count: usize, flushing: bool) -> bool {
        flushing || count >= self.min_txs_per_block
    }
}
