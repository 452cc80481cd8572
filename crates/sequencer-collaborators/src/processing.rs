//! The public processor: replay of the publicly-visible portion of each transaction against
//! world state (§1's explicit out-of-scope list — the processor itself is external; this crate
//! only declares the interface the core drives it through).

use crate::error::CollaboratorError;
use crate::peer_network::PendingTx;
use futures::stream::BoxStream;
use sequencer_types::{GlobalVariables, Mana, TxHash};
use std::time::Instant;

/// Budget passed into [`PublicProcessor::process`]. Proposer mode sets every cap; validator mode
/// (re-executing a foreign proposal) omits the transaction-count/size/gas caps, per §4.5.5 —
/// validators must reproduce exactly what the proposer claims to have built, not re-gate it.
#[derive(Debug, Clone)]
pub struct ProcessLimits {
    /// Hard wall-clock deadline for the processing loop, only set when `enforce_timetable`.
    pub deadline: Option<Instant>,
    /// Maximum transactions to admit. Proposer mode only.
    pub max_transactions: Option<usize>,
    /// Maximum serialized block size, in bytes. Proposer mode only.
    pub max_block_size: Option<u64>,
    /// Maximum block gas. Proposer mode only.
    pub max_block_gas: Option<u64>,
}

/// A transaction that processed successfully and is ready for the block builder.
#[derive(Debug, Clone)]
pub struct ProcessedTx {
    /// Transaction hash.
    pub hash: TxHash,
    /// Mana consumed by this transaction.
    pub mana_used: Mana,
}

/// A transaction that failed public processing and should be evicted from the pool (proposer
/// mode only, §4.5.5).
#[derive(Debug, Clone)]
pub struct FailedTx {
    /// Transaction hash.
    pub hash: TxHash,
    /// Human-readable failure reason, for logging.
    pub reason: String,
}

/// Outcome of one [`PublicProcessor::process`] call.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutcome {
    /// Transactions that processed successfully, in inclusion order.
    pub processed: Vec<ProcessedTx>,
    /// Transactions that failed, in the order they were encountered.
    pub failed: Vec<FailedTx>,
    /// Total mana used across `processed`.
    pub mana_used: Mana,
}

/// A per-slot transaction validator, built from the fork, contract data, global variables, and
/// the public-setup allow-list (§4.5.5). Threaded through `process` rather than owned by the
/// processor so the same processor type can be reused across slots with fresh validators.
pub trait TxValidator: Send + Sync {
    /// Whether `tx` is allowed to run its public-setup phase in this block.
    fn allows_public_setup(&self, tx: &PendingTx) -> bool;
}

/// Factory for [`TxValidator`]s, bound to a fork, this slot's global variables, and the
/// configured public-setup allow-list.
pub trait TxValidatorFactory: Send + Sync {
    /// The fork type this factory's validators are bound to.
    type Fork;
    /// The validator type this factory creates.
    type Validator: TxValidator;

    /// Create a validator for `fork`/`globals`, permitting only `allow_list` to run public setup.
    fn create(
        &self,
        fork: &Self::Fork,
        globals: GlobalVariables,
        allow_list: &[String],
    ) -> Self::Validator;
}

/// A public processor bound to one fork and one slot's global variables.
pub trait PublicProcessor: Send {
    /// The validator type this processor accepts.
    type Validator: TxValidator;

    /// Process `txs` under `limits`, consulting `validator` for public-setup admission.
    fn process(
        &mut self,
        txs: BoxStream<'static, PendingTx>,
        limits: ProcessLimits,
        validator: &Self::Validator,
    ) -> impl Future<Output = Result<ProcessOutcome, CollaboratorError>> + Send;
}

/// Factory for [`PublicProcessor`]s, bound to a fork and this slot's global variables.
pub trait PublicProcessorFactory: Send + Sync {
    /// The fork type this factory's processors are bound to.
    type Fork;
    /// The processor type this factory creates.
    type Processor: PublicProcessor;

    /// Create a processor for `fork`/`globals`. `is_proposer` selects proposer vs. validator mode
    /// (§4.5.5): validator mode omits the proposer-only caps in [`ProcessLimits`] downstream.
    fn create(&self, fork: &Self::Fork, globals: GlobalVariables, is_proposer: bool) -> Self::Processor;
}
