//! Block assembly pipeline (component C5): §4.5.1 through §4.5.9.

mod attestation;
mod fork;

use crate::{Sequencer, SequencerError};
use sequencer_collaborators::{
    BlockBuilderFactory, BlockProposal, EnqueueProposeOptions, FinalizedBlock, L1ToL2MessageSource,
    L2BlockSource, PeerNetwork, ProcessLimits, ProcessOutcome, PublicProcessor, PublicProcessorFactory,
    SequencerPublisher, TxValidatorFactory, ValidatorClient, WorldState,
};
use sequencer_metrics::MetricsSink;
use sequencer_timetable::Timetable;
use sequencer_types::{
    ArchiveRoot, Configuration, GlobalVariables, Phase, ProposedBlockHeader, SecondsIntoSlot, Slot,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Run the full proposer-mode pipeline for one slot. Called only once the eligibility gate and
/// the minimum-pending-transaction gate have both passed.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn run<Pub, Val, Peer, WS, L2Src, MsgSrc, ProcFactory, ValFactory, BuilderFactory, Metrics>(
    sequencer: &Arc<Sequencer<Pub, Val, Peer, WS, L2Src, MsgSrc, ProcFactory, ValFactory, BuilderFactory, Metrics>>,
    config: &Configuration,
    timetable: &Timetable,
    globals: GlobalVariables,
    last_archive_root: ArchiveRoot,
    is_flushing: bool,
    seconds_into_slot: SecondsIntoSlot,
) -> Result<(), SequencerError>
where
    Pub: SequencerPublisher,
    Val: ValidatorClient,
    Peer: PeerNetwork,
    WS: WorldState,
    L2Src: L2BlockSource,
    MsgSrc: L1ToL2MessageSource,
    ProcFactory: PublicProcessorFactory<Fork = WS::Fork>,
    ValFactory: TxValidatorFactory<Fork = WS::Fork>,
    ProcFactory::Processor: PublicProcessor<Validator = ValFactory::Validator>,
    BuilderFactory: BlockBuilderFactory<Fork = WS::Fork>,
    Metrics: MetricsSink,
{
    let slot = globals.slot_number;

    // 4.5.1 preparation
    let header = ProposedBlockHeader::new(globals, last_archive_root);

    // 4.5.2 pre-flight validation
    sequencer
        .publisher
        .validate_block_for_submission(&header)
        .await?;

    sequencer.transition(Phase::CreatingBlock, slot, crate::now_unix_secs(), timetable)?;

    // 4.5.3 fork world state; both forks are released 5s after this function returns, success or
    // failure, via the deferred cleanup join set.
    let (processor_fork, orchestrator_fork) =
        fork::open_pair(&sequencer.world_state, globals.block_number).await?;

    let slot_start_secs = slot_start(sequencer, slot, timetable);

    let deadline = if timetable.enforce_timetable() {
        let target = timetable.block_proposal_exec_end(seconds_into_slot);
        Some(deadline_instant(target, seconds_into_slot))
    } else {
        None
    };

    let pipeline_result = process_and_build(
        sequencer,
        config,
        timetable,
        slot_start_secs,
        &processor_fork,
        &orchestrator_fork,
        &header,
        globals,
        true,
        is_flushing,
        deadline,
    )
    .await;

    fork::schedule_release(&sequencer.fork_cleanup, processor_fork).await;
    fork::schedule_release(&sequencer.fork_cleanup, orchestrator_fork).await;

    let (finalized, outcome) = match pipeline_result {
        Ok(result) => result,
        Err(error) => {
            if matches!(error, SequencerError::BlockInvalid { .. }) {
                sequencer.metrics.inc_failed_block();
            }
            return Err(error);
        }
    };

    // 4.5.7 post-assembly validation: L1 state may have advanced while we processed.
    if let Err(error) = sequencer
        .publisher
        .validate_block_for_submission(&finalized.header)
        .await
    {
        sequencer.metrics.inc_failed_block();
        return Err(error.into());
    }

    sequencer.transition(
        Phase::CollectingAttestations,
        slot,
        crate::now_unix_secs(),
        timetable,
    )?;

    // 4.5.8 attestation collection
    let committee = sequencer.publisher.get_current_epoch_committee().await?;
    let tx_hashes: Vec<_> = outcome.processed.iter().map(|tx| tx.hash).collect();
    let proposal = BlockProposal {
        block_number: globals.block_number,
        header: finalized.header.clone(),
        tx_hashes: tx_hashes.clone(),
        tx_bodies: None,
    };

    let attestation_deadline = if timetable.enforce_timetable() {
        let now = SecondsIntoSlot::since(crate::now_unix_secs(), slot_start_secs);
        let target = timetable.max_allowed_time(Phase::PublishingBlock);
        Duration::from_secs(target.saturating_sub(now.as_u64()))
    } else {
        timetable.slot_duration().as_duration()
    };

    let attestations =
        attestation::collect(&sequencer.validator_client, &committee, proposal, attestation_deadline)
            .await?;

    // 4.5.9 enqueue publication
    sequencer.transition(Phase::PublishingBlock, slot, crate::now_unix_secs(), timetable)?;

    let options = EnqueueProposeOptions {
        publish_txs_with_proposals: config.publish_txs_with_proposals,
        tx_timeout_at: slot_start_secs + timetable.slot_duration().as_secs(),
    };

    let accepted = sequencer
        .publisher
        .enqueue_propose_l2_block(finalized.header, attestations, tx_hashes, options)
        .await?;

    if !accepted {
        sequencer.metrics.inc_failed_block();
        return Err(SequencerError::BlockInvalid {
            reason: "publisher rejected the enqueued block",
        });
    }

    sequencer.metrics.observe_tx_count(outcome.processed.len() as u64);
    tracing::info!(%slot, block_number = globals.block_number, "📦 enqueued block for publication");

    Ok(())
}

/// Re-execute a foreign proposal as a validator (§9's callback, §4.5.4's re-sync guard, §4.5.5's
/// validator-mode processing). Unlike [`run`], this never evicts pool transactions and never
/// enforces `min_txs_per_block`.
pub(crate) async fn build_as_validator<Pub, Val, Peer, WS, L2Src, MsgSrc, ProcFactory, ValFactory, BuilderFactory, Metrics>(
    sequencer: &Arc<Sequencer<Pub, Val, Peer, WS, L2Src, MsgSrc, ProcFactory, ValFactory, BuilderFactory, Metrics>>,
    config: &Configuration,
    block_number: u64,
    globals: GlobalVariables,
    proposal: &BlockProposal,
) -> Result<ProposedBlockHeader, SequencerError>
where
    Pub: SequencerPublisher,
    Val: ValidatorClient,
    Peer: PeerNetwork,
    WS: WorldState,
    L2Src: L2BlockSource,
    MsgSrc: L1ToL2MessageSource,
    ProcFactory: PublicProcessorFactory<Fork = WS::Fork>,
    ValFactory: TxValidatorFactory<Fork = WS::Fork>,
    ProcFactory::Processor: PublicProcessor<Validator = ValFactory::Validator>,
    BuilderFactory: BlockBuilderFactory<Fork = WS::Fork>,
    Metrics: MetricsSink,
{
    let timetable = sequencer.timetable.read().clone();
    let slot_start = slot_start(sequencer, globals.slot_number, &timetable);
    let reexec_deadline_secs = timetable.validator_reexec_end(SecondsIntoSlot::since(
        crate::now_unix_secs(),
        slot_start,
    ));
    let reexec_deadline = Instant::now()
        + Duration::from_secs(
            reexec_deadline_secs.saturating_sub(crate::now_unix_secs().saturating_sub(slot_start)),
        );

    // 4.5.4 re-sync guard: spin-wait until world state has caught up to the parent block.
    let parent_block_number = block_number.saturating_sub(1);
    loop {
        let status = sequencer.world_state.status().await?;
        if status.latest_block_number >= parent_block_number {
            break;
        }
        if Instant::now() >= reexec_deadline {
            return Err(SequencerError::BlockInvalid {
                reason: "world state did not catch up before the validator re-exec deadline",
            });
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let (processor_fork, orchestrator_fork) =
        fork::open_pair(&sequencer.world_state, block_number).await?;

    let header = ProposedBlockHeader::new(globals, proposal.header.last_archive_root);

    let pipeline_result = process_and_build(
        sequencer,
        config,
        &timetable,
        slot_start,
        &processor_fork,
        &orchestrator_fork,
        &header,
        globals,
        false,
        false,
        Some(reexec_deadline),
    )
    .await;

    fork::schedule_release(&sequencer.fork_cleanup, processor_fork).await;
    fork::schedule_release(&sequencer.fork_cleanup, orchestrator_fork).await;

    Ok(pipeline_result?.0.header)
}

/// Shared core of §4.5.5 (public processing) and §4.5.6 (block finalization), parameterized by
/// proposer vs. validator mode.
#[allow(clippy::too_many_arguments)]
async fn process_and_build<Pub, Val, Peer, WS, L2Src, MsgSrc, ProcFactory, ValFactory, BuilderFactory, Metrics>(
    sequencer: &Sequencer<Pub, Val, Peer, WS, L2Src, MsgSrc, ProcFactory, ValFactory, BuilderFactory, Metrics>,
    config: &Configuration,
    timetable: &Timetable,
    slot_start_secs: u64,
    processor_fork: &WS::Fork,
    orchestrator_fork: &WS::Fork,
    header: &ProposedBlockHeader,
    globals: GlobalVariables,
    is_proposer: bool,
    is_flushing: bool,
    deadline: Option<Instant>,
) -> Result<(FinalizedBlock, ProcessOutcome), SequencerError>
where
    Pub: SequencerPublisher,
    Val: ValidatorClient,
    Peer: PeerNetwork,
    WS: WorldState,
    L2Src: L2BlockSource,
    MsgSrc: L1ToL2MessageSource,
    ProcFactory: PublicProcessorFactory<Fork = WS::Fork>,
    ValFactory: TxValidatorFactory<Fork = WS::Fork>,
    ProcFactory::Processor: PublicProcessor<Validator = ValFactory::Validator>,
    BuilderFactory: BlockBuilderFactory<Fork = WS::Fork>,
    Metrics: MetricsSink,
{
    let validator = sequencer.validator_factory.create(
        processor_fork,
        globals,
        &config.tx_public_setup_allow_list,
    );
    let mut processor = sequencer
        .processor_factory
        .create(processor_fork, globals, is_proposer);

    let limits = ProcessLimits {
        deadline,
        max_transactions: is_proposer.then_some(config.max_txs_per_block),
        max_block_size: is_proposer.then_some(config.max_block_size_bytes),
        max_block_gas: is_proposer.then_some(config.max_l2_block_gas),
    };

    let txs = sequencer.peer_network.iterate_pending_txs();
    let process_fut = processor.process(txs, limits, &validator);
    let outcome = match deadline {
        Some(instant) => timeout(instant.saturating_duration_since(Instant::now()), process_fut)
            .await
            .map_err(|_| sequencer_timetable::TooSlow {
                phase: Phase::CreatingBlock,
                seconds_into_slot: SecondsIntoSlot::since(crate::now_unix_secs(), slot_start_secs),
                max_allowed: timetable.max_allowed_time(Phase::CreatingBlock),
            })??,
        None => process_fut.await?,
    };

    if is_proposer && !outcome.failed.is_empty() {
        let hashes: Vec<_> = outcome.failed.iter().map(|tx| tx.hash).collect();
        sequencer.peer_network.delete_txs(&hashes).await?;
    }

    if is_proposer && !config.meets_minimum(outcome.processed.len(), is_flushing) {
        return Err(SequencerError::BlockInvalid {
            reason: "processed transaction count below configured minimum",
        });
    }

    let mut builder = sequencer.builder_factory.create(orchestrator_fork);
    let l1_to_l2_messages = sequencer
        .l1_to_l2_messages
        .get_l1_to_l2_messages(globals.block_number)
        .await?;

    builder
        .start_new_block(globals, l1_to_l2_messages, header)
        .await?;
    builder.add_txs(outcome.processed.clone()).await?;
    let finalized = builder.set_block_completed().await?;

    Ok((finalized, outcome))
}

fn deadline_instant(target_seconds_into_slot: u64, current: SecondsIntoSlot) -> Instant {
    let remaining = target_seconds_into_slot.saturating_sub(current.as_u64());
    Instant::now() + Duration::from_secs(remaining)
}

fn slot_start<Pub, Val, Peer, WS, L2Src, MsgSrc, ProcFactory, ValFactory, BuilderFactory, Metrics>(
    sequencer: &Sequencer<Pub, Val, Peer, WS, L2Src, MsgSrc, ProcFactory, ValFactory, BuilderFactory, Metrics>,
    slot: Slot,
    timetable: &Timetable,
) -> u64
where
    Pub: SequencerPublisher,
    Val: ValidatorClient,
    Peer: PeerNetwork,
    WS: WorldState,
    L2Src: L2BlockSource,
    MsgSrc: L1ToL2MessageSource,
    ProcFactory: PublicProcessorFactory<Fork = WS::Fork>,
    ValFactory: TxValidatorFactory<Fork = WS::Fork>,
    ProcFactory::Processor: PublicProcessor<Validator = ValFactory::Validator>,
    BuilderFactory: BlockBuilderFactory<Fork = WS::Fork>,
    Metrics: MetricsSink,
{
    sequencer
        .l1_genesis_time
        .slot_start_time(slot, timetable.slot_duration())
}
