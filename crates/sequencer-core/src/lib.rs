//! The sequencer core: a time-boxed block-production state machine for a rollup node.
//!
//! Once per network slot in which the local operator is eligible, [`Sequencer`] verifies all
//! upstream data sources are synchronized to the chain tip, assembles a candidate L2 block from
//! the transaction pool under strict time/size/gas budgets, solicits and orders a supermajority
//! of attestations from the epoch committee, and submits the block for inclusion on L1. Every
//! collaborator it drives — the publisher, the validator client, the peer network, world state,
//! the public processor, and the block builder — is a trait from `sequencer-collaborators`;
//! `Sequencer` is generic over all of them rather than owning a concrete node, the same way the
//! teacher's `SlotWorker` is generic over `BB`/`BI`/`BCI`/`CI`/`CSS`.

mod assembly;
mod eligibility;
mod error;

pub use error::SequencerError;

use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use sequencer_collaborators::{
    BlockBuilderFactory, BuildBlockFromProposal, BuildResult, L1ToL2MessageSource, L2BlockSource,
    PeerNetwork, PublicProcessor, PublicProcessorFactory, SequencerPublisher, TxValidatorFactory,
    ValidatorClient, WorldState,
};
use sequencer_metrics::MetricsSink;
use sequencer_state_machine::StateMachine;
use sequencer_timetable::Timetable;
use sequencer_types::{Configuration, GlobalVariables, L1GenesisTime, Phase, SecondsIntoSlot, Slot};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Everything the core needs from one concrete rollup node, bundled so the generic parameter
/// list reads as one cohesive "collaborators" unit rather than nine unrelated type parameters.
pub struct Sequencer<Pub, Val, Peer, WS, L2Src, MsgSrc, ProcFactory, ValFactory, BuilderFactory, Metrics>
where
    Pub: SequencerPublisher,
    Val: ValidatorClient,
    Peer: PeerNetwork,
    WS: WorldState,
    L2Src: L2BlockSource,
    MsgSrc: L1ToL2MessageSource,
    ProcFactory: PublicProcessorFactory<Fork = WS::Fork>,
    ValFactory: TxValidatorFactory<Fork = WS::Fork>,
    BuilderFactory: BlockBuilderFactory<Fork = WS::Fork>,
    Metrics: MetricsSink,
{
    config: RwLock<Arc<Configuration>>,
    timetable: RwLock<Arc<Timetable>>,
    state: StateMachine,
    is_flushing: AtomicBool,
    running: AtomicBool,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
    fork_cleanup: tokio::sync::Mutex<tokio::task::JoinSet<()>>,
    stop_signal: Notify,

    publisher: Pub,
    validator_client: Val,
    peer_network: Peer,
    world_state: WS,
    l2_block_source: L2Src,
    l1_to_l2_messages: MsgSrc,
    processor_factory: ProcFactory,
    validator_factory: ValFactory,
    builder_factory: BuilderFactory,
    metrics: Metrics,

    chain_id: u64,
    protocol_version: u32,
    l1_genesis_time: L1GenesisTime,
}

impl<Pub, Val, Peer, WS, L2Src, MsgSrc, ProcFactory, ValFactory, BuilderFactory, Metrics>
    Sequencer<Pub, Val, Peer, WS, L2Src, MsgSrc, ProcFactory, ValFactory, BuilderFactory, Metrics>
where
    Pub: SequencerPublisher + 'static,
    Val: ValidatorClient + 'static,
    Peer: PeerNetwork + 'static,
    WS: WorldState + 'static,
    L2Src: L2BlockSource + 'static,
    MsgSrc: L1ToL2MessageSource + 'static,
    ProcFactory: PublicProcessorFactory<Fork = WS::Fork> + 'static,
    ValFactory: TxValidatorFactory<Fork = WS::Fork> + 'static,
    ProcFactory::Processor: PublicProcessor<Validator = ValFactory::Validator>,
    BuilderFactory: BlockBuilderFactory<Fork = WS::Fork> + 'static,
    Metrics: MetricsSink + 'static,
{
    /// Construct a new sequencer in the `Stopped` phase.
    ///
    /// `chain_id`/`protocol_version` are immutable identifiers stamped into every slot's
    /// `GlobalVariables`; everything else that varies per slot comes from `config`. The publisher
    /// is primed with `config.governance_proposer_payload` immediately, and `slash_payload_getter`
    /// is registered with it once so slashing votes can pull a payload lazily, only when one is
    /// actually about to be cast — the evidence it returns comes from whatever the embedder wires
    /// in (computing it is out of scope here, same as gas pricing or signature aggregation).
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        config: Configuration,
        chain_id: u64,
        protocol_version: u32,
        publisher: Pub,
        validator_client: Val,
        peer_network: Peer,
        world_state: WS,
        l2_block_source: L2Src,
        l1_to_l2_messages: MsgSrc,
        processor_factory: ProcFactory,
        validator_factory: ValFactory,
        builder_factory: BuilderFactory,
        metrics: Metrics,
        slash_payload_getter: impl Fn() -> Vec<u8> + Send + Sync + 'static,
    ) -> Arc<Self> {
        let l1_genesis_time = L1GenesisTime::new(config.l1_genesis_time);
        let timetable = Timetable::from_config(&config);

        let sequencer = Arc::new(Self {
            config: RwLock::new(Arc::new(config)),
            timetable: RwLock::new(Arc::new(timetable)),
            state: StateMachine::new(),
            is_flushing: AtomicBool::new(false),
            running: AtomicBool::new(false),
            loop_handle: Mutex::new(None),
            fork_cleanup: tokio::sync::Mutex::new(tokio::task::JoinSet::new()),
            stop_signal: Notify::new(),
            publisher,
            validator_client,
            peer_network,
            world_state,
            l2_block_source,
            l1_to_l2_messages,
            processor_factory,
            validator_factory,
            builder_factory,
            metrics,
            chain_id,
            protocol_version,
            l1_genesis_time,
        });

        sequencer
            .validator_client
            .register_build_block_from_proposal(ValidatorCallback(Arc::clone(&sequencer)));
        sequencer
            .publisher
            .set_governance_payload(sequencer.config.read().governance_proposer_payload.clone());
        sequencer
            .publisher
            .register_slash_payload_getter(slash_payload_getter);

        sequencer
    }

    /// Current phase. Safe to call from any task.
    #[must_use]
    pub fn status(&self) -> Phase {
        self.state.current()
    }

    /// Swap in a new configuration, rebuilding the `Timetable` from it (§4.3) and re-priming the
    /// publisher's governance payload. Takes effect on the next main-loop tick.
    pub fn update_config(&self, config: Configuration) {
        let timetable = Timetable::from_config(&config);
        self.publisher
            .set_governance_payload(config.governance_proposer_payload.clone());
        *self.config.write() = Arc::new(config);
        *self.timetable.write() = Arc::new(timetable);
    }

    /// Force block production on the next iteration even if `min_txs_per_block` is not met.
    /// Self-clears on the iteration in which it takes effect (§3 invariant 5).
    pub fn flush(&self) {
        self.is_flushing.store(true, Ordering::SeqCst);
    }

    /// Arm the main loop, transitioning `Stopped` → `Idle`. Idempotent with [`Self::restart`].
    pub fn start(self: &Arc<Self>) -> Result<(), SequencerError> {
        self.set_state_untimed(Phase::Idle, true)?;
        self.running.store(true, Ordering::SeqCst);

        let sequencer = Arc::clone(self);
        let handle = tokio::spawn(async move { sequencer.run_loop().await });
        *self.loop_handle.lock() = Some(handle);
        Ok(())
    }

    /// Halt the loop, interrupt the publisher, stop the validator client, and set `Stopped`.
    pub async fn stop(self: &Arc<Self>) -> Result<(), SequencerError> {
        self.running.store(false, Ordering::SeqCst);
        self.stop_signal.notify_one();
        self.publisher.interrupt();
        self.validator_client.stop();

        let handle = self.loop_handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        // Drain any forks still waiting out their 5-second grace period rather than leaving them
        // detached (§9's deferred-cleanup design note).
        let mut join_set = self.fork_cleanup.lock().await;
        while join_set.join_next().await.is_some() {}
        drop(join_set);

        self.set_state_untimed(Phase::Stopped, true)?;
        Ok(())
    }

    /// `stop()` followed by `start()`.
    pub async fn restart(self: &Arc<Self>) -> Result<(), SequencerError> {
        self.stop().await?;
        self.publisher.restart();
        self.start()
    }

    fn set_state_untimed(&self, next: Phase, force: bool) -> Result<Phase, SequencerError> {
        let timetable = self.timetable.read().clone();
        self.state
            .set_state(next, Slot::ZERO, SecondsIntoSlot::default(), force, &timetable)
            .map_err(classify_set_state_error)
    }

    async fn run_loop(self: Arc<Self>) {
        loop {
            if !self.running.load(Ordering::SeqCst) {
                return;
            }

            let polling_interval = Duration::from_millis(self.config.read().polling_interval_ms);

            if let Err(error) = std::panic::AssertUnwindSafe(self.do_real_work())
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    tracing::error!("sequencer main loop panicked; resetting to idle");
                    Ok(())
                })
            {
                self.handle_iteration_error(error);
            }

            // A panic inside `do_real_work` must never leave the state machine stuck mid-slot.
            if self.state.current() != Phase::Stopped && self.state.current() != Phase::Idle {
                let _ = self.set_state_untimed(Phase::Idle, true);
            }

            // Race the poll interval against `stop()`'s wake-up so a long `polling_interval_ms`
            // never delays shutdown.
            tokio::select! {
                () = tokio::time::sleep(polling_interval) => {}
                () = self.stop_signal.notified() => {}
            }
        }
    }

    fn handle_iteration_error(&self, error: SequencerError) {
        if error.is_too_slow() {
            self.metrics.inc_too_slow();
            tracing::warn!(%error, "🐌 slot missed its timetable deadline");
        } else if error.is_not_ready() {
            self.metrics.inc_not_ready();
            tracing::debug!(%error, "⏭️ skipping slot, not ready");
        } else {
            tracing::error!(%error, "sequencer iteration failed");
        }
    }

    /// One main-loop iteration (§4.1/§4.2): synchronize, check proposer eligibility, and, if
    /// eligible, run the block assembly pipeline.
    #[tracing::instrument(skip_all)]
    async fn do_real_work(self: &Arc<Self>) -> Result<(), SequencerError> {
        let config = self.config.read().clone();
        let timetable = self.timetable.read().clone();
        let now = now_unix_secs();

        self.transition(Phase::Synchronizing, Slot::ZERO, now, &timetable)?;

        let chain_tip = eligibility::get_chain_tip(
            &self.peer_network,
            &self.world_state,
            &self.l2_block_source,
            &self.l1_to_l2_messages,
            config.initial_l2_block_num,
        )
        .await?;

        self.transition(Phase::ProposerCheck, Slot::ZERO, now, &timetable)?;

        let next_block_number = chain_tip.block_number + 1;
        let Some((slot, block_number)) =
            eligibility::slot_for_proposal(&self.publisher, chain_tip.archive_root, next_block_number)
                .await?
        else {
            self.transition(Phase::Idle, Slot::ZERO, now, &timetable)?;
            return Err(SequencerError::NotReady {
                reason: "publisher did not grant proposer eligibility for the next slot",
            });
        };

        let slot_start = self.l1_genesis_time.slot_start_time(slot, timetable.slot_duration());
        let seconds_into_slot = SecondsIntoSlot::since(now, slot_start);

        self.transition(Phase::InitializingProposal, slot, now, &timetable)?;

        let globals = GlobalVariables {
            chain_id: self.chain_id,
            protocol_version: self.protocol_version,
            block_number,
            slot_number: slot,
            timestamp: now,
            coinbase: config.coinbase,
            fee_recipient: config.fee_recipient,
        };

        let is_flushing = self.is_flushing.swap(false, Ordering::SeqCst);
        let pending_tx_count = self.peer_network.get_pending_tx_count().await?;
        if !config.meets_minimum(
            usize::try_from(pending_tx_count).unwrap_or(usize::MAX),
            is_flushing,
        ) {
            self.enqueue_votes(slot, now).await;
            self.send_votes().await?;
            self.transition(Phase::Idle, slot, now, &timetable)?;
            return Err(SequencerError::NotReady {
                reason: "pending transaction count below configured minimum",
            });
        }

        self.enqueue_votes(slot, now).await;

        let result = assembly::run(
            self,
            &config,
            &timetable,
            globals,
            chain_tip.archive_root,
            is_flushing,
            seconds_into_slot,
        )
        .await;

        self.send_votes().await?;
        self.transition(Phase::Idle, slot, now, &timetable)?;
        result
    }

    fn transition(
        &self,
        next: Phase,
        slot: Slot,
        now: u64,
        timetable: &Timetable,
    ) -> Result<Phase, SequencerError> {
        let slot_start = self.l1_genesis_time.slot_start_time(slot, timetable.slot_duration());
        let seconds_into_slot = SecondsIntoSlot::since(now, slot_start);
        self.state
            .set_state(next, slot, seconds_into_slot, false, timetable)
            .map_err(classify_set_state_error)
    }

    async fn enqueue_votes(&self, slot: Slot, now: u64) {
        use sequencer_collaborators::VoteType;

        // TODO: route failures here to a dead-letter path instead of swallowing them (§9 open
        // question b).
        if let Err(error) = self
            .publisher
            .enqueue_cast_vote(slot, now, VoteType::Governance)
            .await
        {
            tracing::warn!(%error, "failed to enqueue governance vote");
        }
        if let Err(error) = self
            .publisher
            .enqueue_cast_vote(slot, now, VoteType::Slashing)
            .await
        {
            tracing::warn!(%error, "failed to enqueue slashing vote");
        }
    }

    async fn send_votes(&self) -> Result<(), SequencerError> {
        let result = self.publisher.send_requests().await?;
        if result.proposed_successfully() {
            self.metrics.inc_filled_slot();
        }
        Ok(())
    }
}

fn classify_set_state_error(error: sequencer_state_machine::SetStateError) -> SequencerError {
    match error {
        sequencer_state_machine::SetStateError::TooSlow(too_slow) => {
            SequencerError::TooSlow(too_slow)
        }
        other => SequencerError::InvalidTransition(other),
    }
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Adapter registered with the validator client so that re-executing a foreign proposal calls
/// back into this sequencer's own block-building logic (§9's `BlockProducer`-style callback).
struct ValidatorCallback<S>(Arc<S>);

impl<Pub, Val, Peer, WS, L2Src, MsgSrc, ProcFactory, ValFactory, BuilderFactory, Metrics>
    BuildBlockFromProposal
    for ValidatorCallback<
        Sequencer<Pub, Val, Peer, WS, L2Src, MsgSrc, ProcFactory, ValFactory, BuilderFactory, Metrics>,
    >
where
    Pub: SequencerPublisher + 'static,
    Val: ValidatorClient + 'static,
    Peer: PeerNetwork + 'static,
    WS: WorldState + 'static,
    L2Src: L2BlockSource + 'static,
    MsgSrc: L1ToL2MessageSource + 'static,
    ProcFactory: PublicProcessorFactory<Fork = WS::Fork> + 'static,
    ValFactory: TxValidatorFactory<Fork = WS::Fork> + 'static,
    ProcFactory::Processor: PublicProcessor<Validator = ValFactory::Validator>,
    BuilderFactory: BlockBuilderFactory<Fork = WS::Fork> + 'static,
    Metrics: MetricsSink + 'static,
{
    async fn build_block_from_proposal(
        &self,
        block_number: u64,
        globals: GlobalVariables,
        proposal: &sequencer_collaborators::BlockProposal,
    ) -> Result<BuildResult, sequencer_collaborators::CollaboratorError> {
        let config = self.0.config.read().clone();
        let header = assembly::build_as_validator(&self.0, &config, block_number, globals, proposal)
            .await
            .map_err(|error| sequencer_collaborators::CollaboratorError::new(anyhow::anyhow!(error)))?;
        Ok(BuildResult { header })
    }
}
