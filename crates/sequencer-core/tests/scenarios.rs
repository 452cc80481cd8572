//! End-to-end scenarios for [`sequencer_core::Sequencer`], driven entirely through hand-written
//! fake collaborators so a slot's outcome can be steered and observed without any real L1, peer
//! network, or world-state backend.

use futures::stream::BoxStream;
use futures::StreamExt;
use parking_lot::Mutex;
use sequencer_collaborators::{
    Attestation, BlockBuilderFactory, BlockProposal, BuildBlockFromProposal, CollaboratorError,
    EnqueueProposeOptions, FinalizedBlock, L1ToL2Message, L1ToL2MessageSource, L2Block,
    L2BlockBuilder, L2BlockSource, L2Tip, PeerNetwork, PeerNetworkStatus, PendingTx, ProcessLimits,
    ProcessOutcome, ProcessedTx, PublicProcessor, PublicProcessorFactory, SendRequestsResult,
    SequencerPublisher, TxValidator, TxValidatorFactory, ValidatorClient, VoteType, WorldState,
    WorldStateSyncSummary,
};
use sequencer_collaborators::world_state::Fork;
use sequencer_metrics::AtomicMetrics;
use sequencer_types::{
    ArchiveRoot, Configuration, ContentCommitment, GlobalVariables, L1Address, L2Address, Mana,
    Phase, ProposedBlockHeader, Slot, TxHash,
};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn address(byte: u8) -> L1Address {
    L1Address::new([byte; 20])
}

fn archive_root(byte: u8) -> ArchiveRoot {
    ArchiveRoot::new([byte; 32])
}

fn tx_hash(byte: u8) -> TxHash {
    TxHash::new([byte; 32])
}

fn test_config() -> Configuration {
    Configuration {
        // Long enough that exactly one main-loop iteration runs within a scenario's
        // `run_one_iteration` window; the fakes below resolve instantly so one iteration never
        // takes anywhere near this long.
        polling_interval_ms: 10_000,
        min_txs_per_block: 2,
        max_txs_per_block: 32,
        max_l2_block_gas: 1_000_000,
        max_block_size_bytes: 1_000_000,
        coinbase: L1Address::default(),
        fee_recipient: L2Address::default(),
        tx_public_setup_allow_list: Vec::new(),
        enforce_timetable: false,
        publish_txs_with_proposals: false,
        governance_proposer_payload: Vec::new(),
        max_l1_tx_inclusion_time_into_slot: 4,
        ethereum_slot_duration_secs: 12,
        aztec_slot_duration_secs: 36,
        l1_genesis_time: 0,
        initial_l2_block_num: 1,
    }
}

// ---- world state ----------------------------------------------------------------------------

#[derive(Clone)]
struct FakeFork {
    archive_root: ArchiveRoot,
}

impl Fork for FakeFork {
    fn get_initial_header_archive_root(&self) -> ArchiveRoot {
        self.archive_root
    }

    async fn close(self) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

#[derive(Clone, Default)]
struct WorldStateData {
    latest_block_number: u64,
    latest_block_hash: [u8; 32],
    committed_archive_root: ArchiveRoot,
}

#[derive(Clone)]
struct FakeWorldState {
    data: Arc<Mutex<WorldStateData>>,
}

impl FakeWorldState {
    fn new(data: Arc<Mutex<WorldStateData>>) -> Self {
        Self { data }
    }
}

impl WorldState for FakeWorldState {
    type Fork = FakeFork;

    async fn status(&self) -> Result<WorldStateSyncSummary, CollaboratorError> {
        let data = self.data.lock();
        Ok(WorldStateSyncSummary {
            latest_block_number: data.latest_block_number,
            latest_block_hash: data.latest_block_hash,
        })
    }

    async fn sync_immediate(&self, block_number: u64, _wait: bool) -> Result<u64, CollaboratorError> {
        Ok(block_number)
    }

    async fn fork(&self, _block_number: u64) -> Result<Self::Fork, CollaboratorError> {
        Ok(FakeFork {
            archive_root: self.data.lock().committed_archive_root,
        })
    }

    async fn get_committed_archive_root(&self) -> Result<ArchiveRoot, CollaboratorError> {
        Ok(self.data.lock().committed_archive_root)
    }
}

// ---- peer network -----------------------------------------------------------------------------

#[derive(Clone, Default)]
struct PeerNetworkData {
    pending: Vec<PendingTx>,
    synced_to_l2_block_number: u64,
    synced_to_l2_block_hash: [u8; 32],
    deleted: Vec<TxHash>,
}

#[derive(Clone)]
struct FakePeerNetwork {
    data: Arc<Mutex<PeerNetworkData>>,
}

impl PeerNetwork for FakePeerNetwork {
    async fn get_pending_tx_count(&self) -> Result<u64, CollaboratorError> {
        Ok(self.data.lock().pending.len() as u64)
    }

    fn iterate_pending_txs(&self) -> BoxStream<'static, PendingTx> {
        let pending = self.data.lock().pending.clone();
        Box::pin(futures::stream::iter(pending))
    }

    async fn delete_txs(&self, hashes: &[TxHash]) -> Result<(), CollaboratorError> {
        self.data.lock().deleted.extend_from_slice(hashes);
        Ok(())
    }

    async fn get_status(&self) -> Result<PeerNetworkStatus, CollaboratorError> {
        let data = self.data.lock();
        Ok(PeerNetworkStatus {
            synced_to_l2_block_number: data.synced_to_l2_block_number,
            synced_to_l2_block_hash: data.synced_to_l2_block_hash,
        })
    }
}

// ---- L2 block source / L1->L2 message source --------------------------------------------------

#[derive(Clone, Default)]
struct L2SourceData {
    tip: L2Tip,
    blocks: Vec<L2Block>,
}

#[derive(Clone)]
struct FakeL2BlockSource {
    data: Arc<Mutex<L2SourceData>>,
}

impl L2BlockSource for FakeL2BlockSource {
    async fn get_block(&self, number: u64) -> Result<Option<L2Block>, CollaboratorError> {
        Ok(self
            .data
            .lock()
            .blocks
            .iter()
            .find(|block| block.number == number)
            .cloned())
    }

    async fn get_l2_tips(&self) -> Result<L2Tip, CollaboratorError> {
        Ok(self.data.lock().tip)
    }
}

#[derive(Clone)]
struct FakeMessageSource {
    data: Arc<Mutex<L2SourceData>>,
}

impl L1ToL2MessageSource for FakeMessageSource {
    async fn get_l1_to_l2_messages(&self, _block_number: u64) -> Result<Vec<L1ToL2Message>, CollaboratorError> {
        Ok(Vec::new())
    }

    async fn get_l2_tips(&self) -> Result<L2Tip, CollaboratorError> {
        Ok(self.data.lock().tip)
    }
}

// ---- publisher ---------------------------------------------------------------------------------

#[derive(Default)]
struct PublisherData {
    can_propose: Option<(Slot, u64)>,
    validate_ok: bool,
    /// When set, the `n`-th call (1-indexed) onward to `validate_block_for_submission` fails
    /// regardless of `validate_ok`, so a test can fail specifically the post-assembly check
    /// (§4.5.7) without racing real wall-clock timing against the pipeline.
    fail_validate_from_call: Option<usize>,
    /// Real time to sleep inside the first (pre-flight) `validate_block_for_submission` call,
    /// so a test can let a genuine deadline elapse between the `InitializingProposal` and
    /// `CreatingBlock` transitions without racing a static "late" configuration against both.
    pre_creating_block_delay: Option<Duration>,
    enqueue_accept: bool,
    committee: Vec<L1Address>,
    votes_enqueued: Vec<VoteType>,
    send_requests_result: SendRequestsResult,
    interrupted: bool,
    restarted: bool,
    enqueued_blocks: Vec<ProposedBlockHeader>,
    validate_calls: usize,
    governance_payload: Vec<u8>,
    slash_payload_getter_registered: bool,
}

#[derive(Clone)]
struct FakePublisher {
    data: Arc<Mutex<PublisherData>>,
}

impl SequencerPublisher for FakePublisher {
    async fn can_propose_at_next_eth_block(
        &self,
        _tip_archive: ArchiveRoot,
    ) -> Result<Option<(Slot, u64)>, CollaboratorError> {
        Ok(self.data.lock().can_propose)
    }

    async fn validate_block_for_submission(
        &self,
        _header: &ProposedBlockHeader,
    ) -> Result<(), CollaboratorError> {
        let (ok, delay) = {
            let mut data = self.data.lock();
            data.validate_calls += 1;
            let call_number = data.validate_calls;
            let ok = data.validate_ok
                && data
                    .fail_validate_from_call
                    .is_none_or(|from| call_number < from);
            let delay = (call_number == 1).then_some(data.pre_creating_block_delay).flatten();
            (ok, delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if ok {
            Ok(())
        } else {
            Err(CollaboratorError::new(anyhow::anyhow!(
                "publisher refused to validate block for submission"
            )))
        }
    }

    async fn enqueue_propose_l2_block(
        &self,
        header: ProposedBlockHeader,
        _attestations: Vec<Attestation>,
        _tx_hashes: Vec<TxHash>,
        _options: EnqueueProposeOptions,
    ) -> Result<bool, CollaboratorError> {
        let mut data = self.data.lock();
        let accept = data.enqueue_accept;
        if accept {
            data.enqueued_blocks.push(header);
        }
        Ok(accept)
    }

    async fn enqueue_cast_vote(
        &self,
        _slot: Slot,
        _timestamp: u64,
        vote_type: VoteType,
    ) -> Result<(), CollaboratorError> {
        self.data.lock().votes_enqueued.push(vote_type);
        Ok(())
    }

    async fn send_requests(&self) -> Result<SendRequestsResult, CollaboratorError> {
        Ok(self.data.lock().send_requests_result.clone())
    }

    async fn get_current_epoch_committee(&self) -> Result<Vec<L1Address>, CollaboratorError> {
        Ok(self.data.lock().committee.clone())
    }

    fn get_sender_address(&self) -> L1Address {
        address(1)
    }

    fn get_forwarder_address(&self) -> Option<L1Address> {
        None
    }

    fn set_governance_payload(&self, payload: Vec<u8>) {
        self.data.lock().governance_payload = payload;
    }

    fn register_slash_payload_getter(&self, getter: impl Fn() -> Vec<u8> + Send + Sync + 'static) {
        let _ = getter();
        self.data.lock().slash_payload_getter_registered = true;
    }

    fn interrupt(&self) {
        self.data.lock().interrupted = true;
    }

    fn restart(&self) {
        self.data.lock().restarted = true;
    }
}

// ---- validator client ---------------------------------------------------------------------------

#[derive(Default)]
struct ValidatorClientData {
    attestations: Vec<Attestation>,
    broadcasted: Vec<BlockProposal>,
    stopped: bool,
}

#[derive(Clone)]
struct FakeValidatorClient {
    data: Arc<Mutex<ValidatorClientData>>,
}

impl ValidatorClient for FakeValidatorClient {
    fn get_validator_address(&self) -> L1Address {
        address(2)
    }

    async fn broadcast_block_proposal(&self, proposal: BlockProposal) -> Result<(), CollaboratorError> {
        self.data.lock().broadcasted.push(proposal);
        Ok(())
    }

    async fn collect_attestations(
        &self,
        _proposal: &BlockProposal,
        _required: usize,
        _deadline: Duration,
    ) -> Result<Vec<Attestation>, CollaboratorError> {
        Ok(self.data.lock().attestations.clone())
    }

    fn register_build_block_from_proposal<B>(&self, _callback: B)
    where
        B: BuildBlockFromProposal + 'static,
    {
        // None of the scenarios below exercise the validator-reexecution callback path.
    }

    fn stop(&self) {
        self.data.lock().stopped = true;
    }
}

// ---- public processor / tx validator --------------------------------------------------------------

struct FakeTxValidator;

impl TxValidator for FakeTxValidator {
    fn allows_public_setup(&self, _tx: &PendingTx) -> bool {
        true
    }
}

#[derive(Clone)]
struct FakeValidatorFactory;

impl TxValidatorFactory for FakeValidatorFactory {
    type Fork = FakeFork;
    type Validator = FakeTxValidator;

    fn create(
        &self,
        _fork: &Self::Fork,
        _globals: GlobalVariables,
        _allow_list: &[String],
    ) -> Self::Validator {
        FakeTxValidator
    }
}

#[derive(Default)]
struct ProcessorData {
    outcome: ProcessOutcome,
    delay: Option<Duration>,
}

struct FakeProcessor {
    data: Arc<Mutex<ProcessorData>>,
}

impl PublicProcessor for FakeProcessor {
    type Validator = FakeTxValidator;

    async fn process(
        &mut self,
        mut txs: BoxStream<'static, PendingTx>,
        _limits: ProcessLimits,
        _validator: &Self::Validator,
    ) -> Result<ProcessOutcome, CollaboratorError> {
        while txs.next().await.is_some() {}

        let delay = self.data.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(self.data.lock().outcome.clone())
    }
}

#[derive(Clone)]
struct FakeProcessorFactory {
    data: Arc<Mutex<ProcessorData>>,
}

impl PublicProcessorFactory for FakeProcessorFactory {
    type Fork = FakeFork;
    type Processor = FakeProcessor;

    fn create(&self, _fork: &Self::Fork, _globals: GlobalVariables, _is_proposer: bool) -> Self::Processor {
        FakeProcessor {
            data: Arc::clone(&self.data),
        }
    }
}

// ---- block builder -------------------------------------------------------------------------------

#[derive(Default)]
struct BuilderData {
    archive_root: ArchiveRoot,
    total_mana_used: Mana,
}

#[derive(Clone)]
struct FakeBuilderFactory {
    data: Arc<Mutex<BuilderData>>,
}

impl BlockBuilderFactory for FakeBuilderFactory {
    type Fork = FakeFork;
    type Builder = FakeBuilder;

    fn create(&self, _fork: &Self::Fork) -> Self::Builder {
        FakeBuilder {
            data: Arc::clone(&self.data),
            header: None,
        }
    }
}

struct FakeBuilder {
    data: Arc<Mutex<BuilderData>>,
    header: Option<ProposedBlockHeader>,
}

impl L2BlockBuilder for FakeBuilder {
    async fn start_new_block(
        &mut self,
        _globals: GlobalVariables,
        _l1_to_l2_messages: Vec<L1ToL2Message>,
        prev_header: &ProposedBlockHeader,
    ) -> Result<(), CollaboratorError> {
        self.header = Some(prev_header.clone());
        Ok(())
    }

    async fn add_txs(&mut self, _processed: Vec<ProcessedTx>) -> Result<(), CollaboratorError> {
        Ok(())
    }

    async fn set_block_completed(self) -> Result<FinalizedBlock, CollaboratorError> {
        let data = self.data.lock();
        let mut header = self.header.expect("start_new_block always runs first");
        header.content_commitment = Some(ContentCommitment {
            archive_root: data.archive_root,
        });
        header.total_mana_used = data.total_mana_used;
        Ok(FinalizedBlock {
            header,
            archive_root: data.archive_root,
            total_mana_used: data.total_mana_used,
        })
    }
}

// ---- harness --------------------------------------------------------------------------------------

type TestSequencer = sequencer_core::Sequencer<
    FakePublisher,
    FakeValidatorClient,
    FakePeerNetwork,
    FakeWorldState,
    FakeL2BlockSource,
    FakeMessageSource,
    FakeProcessorFactory,
    FakeValidatorFactory,
    FakeBuilderFactory,
    AtomicMetrics,
>;

struct Harness {
    sequencer: Arc<TestSequencer>,
    world_state: Arc<Mutex<WorldStateData>>,
    peer_network: Arc<Mutex<PeerNetworkData>>,
    l2_source: Arc<Mutex<L2SourceData>>,
    publisher: Arc<Mutex<PublisherData>>,
    validator_client: Arc<Mutex<ValidatorClientData>>,
    processor: Arc<Mutex<ProcessorData>>,
    builder: Arc<Mutex<BuilderData>>,
    metrics: Arc<AtomicMetrics>,
}

fn build_harness(config: Configuration) -> Harness {
    let world_state_data = Arc::new(Mutex::new(WorldStateData::default()));
    let peer_network_data = Arc::new(Mutex::new(PeerNetworkData::default()));
    let l2_source_data = Arc::new(Mutex::new(L2SourceData::default()));
    let publisher_data = Arc::new(Mutex::new(PublisherData::default()));
    let validator_client_data = Arc::new(Mutex::new(ValidatorClientData::default()));
    let processor_data = Arc::new(Mutex::new(ProcessorData::default()));
    let builder_data = Arc::new(Mutex::new(BuilderData::default()));
    let metrics = Arc::new(AtomicMetrics::new());

    struct MetricsAdapter(Arc<AtomicMetrics>);
    impl sequencer_metrics::MetricsSink for MetricsAdapter {
        fn inc_filled_slot(&self) {
            self.0.inc_filled_slot();
        }
        fn inc_failed_block(&self) {
            self.0.inc_failed_block();
        }
        fn inc_too_slow(&self) {
            self.0.inc_too_slow();
        }
        fn inc_not_ready(&self) {
            self.0.inc_not_ready();
        }
        fn observe_tx_count(&self, count: u64) {
            self.0.observe_tx_count(count);
        }
    }

    let sequencer = sequencer_core::Sequencer::new(
        config,
        1337,
        1,
        FakePublisher {
            data: Arc::clone(&publisher_data),
        },
        FakeValidatorClient {
            data: Arc::clone(&validator_client_data),
        },
        FakePeerNetwork {
            data: Arc::clone(&peer_network_data),
        },
        FakeWorldState::new(Arc::clone(&world_state_data)),
        FakeL2BlockSource {
            data: Arc::clone(&l2_source_data),
        },
        FakeMessageSource {
            data: Arc::clone(&l2_source_data),
        },
        FakeProcessorFactory {
            data: Arc::clone(&processor_data),
        },
        FakeValidatorFactory,
        FakeBuilderFactory {
            data: Arc::clone(&builder_data),
        },
        MetricsAdapter(Arc::clone(&metrics)),
        || Vec::new(),
    );

    Harness {
        sequencer,
        world_state: world_state_data,
        peer_network: peer_network_data,
        l2_source: l2_source_data,
        publisher: publisher_data,
        validator_client: validator_client_data,
        processor: processor_data,
        builder: builder_data,
        metrics,
    }
}

/// Put every chain-tip source in agreement at `(number, hash)`, with `committed_archive_root`
/// ignored past genesis.
fn set_agreeing_tip(harness: &Harness, number: u64, hash: [u8; 32]) {
    harness.world_state.lock().latest_block_number = number;
    harness.world_state.lock().latest_block_hash = hash;
    harness.peer_network.lock().synced_to_l2_block_number = number;
    harness.peer_network.lock().synced_to_l2_block_hash = hash;
    let mut l2 = harness.l2_source.lock();
    l2.tip = L2Tip {
        number,
        hash: Some(hash),
    };
    l2.blocks.push(L2Block {
        number,
        archive_root: archive_root(number as u8),
    });
}

fn fill_pending_txs(harness: &Harness, count: usize) {
    harness.peer_network.lock().pending = (0..count)
        .map(|i| PendingTx {
            hash: tx_hash(i as u8),
            payload: Vec::new(),
        })
        .collect();
}

fn set_processed(harness: &Harness, count: usize) {
    harness.processor.lock().outcome = ProcessOutcome {
        processed: (0..count)
            .map(|i| ProcessedTx {
                hash: tx_hash(i as u8),
                mana_used: 10,
            })
            .collect(),
        failed: Vec::new(),
        mana_used: 10 * count as u64,
    };
}

async fn run_one_iteration(harness: &Harness) {
    harness.sequencer.start().expect("start");
    tokio::time::sleep(Duration::from_millis(50)).await;
    harness.sequencer.stop().await.expect("stop");
}

async fn run_one_iteration_for(harness: &Harness, wait: Duration) {
    harness.sequencer.start().expect("start");
    tokio::time::sleep(wait).await;
    harness.sequencer.stop().await.expect("stop");
}

// ---- scenarios --------------------------------------------------------------------------------

#[tokio::test]
async fn happy_path_fills_the_slot_and_publishes() {
    let harness = build_harness(test_config());
    set_agreeing_tip(&harness, 5, [7; 32]);
    fill_pending_txs(&harness, 3);
    set_processed(&harness, 3);

    harness.publisher.lock().can_propose = Some((Slot::new(100), 6));
    harness.publisher.lock().validate_ok = true;
    harness.publisher.lock().enqueue_accept = true;
    harness.publisher.lock().committee = vec![address(10), address(11), address(12)];
    harness.publisher.lock().send_requests_result = SendRequestsResult {
        valid_actions: vec!["propose".to_owned()],
    };
    harness.validator_client.lock().attestations = vec![
        Attestation {
            signer: address(10),
            signature: vec![1],
        },
        Attestation {
            signer: address(11),
            signature: vec![2],
        },
        Attestation {
            signer: address(12),
            signature: vec![3],
        },
    ];
    harness.builder.lock().archive_root = archive_root(99);
    harness.builder.lock().total_mana_used = 30;

    run_one_iteration(&harness).await;

    assert_eq!(harness.metrics.filled_slot(), 1);
    assert_eq!(harness.metrics.failed_block(), 0);
    assert_eq!(harness.publisher.lock().enqueued_blocks.len(), 1);
    assert_eq!(harness.sequencer.status(), Phase::Idle);
}

#[tokio::test]
async fn not_proposer_skips_the_slot_without_error() {
    let harness = build_harness(test_config());
    set_agreeing_tip(&harness, 5, [7; 32]);
    fill_pending_txs(&harness, 3);
    harness.publisher.lock().can_propose = None;

    run_one_iteration(&harness).await;

    assert_eq!(harness.metrics.not_ready(), 1);
    assert_eq!(harness.metrics.filled_slot(), 0);
    assert!(harness.publisher.lock().enqueued_blocks.is_empty());
    assert_eq!(harness.sequencer.status(), Phase::Idle);
}

#[tokio::test]
async fn too_slow_processing_is_reported_and_does_not_publish() {
    let mut config = test_config();
    config.enforce_timetable = true;
    config.aztec_slot_duration_secs = 1;
    let harness = build_harness(config);
    set_agreeing_tip(&harness, 5, [7; 32]);
    fill_pending_txs(&harness, 3);
    set_processed(&harness, 3);
    harness.processor.lock().delay = Some(Duration::from_secs(5));

    // Slot zero is the state machine's "timeless" sentinel (§4.2 step 2), so the phase
    // transitions leading up to `CreatingBlock` never themselves raise `TooSlow`; only the
    // processor's own deadline (driven by the delayed `FakeProcessor`) does.
    harness.publisher.lock().can_propose = Some((Slot::new(0), 6));
    harness.publisher.lock().validate_ok = true;
    harness.publisher.lock().enqueue_accept = true;

    run_one_iteration(&harness).await;

    assert_eq!(harness.metrics.too_slow(), 1);
    assert_eq!(harness.metrics.filled_slot(), 0);
    assert!(harness.publisher.lock().enqueued_blocks.is_empty());
}

/// Unlike the scenario above (which dodges the state machine's own deadline check entirely by
/// using slot zero, and instead trips the processor's own timeout), this drives a real, nonzero
/// slot through `set_state` itself far enough past `CreatingBlock`'s deadline that the
/// transition raises `TooSlow` from the timetable check, not from a collaborator timing out.
///
/// Because `Timetable`'s phase deadlines are cumulative and `do_real_work` captures a single
/// `now` for every transition up through `InitializingProposal`, a static "late" configuration
/// can't selectively fail `CreatingBlock` while letting `InitializingProposal` pass — the two
/// checks would see the same stale `seconds_into_slot`. Real time has to elapse between them, so
/// the fake publisher's pre-flight `validate_block_for_submission` call (the last thing `run`
/// does before the `CreatingBlock` transition) sleeps long enough to cross that deadline.
#[tokio::test]
async fn too_slow_at_creating_block_is_raised_by_the_state_machine() {
    let mut config = test_config();
    config.enforce_timetable = true;
    config.aztec_slot_duration_secs = 10;

    let timetable = sequencer_timetable::Timetable::from_config(&config);
    let initializing_proposal_end = timetable.max_allowed_time(Phase::InitializingProposal);
    let creating_block_end = timetable.max_allowed_time(Phase::CreatingBlock);
    assert!(
        creating_block_end > initializing_proposal_end,
        "scenario needs a real gap between the two deadlines"
    );

    // Aim the slot's start so that "right now" sits comfortably at or under
    // `initializing_proposal_end`, tolerating a little setup drift, then sleep long enough in
    // the fake publisher that the state machine's next `now_unix_secs()` read (for
    // `CreatingBlock`) is unambiguously past `creating_block_end`.
    let slot_number = 1u64;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_secs();
    let slot_start = now;
    config.l1_genesis_time = slot_start.saturating_sub(slot_number * config.aztec_slot_duration_secs);

    let harness = build_harness(config);
    set_agreeing_tip(&harness, 5, [7; 32]);
    fill_pending_txs(&harness, 3);
    set_processed(&harness, 3);

    harness.publisher.lock().can_propose = Some((Slot::new(slot_number), 6));
    harness.publisher.lock().validate_ok = true;
    harness.publisher.lock().enqueue_accept = true;
    let overrun_delay = Duration::from_secs(creating_block_end - initializing_proposal_end + 3);
    harness.publisher.lock().pre_creating_block_delay = Some(overrun_delay);

    run_one_iteration_for(&harness, overrun_delay + Duration::from_millis(500)).await;

    assert_eq!(harness.metrics.too_slow(), 1);
    assert_eq!(harness.metrics.filled_slot(), 0);
    assert!(harness.publisher.lock().enqueued_blocks.is_empty());
}

#[tokio::test]
async fn insufficient_pending_txs_skips_assembly() {
    let mut config = test_config();
    config.min_txs_per_block = 5;
    let harness = build_harness(config);
    set_agreeing_tip(&harness, 5, [7; 32]);
    fill_pending_txs(&harness, 1);

    harness.publisher.lock().can_propose = Some((Slot::new(100), 6));
    harness.publisher.lock().send_requests_result = SendRequestsResult::default();

    run_one_iteration(&harness).await;

    assert_eq!(harness.metrics.not_ready(), 1);
    assert!(harness.publisher.lock().enqueued_blocks.is_empty());
    // Governance/slashing votes still get enqueued even when the block itself is skipped.
    assert_eq!(harness.publisher.lock().votes_enqueued.len(), 2);
}

#[tokio::test]
async fn flush_overrides_the_minimum_transaction_count() {
    let mut config = test_config();
    config.min_txs_per_block = 5;
    let harness = build_harness(config);
    set_agreeing_tip(&harness, 5, [7; 32]);
    fill_pending_txs(&harness, 1);
    set_processed(&harness, 1);

    harness.publisher.lock().can_propose = Some((Slot::new(100), 6));
    harness.publisher.lock().validate_ok = true;
    harness.publisher.lock().enqueue_accept = true;
    harness.publisher.lock().send_requests_result = SendRequestsResult {
        valid_actions: vec!["propose".to_owned()],
    };

    harness.sequencer.flush();
    run_one_iteration(&harness).await;

    assert_eq!(harness.metrics.filled_slot(), 1);
    assert_eq!(harness.publisher.lock().enqueued_blocks.len(), 1);
}

#[tokio::test]
async fn post_assembly_validation_failure_is_reported_as_failed_block() {
    let harness = build_harness(test_config());
    set_agreeing_tip(&harness, 5, [7; 32]);
    fill_pending_txs(&harness, 3);
    set_processed(&harness, 3);

    harness.publisher.lock().can_propose = Some((Slot::new(100), 6));
    harness.publisher.lock().validate_ok = true;
    harness.publisher.lock().enqueue_accept = true;
    // Simulate L1 advancing past our slot in between the pre-flight (call 1) and post-assembly
    // (call 2) validation checks, without racing real wall-clock timing against the pipeline.
    harness.publisher.lock().fail_validate_from_call = Some(2);

    run_one_iteration(&harness).await;

    assert_eq!(harness.metrics.filled_slot(), 0);
    assert!(harness.publisher.lock().enqueued_blocks.is_empty());
}

#[tokio::test]
async fn chain_tip_disagreement_is_not_ready_not_a_hard_error() {
    let harness = build_harness(test_config());
    harness.world_state.lock().latest_block_number = 5;
    harness.peer_network.lock().synced_to_l2_block_number = 6;
    harness.l2_source.lock().tip = L2Tip {
        number: 6,
        hash: Some([1; 32]),
    };

    run_one_iteration(&harness).await;

    assert_eq!(harness.metrics.not_ready(), 1);
    assert_eq!(harness.sequencer.status(), Phase::Idle);
}

#[tokio::test]
async fn stop_is_idempotent_with_restart() {
    let harness = build_harness(test_config());
    set_agreeing_tip(&harness, 5, [7; 32]);

    harness.sequencer.start().expect("start");
    harness.sequencer.stop().await.expect("stop");
    assert_eq!(harness.sequencer.status(), Phase::Stopped);

    harness.sequencer.restart().await.expect("restart");
    assert_eq!(harness.sequencer.status(), Phase::Idle);
    assert!(harness.publisher.lock().restarted);

    harness.sequencer.stop().await.expect("stop again");
    assert_eq!(harness.sequencer.status(), Phase::Stopped);
}

#[tokio::test]
async fn construction_primes_governance_payload_and_registers_slash_getter() {
    let mut config = test_config();
    config.governance_proposer_payload = vec![1, 2, 3];
    let harness = build_harness(config);

    assert_eq!(harness.publisher.lock().governance_payload, vec![1, 2, 3]);
    assert!(harness.publisher.lock().slash_payload_getter_registered);

    harness
        .sequencer
        .update_config(Configuration {
            governance_proposer_payload: vec![4, 5],
            ..test_config()
        });
    assert_eq!(harness.publisher.lock().governance_payload, vec![4, 5]);
}
