//! Pure per-phase deadline queries over a slot's timeline (component C3 of the sequencer core).
//!
//! A [`Timetable`] carves one rollup slot into non-overlapping windows, one per
//! [`Phase`](sequencer_types::Phase), with a final tail reserved for L1 inclusion. It never reads
//! a clock itself: every query takes `seconds_into_slot` as an explicit argument, the way the
//! teacher's `derive_consensus_parameters` takes its whole timing context as plain arguments
//! rather than reaching for a global clock.

use sequencer_types::config::Configuration;
use sequencer_types::{Phase, SecondsIntoSlot, SlotDuration};

/// Error raised when a phase cannot be entered before its deadline.
#[derive(Debug, thiserror::Error)]
#[error(
    "too slow: entering {phase} at {seconds_into_slot}s into the slot, deadline is {max_allowed}s"
)]
pub struct TooSlow {
    /// Phase that could not be entered in time.
    pub phase: Phase,
    /// How far into the slot we already were.
    pub seconds_into_slot: SecondsIntoSlot,
    /// The phase's deadline, in seconds-into-slot.
    pub max_allowed: u64,
}

/// Fraction of the rollup slot duration reserved for synchronizing and checking proposer
/// eligibility, before any proposal-specific work starts.
const SYNC_AND_PROPOSER_CHECK_FRACTION: f64 = 0.10;
/// Fraction reserved for building `GlobalVariables`/`ProposedBlockHeader` and enqueueing votes.
const INITIALIZING_PROPOSAL_FRACTION: f64 = 0.05;
/// Fraction reserved for forking world state, public processing, and block finalization — the
/// majority of the slot, per §2's component weighting of C5.
const CREATING_BLOCK_FRACTION: f64 = 0.55;
/// Fraction reserved for the peer-network attestation round trip.
const COLLECTING_ATTESTATIONS_FRACTION: f64 = 0.15;
/// A validator re-executing a foreign proposal must finish before it can attest, so its deadline
/// sits this far into the `creating_block` window rather than at its end.
const VALIDATOR_REEXEC_FRACTION_OF_CREATING_BLOCK: f64 = 0.5;

/// Per-slot deadline calculator.
#[derive(Debug, Clone)]
pub struct Timetable {
    ethereum_slot_duration: SlotDuration,
    aztec_slot_duration: SlotDuration,
    max_l1_inclusion_seconds_into_slot: u64,
    enforce_timetable: bool,
}

impl Timetable {
    /// Build a timetable from the relevant fields of a [`Configuration`].
    ///
    /// `update_config` rebuilds a `Timetable` from scratch on every reload, rather than mutating
    /// one in place, so there is never a window where only some fields reflect the new config.
    #[must_use]
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            ethereum_slot_duration: SlotDuration::from_secs(config.ethereum_slot_duration_secs),
            aztec_slot_duration: SlotDuration::from_secs(config.aztec_slot_duration_secs),
            max_l1_inclusion_seconds_into_slot: config.max_l1_tx_inclusion_time_into_slot,
            enforce_timetable: config.enforce_timetable,
        }
    }

    /// The rollup's own slot duration, in seconds.
    #[must_use]
    pub const fn slot_duration(&self) -> SlotDuration {
        self.aztec_slot_duration
    }

    /// The L1 (Ethereum) slot duration, in seconds.
    #[must_use]
    pub const fn ethereum_slot_duration(&self) -> SlotDuration {
        self.ethereum_slot_duration
    }

    /// Whether deadlines are actually enforced, or merely advisory.
    #[must_use]
    pub const fn enforce_timetable(&self) -> bool {
        self.enforce_timetable
    }

    fn sync_and_proposer_check_end(&self) -> u64 {
        scale(self.slot_duration(), SYNC_AND_PROPOSER_CHECK_FRACTION)
    }

    fn initializing_proposal_end(&self) -> u64 {
        self.sync_and_proposer_check_end() + scale(self.slot_duration(), INITIALIZING_PROPOSAL_FRACTION)
    }

    fn creating_block_end(&self) -> u64 {
        self.initializing_proposal_end() + scale(self.slot_duration(), CREATING_BLOCK_FRACTION)
    }

    fn collecting_attestations_end(&self) -> u64 {
        self.creating_block_end() + scale(self.slot_duration(), COLLECTING_ATTESTATIONS_FRACTION)
    }

    fn publishing_block_end(&self) -> u64 {
        let reserved_tail = self
            .slot_duration()
            .as_secs()
            .saturating_sub(self.max_l1_inclusion_seconds_into_slot);
        // Never let the reserved L1-inclusion tail eat into the attestation window: if
        // misconfigured, publishing still gets at least up to `collecting_attestations_end`.
        reserved_tail.max(self.collecting_attestations_end())
    }

    /// Deadline, in seconds-into-slot, for entering `phase`.
    ///
    /// `Idle` and `Stopped` are timeless (see [`Phase::is_timeless`]) and always return
    /// `u64::MAX`.
    #[must_use]
    pub fn max_allowed_time(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Stopped | Phase::Idle => u64::MAX,
            Phase::Synchronizing | Phase::ProposerCheck => self.sync_and_proposer_check_end(),
            Phase::InitializingProposal => self.initializing_proposal_end(),
            Phase::CreatingBlock => self.creating_block_end(),
            Phase::CollectingAttestations => self.collecting_attestations_end(),
            Phase::PublishingBlock => self.publishing_block_end(),
        }
    }

    /// Raise [`TooSlow`] if `seconds_into_slot` is already past `phase`'s deadline.
    ///
    /// A no-op when `enforce_timetable` is `false` or `phase` is timeless, matching §4.2's
    /// "deadlines are advisory" configuration toggle.
    pub fn assert_time_left(
        &self,
        phase: Phase,
        seconds_into_slot: SecondsIntoSlot,
    ) -> Result<(), TooSlow> {
        if !self.enforce_timetable || phase.is_timeless() {
            return Ok(());
        }

        let max_allowed = self.max_allowed_time(phase);
        if seconds_into_slot.as_u64() > max_allowed {
            return Err(TooSlow {
                phase,
                seconds_into_slot,
                max_allowed,
            });
        }

        Ok(())
    }

    /// The last instant, in seconds-into-slot, at which the *proposer's* public processor may
    /// still be issuing work. Never earlier than `seconds_into_slot` itself, so a caller that
    /// already overran never computes a negative-duration deadline.
    #[must_use]
    pub fn block_proposal_exec_end(&self, seconds_into_slot: SecondsIntoSlot) -> u64 {
        self.creating_block_end().max(seconds_into_slot.as_u64())
    }

    /// The last instant, in seconds-into-slot, at which a *validator* re-executing a foreign
    /// proposal may still be issuing work. Strictly earlier than
    /// [`Self::block_proposal_exec_end`]: a validator must finish re-executing before it can
    /// attest to what it received.
    #[must_use]
    pub fn validator_reexec_end(&self, seconds_into_slot: SecondsIntoSlot) -> u64 {
        let initializing_end = self.initializing_proposal_end();
        let window = self.creating_block_end().saturating_sub(initializing_end);
        let deadline =
            initializing_end + scale_u64(window, VALIDATOR_REEXEC_FRACTION_OF_CREATING_BLOCK);
        deadline.max(seconds_into_slot.as_u64())
    }
}

fn scale(duration: SlotDuration, fraction: f64) -> u64 {
    scale_u64(duration.as_secs(), fraction)
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "fraction is a compile-time constant in [0, 1] and durations are small"
)]
fn scale_u64(value: u64, fraction: f64) -> u64 {
    (value as f64 * fraction) as u64
}
