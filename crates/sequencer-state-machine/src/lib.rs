//! Guarded phase transitions for the sequencer core (component C2).
//!
//! [`StateMachine`] is the single writer of the sequencer's current [`Phase`]. Every transition
//! goes through [`StateMachine::set_state`], which checks the transition is on the valid-edge
//! table and, unless the destination is timeless, that the [`Timetable`] still has budget left
//! for it — mirroring the guarded `set_state` the teacher's slot worker implicitly relies on by
//! only ever driving `ChainSyncStatus`/`ChainInfo` forward through well-defined states.

use parking_lot::Mutex;
use sequencer_timetable::{TooSlow, Timetable};
use sequencer_types::{Phase, SecondsIntoSlot, Slot};

/// Error raised by [`StateMachine::set_state`].
#[derive(Debug, thiserror::Error)]
pub enum SetStateError {
    /// The machine is `Stopped` and the caller did not pass `force`.
    #[error("sequencer is stopped; only start/restart (force) may leave this state")]
    Stopped,
    /// `next` is not reachable from the current phase on the valid-edge table.
    #[error("invalid transition {from} -> {to}")]
    InvalidTransition {
        /// Phase transitioned from.
        from: Phase,
        /// Phase that was rejected as a destination.
        to: Phase,
    },
    /// The destination phase cannot be entered before its slot deadline.
    #[error(transparent)]
    TooSlow(#[from] TooSlow),
}

/// Whether `next` is reachable from `current` per §4.2's valid-edge table.
#[must_use]
pub fn is_valid_edge(current: Phase, next: Phase, force: bool) -> bool {
    if force && next == Phase::Stopped {
        return true;
    }

    matches!(
        (current, next),
        (Phase::Stopped, Phase::Idle)
            | (Phase::Idle, Phase::Synchronizing)
            | (Phase::Synchronizing, Phase::ProposerCheck | Phase::Idle)
            | (Phase::ProposerCheck, Phase::InitializingProposal | Phase::Idle)
            | (Phase::InitializingProposal, Phase::CreatingBlock | Phase::Idle)
            | (Phase::CreatingBlock, Phase::CollectingAttestations | Phase::Idle)
            | (Phase::CollectingAttestations, Phase::PublishingBlock | Phase::Idle)
            | (Phase::PublishingBlock, Phase::Idle)
    )
}

/// Tracks the sequencer's current phase and guards every transition.
#[derive(Debug)]
pub struct StateMachine {
    current: Mutex<Phase>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// A new state machine, starting in `Stopped` per §3's lifecycle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Mutex::new(Phase::Stopped),
        }
    }

    /// The current phase. Safe to call from any task: this is the read side of the single
    /// writer described in §8's testable property 7.
    #[must_use]
    pub fn current(&self) -> Phase {
        *self.current.lock()
    }

    /// Attempt to transition to `next`.
    ///
    /// `slot` is the slot this transition is happening for; `Slot::ZERO` (used for `Idle`/
    /// `Stopped` transitions) means "no time constraint" regardless of what the timetable would
    /// otherwise say, per §4.2 step 2. On success returns the previous phase.
    pub fn set_state(
        &self,
        next: Phase,
        slot: Slot,
        seconds_into_slot: SecondsIntoSlot,
        force: bool,
        timetable: &Timetable,
    ) -> Result<Phase, SetStateError> {
        let mut current = self.current.lock();

        if *current == Phase::Stopped && !force {
            tracing::warn!(%next, "rejected state transition: sequencer is stopped");
            return Err(SetStateError::Stopped);
        }

        if !is_valid_edge(*current, next, force) {
            return Err(SetStateError::InvalidTransition {
                from: *current,
                to: next,
            });
        }

        if !slot.is_zero() {
            timetable.assert_time_left(next, seconds_into_slot)?;
        }

        let previous = *current;
        *current = next;
        tracing::debug!(%previous, %next, %slot, "sequencer phase transition");
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sequencer_types::config::Configuration;

    fn timetable(enforce: bool) -> Timetable {
        Timetable::from_config(&Configuration {
            polling_interval_ms: 500,
            min_txs_per_block: 1,
            max_txs_per_block: 32,
            max_l2_block_gas: 1_000_000,
            max_block_size_bytes: 1_000_000,
            coinbase: sequencer_types::L1Address::default(),
            fee_recipient: sequencer_types::L2Address::default(),
            tx_public_setup_allow_list: Vec::new(),
            enforce_timetable: enforce,
            publish_txs_with_proposals: true,
            governance_proposer_payload: Vec::new(),
            max_l1_tx_inclusion_time_into_slot: 4,
            ethereum_slot_duration_secs: 12,
            aztec_slot_duration_secs: 36,
            l1_genesis_time: 0,
            initial_l2_block_num: 1,
        })
    }

    #[test]
    fn starts_stopped_and_rejects_transitions_without_force() {
        let machine = StateMachine::new();
        assert_eq!(machine.current(), Phase::Stopped);

        let err = machine
            .set_state(
                Phase::Idle,
                Slot::ZERO,
                SecondsIntoSlot::default(),
                false,
                &timetable(true),
            )
            .unwrap_err();
        assert!(matches!(err, SetStateError::Stopped));
        assert_eq!(machine.current(), Phase::Stopped);
    }

    #[test]
    fn start_arms_idle_and_full_happy_path_sequence_is_valid() {
        let machine = StateMachine::new();
        let tt = timetable(true);

        machine
            .set_state(Phase::Idle, Slot::ZERO, SecondsIntoSlot::default(), true, &tt)
            .unwrap();
        assert_eq!(machine.current(), Phase::Idle);

        let slot = Slot::new(10);
        for phase in [
            Phase::Synchronizing,
            Phase::ProposerCheck,
            Phase::InitializingProposal,
            Phase::CreatingBlock,
            Phase::CollectingAttestations,
            Phase::PublishingBlock,
            Phase::Idle,
        ] {
            machine
                .set_state(phase, slot, SecondsIntoSlot::since(0, 0), false, &tt)
                .unwrap();
        }
        assert_eq!(machine.current(), Phase::Idle);
    }

    #[test]
    fn invalid_edge_is_rejected() {
        let machine = StateMachine::new();
        let tt = timetable(true);
        machine
            .set_state(Phase::Idle, Slot::ZERO, SecondsIntoSlot::default(), true, &tt)
            .unwrap();

        let err = machine
            .set_state(
                Phase::CreatingBlock,
                Slot::new(1),
                SecondsIntoSlot::since(0, 0),
                false,
                &tt,
            )
            .unwrap_err();
        assert!(matches!(err, SetStateError::InvalidTransition { .. }));
    }

    #[test]
    fn too_slow_blocks_the_transition() {
        let machine = StateMachine::new();
        let tt = timetable(true);
        machine
            .set_state(Phase::Idle, Slot::ZERO, SecondsIntoSlot::default(), true, &tt)
            .unwrap();

        let way_too_late = SecondsIntoSlot::since(10_000, 0);
        let err = machine
            .set_state(Phase::Synchronizing, Slot::new(1), way_too_late, false, &tt)
            .unwrap_err();
        assert!(matches!(err, SetStateError::TooSlow(_)));
        // A rejected transition never commits.
        assert_eq!(machine.current(), Phase::Idle);
    }

    #[test]
    fn force_can_always_stop() {
        let machine = StateMachine::new();
        let tt = timetable(true);
        machine
            .set_state(Phase::Idle, Slot::ZERO, SecondsIntoSlot::default(), true, &tt)
            .unwrap();
        machine
            .set_state(
                Phase::Stopped,
                Slot::ZERO,
                SecondsIntoSlot::default(),
                true,
                &tt,
            )
            .unwrap();
        assert_eq!(machine.current(), Phase::Stopped);
    }
}
