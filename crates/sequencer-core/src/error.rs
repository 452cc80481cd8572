//! The sequencer core's top-level error type.

use sequencer_collaborators::CollaboratorError;
use sequencer_state_machine::SetStateError;
use sequencer_timetable::TooSlow;

/// Every way a single main-loop iteration can end without producing a block.
///
/// [`SequencerError::TooSlow`] and [`SequencerError::NotReady`] are expected operational
/// conditions the main loop handles by logging and returning to `Idle` (§7); every other variant
/// is operator-visible and is rethrown by the loop after the same reset.
#[derive(Debug, thiserror::Error)]
pub enum SequencerError {
    /// A phase could not be entered before its slot deadline. Caught at the loop level, logged
    /// at `warn`, never rethrown.
    #[error(transparent)]
    TooSlow(#[from] TooSlow),

    /// The sync gate failed to reach consensus across the four upstream sources, or we are not
    /// the proposer for the next slot. Silent; the iteration simply returns to `Idle`.
    #[error("not ready to propose: {reason}")]
    NotReady {
        /// Human-readable reason, for debug-level logging only.
        reason: &'static str,
    },

    /// Pre- or post-assembly validation failed, or the block had too few transactions to be
    /// proposable. World state is unaffected: the forks that were mutated are never merged.
    #[error("block invalid: {reason}")]
    BlockInvalid {
        /// Human-readable reason.
        reason: &'static str,
    },

    /// A raise from the publisher, validator client, world state, or peer network.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// A hard inconsistency between what the publisher and the sequencer each believe about the
    /// slot being produced (e.g. a block-number mismatch). Fatal to the iteration.
    #[error("inconsistent: {reason}")]
    Inconsistent {
        /// Human-readable reason.
        reason: String,
    },

    /// A guarded phase transition was rejected outside of the `TooSlow` case, e.g. the machine
    /// was stopped mid-iteration.
    #[error(transparent)]
    InvalidTransition(#[from] SetStateError),
}

impl SequencerError {
    /// Whether this error is an expected, silent operational condition (§7): the loop neither
    /// warns nor rethrows these beyond its own `debug!`-level bookkeeping.
    #[must_use]
    pub const fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }

    /// Whether this error is the `TooSlow` condition, which the loop logs at `warn` but never
    /// rethrows.
    #[must_use]
    pub const fn is_too_slow(&self) -> bool {
        matches!(self, Self::TooSlow(_))
    }
}
