//! Slot and timing primitives.

use core::time::Duration;
use derive_more::{AsRef, Display, From, Into};

/// Monotonic network slot number.
///
/// Slot `n` starts at `l1_genesis_time + n * slot_duration` and lasts exactly one
/// [`SlotDuration`]. Exactly one operator is eligible to propose a block for a given slot.
#[derive(
    Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, From, Into, Display, AsRef,
)]
pub struct Slot(u64);

impl Slot {
    /// Slot zero, used as a sentinel for "no time constraint" phases (`Idle`/`Stopped`).
    pub const ZERO: Self = Self(0);

    /// Create a slot number from its raw integer value.
    #[must_use]
    pub const fn new(slot: u64) -> Self {
        Self(slot)
    }

    /// Raw integer value of this slot.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Whether this is the sentinel slot used by phases without a time constraint.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Checked predecessor, `None` at `Slot::ZERO`.
    #[must_use]
    pub const fn checked_sub(self, rhs: u64) -> Option<Self> {
        match self.0.checked_sub(rhs) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }
}

/// Duration of one network slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, From, Into)]
pub struct SlotDuration(Duration);

impl SlotDuration {
    /// Create a slot duration from a whole number of seconds.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    /// This duration as a [`Duration`].
    #[must_use]
    pub const fn as_duration(self) -> Duration {
        self.0
    }

    /// This duration as a whole number of seconds (truncating any sub-second remainder).
    #[must_use]
    pub const fn as_secs(self) -> u64 {
        self.0.as_secs()
    }
}

/// Unix timestamp (seconds) of the L1 genesis block, used to derive slot start times.
#[derive(Debug, Copy, Clone, Eq, PartialEq, From, Into)]
pub struct L1GenesisTime(u64);

impl L1GenesisTime {
    /// Create a genesis time from a Unix timestamp in seconds.
    #[must_use]
    pub const fn new(unix_secs: u64) -> Self {
        Self(unix_secs)
    }

    /// Start-of-slot Unix timestamp for `slot`, given this genesis time and a [`SlotDuration`].
    #[must_use]
    pub const fn slot_start_time(self, slot: Slot, slot_duration: SlotDuration) -> u64 {
        self.0 + slot.as_u64() * slot_duration.as_secs()
    }
}

/// Seconds elapsed since the start of the current slot.
///
/// Never negative: a `now` earlier than `slot_start_time` saturates to zero, which matches a
/// clock that is running in lockstep with or slightly behind L1.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, From, Into, Display)]
pub struct SecondsIntoSlot(u64);

impl SecondsIntoSlot {
    /// Compute seconds-into-slot from a wall-clock Unix timestamp.
    #[must_use]
    pub const fn since(now_unix_secs: u64, slot_start_time: u64) -> Self {
        Self(now_unix_secs.saturating_sub(slot_start_time))
    }

    /// Raw integer value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}
