//! Nullable clock — deterministic event creation times.

use std::cell::Cell;
use weft_types::ConsensusTime;

/// A deterministic clock for testing.
///
/// Time only advances when you tell it to.
pub struct NullClock {
    current: Cell<u64>,
}

impl NullClock {
    pub fn new(initial: ConsensusTime) -> Self {
        Self {
            current: Cell::new(initial.as_nanos()),
        }
    }

    /// Get the current time.
    pub fn now(&self) -> ConsensusTime {
        ConsensusTime::from_nanos(self.current.get())
    }

    /// Advance time by a number of nanoseconds.
    pub fn advance(&self, nanos: u64) {
        self.current.set(self.current.get().saturating_add(nanos));
    }

    /// Set the time to a specific value.
    pub fn set(&self, time: ConsensusTime) {
        self.current.set(time.as_nanos());
    }
}

impl Default for NullClock {
    fn default() -> Self {
        Self::new(ConsensusTime::EPOCH)
    }
}
