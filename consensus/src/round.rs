//! What the engine emits each time a round is decided.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use weft_types::{ConsensusSnapshot, ConsensusTime, EventData, EventHash};

use crate::config::AncientMode;
use crate::ordering::MIN_TRANS_TIMESTAMP_INCR_NANOS;

/// An event that reached consensus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsensusEvent {
    pub event: Arc<EventData>,
    pub round_created: u64,
    pub round_received: u64,
    pub consensus_order: u64,
    pub consensus_timestamp: ConsensusTime,
}

impl ConsensusEvent {
    pub fn hash(&self) -> &EventHash {
        &self.event.hash
    }

    /// Consensus time of each transaction, spaced by the minimum increment.
    pub fn transaction_timestamps(&self) -> impl Iterator<Item = ConsensusTime> + '_ {
        let start = self.consensus_timestamp;
        (0..self.event.transaction_count() as u64)
            .map(move |i| start.plus_nanos(i * MIN_TRANS_TIMESTAMP_INCR_NANOS))
    }
}

/// The boundaries gossip uses to decide which events still matter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWindow {
    pub latest_consensus_round: u64,
    /// Events with an ancient indicator below this are ancient.
    pub ancient_threshold: u64,
    /// Events with an ancient indicator below this are expired.
    pub expired_threshold: u64,
    pub ancient_mode: AncientMode,
}

impl EventWindow {
    pub fn is_ancient(&self, event: &EventData) -> bool {
        self.ancient_mode.indicator(event) < self.ancient_threshold
    }
}

/// A decided round and everything that reached consensus in it.
#[derive(Clone, Debug)]
pub struct ConsensusRound {
    pub round: u64,
    /// In consensus order.
    pub consensus_events: Vec<ConsensusEvent>,
    /// Ordered by creator.
    pub judges: Vec<Arc<EventData>>,
    pub event_window: EventWindow,
    pub snapshot: ConsensusSnapshot,
    /// Events that became ancient without reaching consensus.
    pub stale_events: Vec<Arc<EventData>>,
}

impl ConsensusRound {
    pub fn is_empty(&self) -> bool {
        self.consensus_events.is_empty()
    }

    pub fn judge_hashes(&self) -> Vec<EventHash> {
        self.judges.iter().map(|j| j.hash).collect()
    }

    /// Consensus time of the last transaction in the round, or of the last
    /// event when it carries none.
    pub fn last_transaction_time(&self) -> Option<ConsensusTime> {
        let last = self.consensus_events.last()?;
        Some(crate::ordering::last_transaction_time(
            last.consensus_timestamp,
            last.event.transaction_count(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::make_event;

    #[test]
    fn transactions_are_spaced() {
        let mut data = (*make_event(1, 0, None, None, 0)).clone();
        data.hashed.transactions = vec![vec![1], vec![2], vec![3]];
        let event = ConsensusEvent {
            event: Arc::new(data),
            round_created: 1,
            round_received: 2,
            consensus_order: 0,
            consensus_timestamp: ConsensusTime::from_nanos(10_000),
        };
        let times: Vec<u64> = event.transaction_timestamps().map(|t| t.as_nanos()).collect();
        assert_eq!(times, vec![10_000, 11_000, 12_000]);
    }

    #[test]
    fn window_ancient_check_follows_mode() {
        let event = make_event(5, 0, None, None, 0);
        let mut window = EventWindow {
            latest_consensus_round: 3,
            ancient_threshold: 6,
            expired_threshold: 1,
            ancient_mode: AncientMode::GenerationThreshold,
        };
        assert!(window.is_ancient(&event));
        // birth round of the test event is 1
        window.ancient_mode = AncientMode::BirthRoundThreshold;
        window.ancient_threshold = 1;
        assert!(!window.is_ancient(&event));
    }
}
