//! Where the consensus task hands each decided round's snapshot.
//!
//! Durable formats are the host's business; the node only needs somewhere
//! to put snapshots and a way to get the newest one back for a restart.

use std::collections::VecDeque;

use weft_types::ConsensusSnapshot;

use crate::NodeError;

pub trait SnapshotStore: Send {
    /// Record the snapshot of a newly decided round.
    fn save(&mut self, snapshot: &ConsensusSnapshot) -> Result<(), NodeError>;

    /// The snapshot of the most recently decided round, if any.
    fn latest(&self) -> Result<Option<ConsensusSnapshot>, NodeError>;

    /// The snapshot for a specific round, if still retained.
    fn get(&self, round: u64) -> Result<Option<ConsensusSnapshot>, NodeError>;
}

/// Keeps the newest `capacity` snapshots in memory.
#[derive(Debug)]
pub struct InMemorySnapshotStore {
    capacity: usize,
    snapshots: VecDeque<ConsensusSnapshot>,
}

impl InMemorySnapshotStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            snapshots: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl Default for InMemorySnapshotStore {
    fn default() -> Self {
        Self::new(16)
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn save(&mut self, snapshot: &ConsensusSnapshot) -> Result<(), NodeError> {
        // After a restart from an older checkpoint the newer rounds are
        // decided again and replace what was stored.
        while self
            .snapshots
            .back()
            .is_some_and(|last| last.round >= snapshot.round)
        {
            self.snapshots.pop_back();
        }
        if self.snapshots.len() == self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot.clone());
        Ok(())
    }

    fn latest(&self) -> Result<Option<ConsensusSnapshot>, NodeError> {
        Ok(self.snapshots.back().cloned())
    }

    fn get(&self, round: u64) -> Result<Option<ConsensusSnapshot>, NodeError> {
        Ok(self.snapshots.iter().find(|s| s.round == round).cloned())
    }
}
