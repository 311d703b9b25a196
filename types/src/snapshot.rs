//! Round checkpoints used to restart consensus without replaying history.

use serde::{Deserialize, Serialize};

use crate::hash::EventHash;
use crate::time::ConsensusTime;

/// The minimum ancient indicator (generation or birth round) over the
/// judges of one decided round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimumJudgeInfo {
    pub round: u64,
    pub minimum_judge_ancient_threshold: u64,
}

impl MinimumJudgeInfo {
    pub fn new(round: u64, minimum_judge_ancient_threshold: u64) -> Self {
        Self {
            round,
            minimum_judge_ancient_threshold,
        }
    }
}

/// Immutable checkpoint emitted each time a round is decided.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusSnapshot {
    /// The decided round this checkpoint describes.
    pub round: u64,
    /// Hashes of the round's judges, ordered by creator.
    pub judge_hashes: Vec<EventHash>,
    /// Per-round thresholds for every round in the non-ancient window,
    /// ascending by round and ending with `round`.
    pub minimum_judge_info_list: Vec<MinimumJudgeInfo>,
    /// The consensus order the next event to reach consensus will receive.
    pub next_consensus_number: u64,
    /// Consensus timestamp associated with the round.
    pub consensus_timestamp: ConsensusTime,
}

impl ConsensusSnapshot {
    /// Threshold recorded for `round`, if it is in the list.
    pub fn minimum_judge_info(&self, round: u64) -> Option<&MinimumJudgeInfo> {
        self.minimum_judge_info_list.iter().find(|i| i.round == round)
    }
}
