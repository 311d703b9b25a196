//! Restart checkpoints: validation, synthesis from a single judge, and the
//! resolver that recognizes a snapshot's judges as they arrive again.

use std::collections::HashSet;

use weft_types::{ConsensusSnapshot, ConsensusTime, EventData, EventHash, MinimumJudgeInfo};

use crate::config::ConsensusConfig;
use crate::error::ConsensusError;
use crate::graph::{EventId, ROUND_FIRST};

/// Build a checkpoint for `round` from one known judge.
///
/// Every round of the non-ancient window ending at `round` is given the
/// judge's ancient indicator as its threshold.
pub fn synthetic_snapshot(
    round: u64,
    last_consensus_order: u64,
    round_timestamp: ConsensusTime,
    config: &ConsensusConfig,
    judge: &EventData,
) -> ConsensusSnapshot {
    let indicator = config.ancient_mode.indicator(judge);
    let first = (round + 1)
        .saturating_sub(config.rounds_non_ancient)
        .max(ROUND_FIRST);
    ConsensusSnapshot {
        round,
        judge_hashes: vec![judge.hash],
        minimum_judge_info_list: (first..=round)
            .map(|r| MinimumJudgeInfo::new(r, indicator))
            .collect(),
        next_consensus_number: last_consensus_order + 1,
        consensus_timestamp: round_timestamp,
    }
}

/// Reject a checkpoint the engine cannot restart from.
pub fn validate_snapshot(snapshot: &ConsensusSnapshot) -> Result<(), ConsensusError> {
    if snapshot.judge_hashes.is_empty() {
        return Err(ConsensusError::InvalidSnapshot(format!(
            "round {} has no judges",
            snapshot.round
        )));
    }
    match snapshot.minimum_judge_info_list.last() {
        Some(last) if last.round == snapshot.round => Ok(()),
        Some(last) => Err(ConsensusError::InvalidSnapshot(format!(
            "minimum judge list ends at round {}, snapshot is for round {}",
            last.round, snapshot.round
        ))),
        None => Err(ConsensusError::InvalidSnapshot(
            "minimum judge list is empty".into(),
        )),
    }
}

/// The judges a restart is waiting for.
#[derive(Debug)]
pub struct InitJudges {
    round: u64,
    missing: HashSet<EventHash>,
    found: Vec<EventId>,
}

impl InitJudges {
    pub fn new(round: u64, hashes: impl IntoIterator<Item = EventHash>) -> Self {
        Self {
            round,
            missing: hashes.into_iter().collect(),
            found: Vec::new(),
        }
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    /// Whether `hash` is one of the judges still awaited.
    pub fn is_init_judge(&self, hash: &EventHash) -> bool {
        self.missing.contains(hash)
    }

    /// Record the arrival of an awaited judge.
    pub fn judge_found(&mut self, hash: &EventHash, id: EventId) {
        if self.missing.remove(hash) {
            self.found.push(id);
        }
    }

    pub fn all_judges_found(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn missing_judges(&self) -> usize {
        self.missing.len()
    }

    pub fn found(&self) -> &[EventId] {
        &self.found
    }
}
