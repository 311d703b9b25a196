//! Round window tracking: the election cursor, per-round judge thresholds
//! and the ancient/expired boundaries derived from them.

use weft_types::MinimumJudgeInfo;

use crate::config::ConsensusConfig;
use crate::election::{CandidateWitness, RoundElections};
use crate::error::ConsensusError;
use crate::graph::{EventId, EventNode, ROUND_FIRST, ROUND_NEGATIVE_INFINITY};
use crate::ring_buffer::SequentialRingBuffer;

/// What happened to a witness handed to [`ConsensusRounds::new_witness`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WitnessOutcome {
    /// Not in the round under election.
    Ignored,
    /// Decided not famous without an election.
    NotFamous,
    /// Registered for election at this candidate index.
    Registered(usize),
}

pub struct ConsensusRounds {
    config: ConsensusConfig,
    elections: RoundElections,
    minimum_judge_storage: SequentialRingBuffer<MinimumJudgeInfo>,
    max_round_created: u64,
    ancient_threshold: u64,
    expired_threshold: u64,
}

impl ConsensusRounds {
    pub fn new(config: ConsensusConfig) -> Self {
        let capacity = config.rounds_expired as usize;
        Self {
            config,
            elections: RoundElections::new(),
            minimum_judge_storage: SequentialRingBuffer::new(ROUND_FIRST, capacity),
            max_round_created: ROUND_NEGATIVE_INFINITY,
            ancient_threshold: 0,
            expired_threshold: 0,
        }
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    pub fn elections(&self) -> &RoundElections {
        &self.elections
    }

    pub fn elections_mut(&mut self) -> &mut RoundElections {
        &mut self.elections
    }

    /// The round whose witnesses are being voted on.
    pub fn election_round(&self) -> u64 {
        self.elections.round()
    }

    /// The latest decided round, `ROUND_NEGATIVE_INFINITY` before the first.
    pub fn last_round_decided(&self) -> u64 {
        self.election_round() - 1
    }

    pub fn max_round_created(&self) -> u64 {
        self.max_round_created
    }

    pub fn update_max_round(&mut self, round: u64) {
        self.max_round_created = self.max_round_created.max(round);
    }

    /// Start a replay of the witnesses at or above the election round; the
    /// max round is rebuilt from the replayed events.
    pub fn recalculating(&mut self) {
        self.max_round_created = self.last_round_decided();
    }

    /// Offer a witness for election.
    ///
    /// Only witnesses of the round under election are considered. One that
    /// already has two complete rounds formed after it, or whose creator is
    /// not in the roster, can never be famous and is decided on the spot.
    pub fn new_witness(
        &mut self,
        id: EventId,
        witness: &mut EventNode,
        ancient_indicator: u64,
    ) -> WitnessOutcome {
        let round = witness.round_created;
        if round != self.election_round() {
            return WitnessOutcome::Ignored;
        }
        let Some(creator_index) = witness.creator_index else {
            witness.famous = false;
            witness.fame_decided = true;
            return WitnessOutcome::NotFamous;
        };
        if self.max_round_created >= round + 2 {
            witness.famous = false;
            witness.fame_decided = true;
            return WitnessOutcome::NotFamous;
        }
        let candidate = CandidateWitness::new(
            id,
            *witness.hash(),
            witness.data.creator(),
            creator_index,
            ancient_indicator,
        );
        WitnessOutcome::Registered(self.elections.add_witness(candidate))
    }

    /// Record the decided round's threshold and move the election on.
    pub fn current_election_decided(&mut self, min_judge_indicator: u64) {
        let decided = self.election_round();
        self.minimum_judge_storage
            .add(decided, MinimumJudgeInfo::new(decided, min_judge_indicator));
        self.elections.start_new_election();
        self.minimum_judge_storage
            .remove_older_than((decided + 1).saturating_sub(self.config.rounds_expired));
        let previous = self.ancient_threshold;
        self.update_thresholds();
        // judge indicators never move backwards across decided rounds
        self.ancient_threshold = self.ancient_threshold.max(previous);
        tracing::debug!(
            round = decided,
            ancient_threshold = self.ancient_threshold,
            expired_threshold = self.expired_threshold,
            "election decided"
        );
    }

    /// Seed the window from a snapshot's ascending, consecutive threshold
    /// list. The next election is one past the last listed round.
    pub fn load_from_minimum_judge(
        &mut self,
        list: &[MinimumJudgeInfo],
    ) -> Result<(), ConsensusError> {
        let (Some(first), Some(last)) = (list.first(), list.last()) else {
            return Err(ConsensusError::InvalidSnapshot(
                "minimum judge list is empty".into(),
            ));
        };
        if first.round < ROUND_FIRST {
            return Err(ConsensusError::InvalidSnapshot(format!(
                "minimum judge list starts at round {}",
                first.round
            )));
        }
        for pair in list.windows(2) {
            if pair[1].round != pair[0].round + 1 {
                return Err(ConsensusError::InvalidSnapshot(format!(
                    "minimum judge rounds {} and {} are not consecutive",
                    pair[0].round, pair[1].round
                )));
            }
        }

        self.minimum_judge_storage.reset(first.round);
        for info in list {
            self.minimum_judge_storage.add(info.round, *info);
        }
        self.elections.set_round(last.round + 1);
        self.max_round_created = last.round;
        self.update_thresholds();
        tracing::info!(
            first = first.round,
            last = last.round,
            ancient_threshold = self.ancient_threshold,
            "loaded round window"
        );
        Ok(())
    }

    pub fn reset(&mut self) {
        self.elections = RoundElections::new();
        self.minimum_judge_storage.reset(ROUND_FIRST);
        self.max_round_created = ROUND_NEGATIVE_INFINITY;
        self.ancient_threshold = 0;
        self.expired_threshold = 0;
    }

    fn update_thresholds(&mut self) {
        let Some(oldest) = self.minimum_judge_storage.oldest() else {
            self.ancient_threshold = 0;
            self.expired_threshold = 0;
            return;
        };
        self.expired_threshold = oldest.minimum_judge_ancient_threshold;
        let round = self.oldest_non_ancient_round();
        self.ancient_threshold = match self.minimum_judge_storage.get(round) {
            Some(info) => info.minimum_judge_ancient_threshold,
            None => {
                tracing::error!(
                    round,
                    expired_threshold = self.expired_threshold,
                    "no minimum judge entry for the oldest non-ancient round"
                );
                self.expired_threshold
            }
        };
    }

    /// Oldest decided round still inside the non-ancient window, clamped to
    /// what is retained.
    fn oldest_non_ancient_round(&self) -> u64 {
        (self.last_round_decided() + 1)
            .saturating_sub(self.config.rounds_non_ancient)
            .max(self.minimum_judge_storage.min_index())
    }

    /// Events whose indicator is below this are ancient.
    pub fn ancient_threshold(&self) -> u64 {
        self.ancient_threshold
    }

    /// Events whose indicator is below this are expired.
    pub fn expired_threshold(&self) -> u64 {
        self.expired_threshold
    }

    pub fn is_ancient(&self, indicator: u64) -> bool {
        indicator < self.ancient_threshold
    }

    pub fn is_expired(&self, indicator: u64) -> bool {
        indicator < self.expired_threshold
    }

    /// Threshold recorded for a decided round still in the window.
    pub fn minimum_judge_info(&self, round: u64) -> Result<&MinimumJudgeInfo, ConsensusError> {
        self.minimum_judge_storage
            .get(round)
            .ok_or(ConsensusError::RoundOutsideWindow {
                round,
                oldest: self.minimum_judge_storage.min_index(),
                newest: self.last_round_decided(),
            })
    }

    /// Thresholds of every round in the non-ancient window, ascending.
    pub fn minimum_judge_info_list(&self) -> Vec<MinimumJudgeInfo> {
        let from = self.oldest_non_ancient_round();
        self.minimum_judge_storage
            .iter()
            .filter(|(round, _)| *round >= from)
            .map(|(_, info)| *info)
            .collect()
    }

    /// Oldest round still retained.
    pub fn oldest_retained_round(&self) -> Option<u64> {
        self.minimum_judge_storage.oldest().map(|info| info.round)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::add;
    use crate::graph::EventArena;

    fn config(non_ancient: u64, expired: u64) -> ConsensusConfig {
        ConsensusConfig {
            rounds_non_ancient: non_ancient,
            rounds_expired: expired,
            ..Default::default()
        }
    }

    fn witness(arena: &mut EventArena, byte: u8, creator: u64, round: u64) -> EventId {
        let id = add(arena, byte, creator, None, None, 0);
        let node = arena.get_mut(id).unwrap();
        node.round_created = round;
        node.witness = true;
        id
    }

    fn offer(rounds: &mut ConsensusRounds, arena: &mut EventArena, id: EventId) -> WitnessOutcome {
        rounds.new_witness(id, arena.get_mut(id).unwrap(), 0)
    }

    #[test]
    fn fresh_window_has_nothing_ancient() {
        let rounds = ConsensusRounds::new(ConsensusConfig::default());
        assert_eq!(rounds.election_round(), 1);
        assert_eq!(rounds.last_round_decided(), 0);
        assert!(!rounds.is_ancient(0));
        assert!(rounds.minimum_judge_info_list().is_empty());
    }

    #[test]
    fn bootstrap_sets_next_election_and_threshold() {
        let mut rounds = ConsensusRounds::new(config(2, 10));
        let list = [
            MinimumJudgeInfo::new(5, 50),
            MinimumJudgeInfo::new(6, 60),
            MinimumJudgeInfo::new(7, 70),
        ];
        rounds.load_from_minimum_judge(&list).unwrap();

        assert_eq!(rounds.election_round(), 8);
        assert_eq!(rounds.last_round_decided(), 7);
        // 8 - 2 = 6
        assert_eq!(rounds.ancient_threshold(), 60);
        assert_eq!(rounds.expired_threshold(), 50);
        assert!(rounds.is_ancient(59));
        assert!(!rounds.is_ancient(60));
        assert_eq!(
            rounds.minimum_judge_info_list(),
            vec![list[1], list[2]]
        );
    }

    #[test]
    fn bootstrap_rejects_gaps_and_empty_lists() {
        let mut rounds = ConsensusRounds::new(ConsensusConfig::default());
        assert!(matches!(
            rounds.load_from_minimum_judge(&[]),
            Err(ConsensusError::InvalidSnapshot(_))
        ));
        let gapped = [MinimumJudgeInfo::new(5, 1), MinimumJudgeInfo::new(7, 2)];
        assert!(matches!(
            rounds.load_from_minimum_judge(&gapped),
            Err(ConsensusError::InvalidSnapshot(_))
        ));
        assert_eq!(rounds.election_round(), 1);
    }

    #[test]
    fn lookup_outside_window_fails() {
        let mut rounds = ConsensusRounds::new(config(2, 3));
        for i in 1..=6 {
            rounds.current_election_decided(i * 10);
        }
        assert_eq!(rounds.minimum_judge_info(6).unwrap().minimum_judge_ancient_threshold, 60);
        assert_eq!(
            rounds.minimum_judge_info(2),
            Err(ConsensusError::RoundOutsideWindow {
                round: 2,
                oldest: 4,
                newest: 6
            })
        );
        assert!(rounds.minimum_judge_info(7).is_err());
    }

    #[test]
    fn retention_bound_holds() {
        let mut rounds = ConsensusRounds::new(config(3, 5));
        for decided in 1..=40u64 {
            rounds.current_election_decided(decided);
            let oldest = rounds.oldest_retained_round().unwrap();
            assert!(oldest + 5 > decided);
            assert_eq!(rounds.expired_threshold(), oldest);
            assert_eq!(rounds.ancient_threshold(), (decided + 1).saturating_sub(3).max(1));
        }
    }

    #[test]
    fn only_election_round_witnesses_register() {
        let mut arena = EventArena::new();
        let mut rounds = ConsensusRounds::new(ConsensusConfig::default());
        let w1 = witness(&mut arena, 1, 0, 1);
        let w2 = witness(&mut arena, 2, 1, 2);

        assert_eq!(offer(&mut rounds, &mut arena, w1), WitnessOutcome::Registered(0));
        assert_eq!(offer(&mut rounds, &mut arena, w2), WitnessOutcome::Ignored);
        assert!(!arena.get(w2).unwrap().fame_decided);
    }

    #[test]
    fn late_witness_is_not_famous() {
        let mut arena = EventArena::new();
        let mut rounds = ConsensusRounds::new(ConsensusConfig::default());
        rounds.update_max_round(3);
        let late = witness(&mut arena, 1, 0, 1);

        assert_eq!(offer(&mut rounds, &mut arena, late), WitnessOutcome::NotFamous);
        let node = arena.get(late).unwrap();
        assert!(node.fame_decided);
        assert!(!node.famous);
        assert!(rounds.elections().candidates().is_empty());
    }

    #[test]
    fn unknown_creator_is_not_famous() {
        let mut arena = EventArena::new();
        let mut rounds = ConsensusRounds::new(ConsensusConfig::default());
        let id = witness(&mut arena, 1, 9, 1);
        arena.get_mut(id).unwrap().creator_index = None;

        assert_eq!(offer(&mut rounds, &mut arena, id), WitnessOutcome::NotFamous);
    }

    #[test]
    fn recalculating_rebuilds_max_round() {
        let mut rounds = ConsensusRounds::new(ConsensusConfig::default());
        rounds.update_max_round(9);
        rounds.current_election_decided(1);
        rounds.recalculating();
        assert_eq!(rounds.max_round_created(), 1);
        rounds.update_max_round(4);
        assert_eq!(rounds.max_round_created(), 4);
    }

    #[test]
    fn reset_clears_everything() {
        let mut rounds = ConsensusRounds::new(config(1, 2));
        rounds.current_election_decided(4);
        rounds.current_election_decided(5);
        rounds.reset();
        assert_eq!(rounds.election_round(), 1);
        assert_eq!(rounds.ancient_threshold(), 0);
        assert!(rounds.oldest_retained_round().is_none());
    }
}
