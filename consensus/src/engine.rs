//! The consensus orchestrator.
//!
//! [`Consensus`] owns the event arena and every piece of round and election
//! state. It is driven by a single caller: events go in one at a time, in an
//! order where parents precede children, and each call returns the rounds
//! that became decided because of it.

use std::collections::BTreeSet;
use std::sync::Arc;

use weft_types::{ConsensusSnapshot, ConsensusTime, EventData, EventHash, Signature};
use weft_utils::StatsCounter;

use crate::ancestors::{clear_rec_times, AncestorSearch};
use crate::config::ConsensusConfig;
use crate::election::min_judge_indicator;
use crate::error::ConsensusError;
use crate::graph::{EventArena, EventId, EventNode};
use crate::metadata;
use crate::ordering::{calc_min_timestamp_for_next_event, coin, last_transaction_time, whitening};
use crate::round::{ConsensusEvent, ConsensusRound, EventWindow};
use crate::rounds::{ConsensusRounds, WitnessOutcome};
use crate::roster::Roster;
use crate::snapshot::{validate_snapshot, InitJudges};
use crate::sorter::ConsensusSorter;
use crate::vote::CountingVote;

pub const STAT_EVENTS_ADDED: &str = "events_added";
pub const STAT_ROUNDS_DECIDED: &str = "rounds_decided";
pub const STAT_CONSENSUS_EVENTS: &str = "consensus_events";
pub const STAT_COIN_VOTES: &str = "coin_votes";
pub const STAT_FAST_PATH_NOT_FAMOUS: &str = "fast_path_not_famous";
pub const STAT_STALE_EVENTS: &str = "stale_events";

const STAT_NAMES: [&str; 6] = [
    STAT_EVENTS_ADDED,
    STAT_ROUNDS_DECIDED,
    STAT_CONSENSUS_EVENTS,
    STAT_COIN_VOTES,
    STAT_FAST_PATH_NOT_FAMOUS,
    STAT_STALE_EVENTS,
];

pub struct Consensus {
    config: ConsensusConfig,
    roster: Roster,
    arena: EventArena,
    search: AncestorSearch,
    rounds: ConsensusRounds,
    /// Witnesses at or above the election round, in insertion order.
    witnesses: Vec<EventId>,
    /// Events neither consensus nor stale, keyed by ancient indicator.
    pending: BTreeSet<(u64, EventId)>,
    /// Every stored event, keyed by ancient indicator.
    by_indicator: BTreeSet<(u64, EventId)>,
    /// Set while restarting from a snapshot.
    init_judges: Option<InitJudges>,
    num_consensus: u64,
    min_timestamp: Option<ConsensusTime>,
    last_consensus_time: Option<ConsensusTime>,
    /// Events that arrived already ancient, reported with the next round.
    arrived_stale: Vec<Arc<EventData>>,
    stats: StatsCounter,
}

impl Consensus {
    pub fn new(config: ConsensusConfig, roster: Roster) -> Result<Self, ConsensusError> {
        config.validate()?;
        if roster.total_weight() == 0 {
            return Err(ConsensusError::InvalidConfig(
                "roster has no voting weight".into(),
            ));
        }
        Ok(Self {
            rounds: ConsensusRounds::new(config.clone()),
            config,
            roster,
            arena: EventArena::new(),
            search: AncestorSearch::new(),
            witnesses: Vec::new(),
            pending: BTreeSet::new(),
            by_indicator: BTreeSet::new(),
            init_judges: None,
            num_consensus: 0,
            min_timestamp: None,
            last_consensus_time: None,
            arrived_stale: Vec::new(),
            stats: StatsCounter::new(&STAT_NAMES),
        })
    }

    /// Add a validated event whose known parents were already added.
    ///
    /// Returns every round decided as a consequence, oldest first.
    pub fn add_event(&mut self, event: EventData) -> Result<Vec<ConsensusRound>, ConsensusError> {
        let hash = event.hash;
        if self.arena.contains(&hash) {
            return Err(ConsensusError::DuplicateEvent(hash));
        }
        let event = Arc::new(event);
        let indicator = self.config.ancient_mode.indicator(&event);
        let creator_index = self.roster.index_of(event.creator());
        let self_parent = event.self_parent().and_then(|h| self.arena.id_of(h));
        let other_parent = event.other_parent().and_then(|h| self.arena.id_of(h));
        let id = self.arena.insert(EventNode::new(
            Arc::clone(&event),
            creator_index,
            self_parent,
            other_parent,
        ));
        self.by_indicator.insert((indicator, id));
        self.stats.increment(STAT_EVENTS_ADDED);

        let forced_round = self
            .init_judges
            .as_ref()
            .filter(|judges| judges.is_init_judge(&hash))
            .map(|judges| judges.round());
        let round = metadata::compute(&mut self.arena, &self.roster, id, forced_round);
        tracing::trace!(%hash, round, creator = %event.creator(), "event added");

        if forced_round.is_none() && self.rounds.is_ancient(indicator) {
            if let Some(node) = self.arena.get_mut(id) {
                node.stale = true;
            }
            tracing::debug!(%hash, indicator, "event arrived ancient");
            self.stats.increment(STAT_STALE_EVENTS);
            self.arrived_stale.push(event);
            return Ok(Vec::new());
        }
        self.pending.insert((indicator, id));

        let is_witness = self.arena.get(id).is_some_and(|n| n.witness);
        let election_round = self.rounds.election_round();

        if let Some(judges) = self.init_judges.as_mut() {
            if forced_round.is_some() {
                if let Some(node) = self.arena.get_mut(id) {
                    node.witness = true;
                    node.famous = true;
                    node.fame_decided = true;
                    node.judge = true;
                }
                judges.judge_found(&hash, id);
                tracing::debug!(
                    %hash,
                    round,
                    missing = judges.missing_judges(),
                    "snapshot judge found"
                );
            } else if is_witness && round >= election_round {
                self.witnesses.push(id);
            }
            if judges.all_judges_found() {
                return self.finish_bootstrap();
            }
            return Ok(Vec::new());
        }

        if !is_witness || round < election_round {
            return Ok(Vec::new());
        }
        self.witnesses.push(id);
        self.rounds.update_max_round(round);
        if self.process_witness(id) {
            self.decide_rounds()
        } else {
            Ok(Vec::new())
        }
    }

    /// Register or vote with a witness. Returns whether the current
    /// election became decided.
    fn process_witness(&mut self, id: EventId) -> bool {
        let Some(node) = self.arena.get_mut(id) else {
            return false;
        };
        let election_round = self.rounds.election_round();
        if node.round_created > election_round {
            return self.vote(id);
        }
        let indicator = self.config.ancient_mode.indicator(&node.data);
        match self.rounds.new_witness(id, node, indicator) {
            WitnessOutcome::NotFamous => {
                self.stats.increment(STAT_FAST_PATH_NOT_FAMOUS);
                tracing::trace!(?id, round = election_round, "witness decided not famous");
            }
            WitnessOutcome::Registered(index) => {
                tracing::trace!(?id, index, round = election_round, "witness registered");
            }
            WitnessOutcome::Ignored => {}
        }
        false
    }

    /// Cast `voter`'s votes on every candidate of the current election,
    /// deciding candidates where the voter strongly sees a supermajority.
    fn vote(&mut self, voter: EventId) -> bool {
        let arena = &self.arena;
        let Some(node) = arena.get(voter) else {
            return false;
        };
        let diff = node.round_created - self.rounds.election_round();
        let coin_freq = self.config.coin_freq;
        let total_weight = self.roster.total_weight();
        let strongly_seen: Vec<(usize, EventId)> = if diff > 1 {
            (0..self.roster.len())
                .filter_map(|m| metadata::strongly_see_s1(arena, voter, m).map(|w| (m, w)))
                .collect()
        } else {
            Vec::new()
        };

        let candidates = self.rounds.elections().candidates();
        let mut votes = Vec::with_capacity(candidates.len());
        let mut decisions = Vec::new();
        let mut coin_votes = 0;
        for (index, candidate) in candidates.iter().enumerate() {
            if diff == 1 {
                let seen = metadata::first_vote_target(arena, voter, candidate.creator_index);
                votes.push(seen == Some(candidate.id));
                continue;
            }

            let (mut yes, mut no) = (0u64, 0u64);
            for &(m, witness) in &strongly_seen {
                let weight = self.roster.weight_at(m);
                let voted_yes = arena
                    .get(witness)
                    .and_then(|w| w.votes.get(index).copied())
                    .unwrap_or(false);
                if voted_yes {
                    yes += weight;
                } else {
                    no += weight;
                }
            }
            let tally = CountingVote::from_weights(yes, no, total_weight);
            let mut vote = tally.is_famous();
            if diff % coin_freq == 0 {
                if !tally.is_supermajority() {
                    vote = coin_round_vote(diff, coin_freq, &node.data.signature);
                    coin_votes += 1;
                }
            } else if tally.is_supermajority() && !candidate.decided {
                decisions.push((index, candidate.id, vote));
            }
            votes.push(vote);
        }

        if let Some(node) = self.arena.get_mut(voter) {
            node.votes = votes;
        }
        self.stats.add(STAT_COIN_VOTES, coin_votes);
        for (index, id, famous) in decisions {
            if let Some(witness) = self.arena.get_mut(id) {
                self.rounds
                    .elections_mut()
                    .fame_decided(index, famous, witness);
            }
        }
        self.rounds.elections().is_decided()
    }

    /// Decide rounds for as long as elections keep completing.
    fn decide_rounds(&mut self) -> Result<Vec<ConsensusRound>, ConsensusError> {
        let mut decided = Vec::new();
        while self.rounds.elections().is_decided() {
            decided.push(self.round_decided()?);
            self.replay();
        }
        Ok(decided)
    }

    /// Re-run registration and voting for every witness at or above the
    /// election round, in insertion order. Stops early if an election
    /// completes.
    fn replay(&mut self) {
        self.rounds.recalculating();
        let witnesses = self.witnesses.clone();
        for id in witnesses {
            let Some(node) = self.arena.get_mut(id) else {
                continue;
            };
            node.votes.clear();
            let round = node.round_created;
            self.rounds.update_max_round(round);
            if self.process_witness(id) {
                break;
            }
        }
    }

    /// Finalize the round whose election just completed.
    fn round_decided(&mut self) -> Result<ConsensusRound, ConsensusError> {
        let decided_round = self.rounds.election_round();
        let judges = self.rounds.elections().find_all_judges();
        let Some(min_indicator) = min_judge_indicator(&judges) else {
            return Err(ConsensusError::NoJudges(decided_round));
        };
        let judge_weight: u64 = judges
            .iter()
            .map(|j| self.roster.weight_at(j.creator_index))
            .sum();
        if !self.roster.is_super_majority(judge_weight) {
            tracing::warn!(
                round = decided_round,
                judge_weight,
                total_weight = self.roster.total_weight(),
                "judges lack a supermajority of weight"
            );
        }

        self.rounds.current_election_decided(min_indicator);
        let ancient_threshold = self.rounds.ancient_threshold();

        let judge_ids: Vec<EventId> = judges.iter().map(|j| j.id).collect();
        let mut judge_events = Vec::with_capacity(judge_ids.len());
        for &id in &judge_ids {
            if let Some(node) = self.arena.get_mut(id) {
                node.judge = true;
                judge_events.push(Arc::clone(&node.data));
            }
        }
        let whitening = whitening(judge_events.iter().map(|j| &j.signature));

        let mode = self.config.ancient_mode;
        let common = self
            .search
            .common_ancestors_of(&mut self.arena, &judge_ids, |n| {
                !n.consensus && !n.stale && mode.indicator(&n.data) >= ancient_threshold
            });
        for &id in &common.common {
            let Some(node) = self.arena.get_mut(id) else {
                continue;
            };
            let Some(median) = node.rec_times.get(node.rec_times.len() / 2).copied() else {
                return Err(ConsensusError::InvariantViolation(format!(
                    "common ancestor {} has no received times",
                    node.hash()
                )));
            };
            node.consensus_timestamp = Some(median);
            node.round_received = Some(decided_round);
            node.consensus = true;
        }

        let sorter = ConsensusSorter::new(whitening);
        let mut ordered: Vec<(EventId, &EventNode)> = common
            .common
            .iter()
            .filter_map(|&id| self.arena.get(id).map(|n| (id, n)))
            .collect();
        ordered.sort_by(|a, b| sorter.compare(a.1, b.1));
        let ordered: Vec<EventId> = ordered.into_iter().map(|(id, _)| id).collect();

        let mut consensus_events = Vec::with_capacity(ordered.len());
        for id in ordered {
            let Some(node) = self.arena.get_mut(id) else {
                continue;
            };
            let mut timestamp = node.consensus_timestamp.unwrap_or(ConsensusTime::EPOCH);
            if let Some(min) = self.min_timestamp {
                timestamp = timestamp.max(min);
            }
            node.consensus_timestamp = Some(timestamp);
            node.consensus_order = Some(self.num_consensus);
            let last_trans = last_transaction_time(timestamp, node.data.transaction_count());
            self.min_timestamp = Some(calc_min_timestamp_for_next_event(last_trans));
            self.last_consensus_time = Some(last_trans);
            self.pending
                .remove(&(mode.indicator(&node.data), id));
            consensus_events.push(ConsensusEvent {
                event: Arc::clone(&node.data),
                round_created: node.round_created,
                round_received: decided_round,
                consensus_order: self.num_consensus,
                consensus_timestamp: timestamp,
            });
            self.num_consensus += 1;
        }
        clear_rec_times(&mut self.arena, &common.visited);

        let mut stale_events = std::mem::take(&mut self.arrived_stale);
        stale_events.extend(self.mark_stale(ancient_threshold));
        self.expire();

        let election_round = self.rounds.election_round();
        let arena = &self.arena;
        self.witnesses
            .retain(|&id| arena.get(id).is_some_and(|n| n.round_created >= election_round));

        let consensus_timestamp = self.last_consensus_time.unwrap_or_else(|| {
            judge_events
                .iter()
                .map(|j| j.time_created())
                .max()
                .unwrap_or(ConsensusTime::EPOCH)
        });
        let snapshot = ConsensusSnapshot {
            round: decided_round,
            judge_hashes: judge_events.iter().map(|j| j.hash).collect(),
            minimum_judge_info_list: self.rounds.minimum_judge_info_list(),
            next_consensus_number: self.num_consensus,
            consensus_timestamp,
        };

        self.stats.increment(STAT_ROUNDS_DECIDED);
        self.stats
            .add(STAT_CONSENSUS_EVENTS, consensus_events.len() as u64);
        tracing::info!(
            round = decided_round,
            events = consensus_events.len(),
            judges = judge_events.len(),
            stale = stale_events.len(),
            ancient_threshold,
            "round decided"
        );

        Ok(ConsensusRound {
            round: decided_round,
            consensus_events,
            judges: judge_events,
            event_window: self.event_window(),
            snapshot,
            stale_events,
        })
    }

    /// Mark every pending event below the ancient threshold as stale.
    fn mark_stale(&mut self, ancient_threshold: u64) -> Vec<Arc<EventData>> {
        let mut stale = Vec::new();
        while let Some(&(indicator, id)) = self.pending.first() {
            if indicator >= ancient_threshold {
                break;
            }
            self.pending.pop_first();
            if let Some(node) = self.arena.get_mut(id) {
                node.stale = true;
                stale.push(Arc::clone(&node.data));
            }
        }
        self.stats.add(STAT_STALE_EVENTS, stale.len() as u64);
        stale
    }

    /// Drop every event below the expired threshold.
    fn expire(&mut self) {
        let expired_threshold = self.rounds.expired_threshold();
        let mut removed = 0usize;
        while let Some(&(indicator, id)) = self.by_indicator.first() {
            if indicator >= expired_threshold {
                break;
            }
            self.by_indicator.pop_first();
            self.pending.remove(&(indicator, id));
            if self.arena.remove(id).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!(removed, expired_threshold, "expired events removed");
        }
    }

    /// Restart from a checkpoint, discarding all current state.
    ///
    /// The engine then waits for the snapshot's judges to arrive again;
    /// events added meanwhile are stored but not voted on.
    pub fn load_snapshot(&mut self, snapshot: &ConsensusSnapshot) -> Result<(), ConsensusError> {
        validate_snapshot(snapshot)?;
        let mut rounds = ConsensusRounds::new(self.config.clone());
        rounds.load_from_minimum_judge(&snapshot.minimum_judge_info_list)?;

        self.reset();
        self.rounds = rounds;
        self.num_consensus = snapshot.next_consensus_number;
        self.min_timestamp = Some(calc_min_timestamp_for_next_event(
            snapshot.consensus_timestamp,
        ));
        self.last_consensus_time = Some(snapshot.consensus_timestamp);
        self.init_judges = Some(InitJudges::new(
            snapshot.round,
            snapshot.judge_hashes.iter().copied(),
        ));
        tracing::info!(
            round = snapshot.round,
            judges = snapshot.judge_hashes.len(),
            next_consensus_number = snapshot.next_consensus_number,
            "loaded consensus snapshot"
        );
        Ok(())
    }

    /// Leave bootstrapping once every snapshot judge has arrived: their
    /// common ancestors already reached consensus before the snapshot.
    fn finish_bootstrap(&mut self) -> Result<Vec<ConsensusRound>, ConsensusError> {
        let Some(judges) = self.init_judges.take() else {
            return Ok(Vec::new());
        };
        let roots = judges.found().to_vec();
        let common = self
            .search
            .common_ancestors_of(&mut self.arena, &roots, |n| !n.consensus && !n.stale);
        let mode = self.config.ancient_mode;
        for &id in &common.common {
            if let Some(node) = self.arena.get_mut(id) {
                node.consensus = true;
                self.pending.remove(&(mode.indicator(&node.data), id));
            }
        }
        clear_rec_times(&mut self.arena, &common.visited);
        tracing::info!(
            round = judges.round(),
            already_consensus = common.common.len(),
            "snapshot judges resolved, resuming consensus"
        );

        self.replay();
        self.decide_rounds()
    }

    /// Discard every event and all round state.
    pub fn reset(&mut self) {
        self.arena.clear();
        self.rounds.reset();
        self.witnesses.clear();
        self.pending.clear();
        self.by_indicator.clear();
        self.init_judges = None;
        self.num_consensus = 0;
        self.min_timestamp = None;
        self.last_consensus_time = None;
        self.arrived_stale.clear();
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn stats(&self) -> &StatsCounter {
        &self.stats
    }

    pub fn event_window(&self) -> EventWindow {
        EventWindow {
            latest_consensus_round: self.rounds.last_round_decided(),
            ancient_threshold: self.rounds.ancient_threshold(),
            expired_threshold: self.rounds.expired_threshold(),
            ancient_mode: self.config.ancient_mode,
        }
    }

    pub fn last_round_decided(&self) -> u64 {
        self.rounds.last_round_decided()
    }

    pub fn election_round(&self) -> u64 {
        self.rounds.election_round()
    }

    pub fn max_round_created(&self) -> u64 {
        self.rounds.max_round_created()
    }

    pub fn is_bootstrapping(&self) -> bool {
        self.init_judges.is_some()
    }

    pub fn missing_init_judges(&self) -> usize {
        self.init_judges
            .as_ref()
            .map_or(0, |judges| judges.missing_judges())
    }

    /// Consensus order the next event will receive.
    pub fn num_consensus(&self) -> u64 {
        self.num_consensus
    }

    /// Fame of a witness, once decided.
    pub fn fame(&self, hash: &EventHash) -> Option<bool> {
        let node = self.arena.get(self.arena.id_of(hash)?)?;
        node.fame_decided.then_some(node.famous)
    }

    pub fn round_created(&self, hash: &EventHash) -> Option<u64> {
        let id = self.arena.id_of(hash)?;
        self.arena.get(id).map(|n| n.round_created)
    }

    pub fn is_witness(&self, hash: &EventHash) -> Option<bool> {
        let id = self.arena.id_of(hash)?;
        self.arena.get(id).map(|n| n.witness)
    }

    pub fn event_count(&self) -> usize {
        self.arena.len()
    }
}

/// Vote of a witness in a coin round whose tally has no supermajority.
///
/// Every other coin round votes `true`; the rest flip the signature coin.
fn coin_round_vote(diff: u64, coin_freq: u64, signature: &Signature) -> bool {
    if diff % (2 * coin_freq) == coin_freq {
        true
    } else {
        coin(signature)
    }
}
