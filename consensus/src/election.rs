//! Fame election for the witnesses of a single round.
//!
//! Elections run strictly one round at a time. Witnesses of the round under
//! election are registered as candidates; each candidate moves from
//! undecided to decided exactly once, famous or not, and the round is
//! decided once every registered candidate is.

use weft_types::{EventHash, NodeId};

use crate::graph::{EventId, EventNode, ROUND_FIRST};

/// A witness registered for election.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateWitness {
    pub id: EventId,
    pub hash: EventHash,
    pub creator: NodeId,
    pub creator_index: usize,
    /// Generation or birth round, per the configured ancient mode.
    pub ancient_indicator: u64,
    pub decided: bool,
    pub famous: bool,
}

impl CandidateWitness {
    pub fn new(
        id: EventId,
        hash: EventHash,
        creator: NodeId,
        creator_index: usize,
        ancient_indicator: u64,
    ) -> Self {
        Self {
            id,
            hash,
            creator,
            creator_index,
            ancient_indicator,
            decided: false,
            famous: false,
        }
    }
}

/// Election state of the round currently being decided.
#[derive(Clone, Debug)]
pub struct RoundElections {
    round: u64,
    candidates: Vec<CandidateWitness>,
    /// Candidates whose fame is still unknown.
    num_unknown_fame: usize,
}

impl RoundElections {
    pub fn new() -> Self {
        Self {
            round: ROUND_FIRST,
            candidates: Vec::new(),
            num_unknown_fame: 0,
        }
    }

    /// The round under election.
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Jump to `round`, discarding any candidates.
    pub fn set_round(&mut self, round: u64) {
        self.round = round;
        self.candidates.clear();
        self.num_unknown_fame = 0;
    }

    /// Register a witness of the current round. Returns its candidate index.
    pub fn add_witness(&mut self, candidate: CandidateWitness) -> usize {
        self.candidates.push(candidate);
        self.num_unknown_fame += 1;
        self.candidates.len() - 1
    }

    pub fn candidates(&self) -> &[CandidateWitness] {
        &self.candidates
    }

    pub fn num_unknown_fame(&self) -> usize {
        self.num_unknown_fame
    }

    /// At least one candidate, and all of them decided.
    pub fn is_decided(&self) -> bool {
        !self.candidates.is_empty() && self.num_unknown_fame == 0
    }

    /// Decide a candidate, marking the witness itself as well.
    ///
    /// This is the only way a registered candidate becomes decided. Each
    /// candidate must be decided at most once; a second call would
    /// double-decrement the undecided count.
    pub fn fame_decided(&mut self, index: usize, famous: bool, witness: &mut EventNode) {
        let Some(candidate) = self.candidates.get_mut(index) else {
            tracing::error!(index, round = self.round, "fame decided for unknown candidate");
            return;
        };
        candidate.decided = true;
        candidate.famous = famous;
        witness.fame_decided = true;
        witness.famous = famous;
        self.num_unknown_fame -= 1;
        tracing::trace!(
            round = self.round,
            hash = %candidate.hash,
            famous,
            remaining = self.num_unknown_fame,
            "fame decided"
        );
    }

    /// One famous witness per creator, ordered by creator. When a creator
    /// forked and has several famous witnesses, the one with the smaller
    /// hash wins.
    pub fn find_all_judges(&self) -> Vec<CandidateWitness> {
        let mut judges: Vec<CandidateWitness> = Vec::new();
        for candidate in self.candidates.iter().filter(|c| c.decided && c.famous) {
            match judges.iter_mut().find(|j| j.creator == candidate.creator) {
                Some(existing) if candidate.hash < existing.hash => *existing = candidate.clone(),
                Some(_) => {}
                None => judges.push(candidate.clone()),
            }
        }
        judges.sort_by_key(|j| j.creator);
        judges
    }

    /// Advance to the next round once this one is decided.
    pub fn start_new_election(&mut self) {
        self.set_round(self.round + 1);
    }
}

impl Default for RoundElections {
    fn default() -> Self {
        Self::new()
    }
}

/// Minimum ancient indicator across a set of judges.
pub fn min_judge_indicator(judges: &[CandidateWitness]) -> Option<u64> {
    judges.iter().map(|j| j.ancient_indicator).min()
}
