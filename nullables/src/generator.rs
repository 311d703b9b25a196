//! Seeded gossip-graph generator.
//!
//! Every event is signed with a key derived from the seed, so two generators
//! built from the same seed and weights produce byte-identical graphs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use weft_crypto::{hash_event, keypair_from_seed, sign_event};
use weft_types::{ConsensusTime, EventData, EventHash, HashedEventData, KeyPair, NodeId, PublicKey};

use crate::clock::NullClock;

/// Spacing between consecutive events, in nanoseconds.
const MIN_STEP_NANOS: u64 = 1_000_000;
const MAX_STEP_NANOS: u64 = 10_000_000;

#[derive(Clone, Copy, Debug)]
struct Tip {
    hash: EventHash,
    generation: u64,
}

struct EventSource {
    node: NodeId,
    weight: u64,
    keys: KeyPair,
    /// Every event this source created, oldest first.
    created: Vec<Tip>,
}

/// Builds a random but reproducible event graph.
///
/// Each new event is created by a uniformly chosen member, with that
/// member's latest event as self-parent and another member's latest event as
/// other-parent. An optional forking member sometimes builds on an older
/// event of its own instead.
pub struct GraphGenerator {
    rng: StdRng,
    sources: Vec<EventSource>,
    clock: NullClock,
    forking: Option<(usize, f64)>,
    max_transactions: usize,
}

impl GraphGenerator {
    /// One member per weight, with ids `0..weights.len()`.
    pub fn new(seed: u64, weights: &[u64]) -> Self {
        let sources = weights
            .iter()
            .enumerate()
            .map(|(i, &weight)| {
                let mut key_seed = [0u8; 32];
                key_seed[..8].copy_from_slice(&seed.to_le_bytes());
                key_seed[8..16].copy_from_slice(&(i as u64).to_le_bytes());
                EventSource {
                    node: NodeId(i as u64),
                    weight,
                    keys: keypair_from_seed(&key_seed),
                    created: Vec::new(),
                }
            })
            .collect();
        Self {
            rng: StdRng::seed_from_u64(seed),
            sources,
            clock: NullClock::new(ConsensusTime::from_millis(1_000)),
            forking: None,
            max_transactions: 0,
        }
    }

    /// `count` members of weight 1.
    pub fn with_equal_weights(seed: u64, count: usize) -> Self {
        Self::new(seed, &vec![1; count])
    }

    /// Let member `index` fork with the given probability per event.
    pub fn with_forking_node(mut self, index: usize, probability: f64) -> Self {
        self.forking = Some((index, probability.clamp(0.0, 1.0)));
        self
    }

    /// Attach up to `max` random transactions to each event.
    pub fn with_max_transactions(mut self, max: usize) -> Self {
        self.max_transactions = max;
        self
    }

    /// `(node, weight)` for every member, for building a roster.
    pub fn members(&self) -> Vec<(NodeId, u64)> {
        self.sources.iter().map(|s| (s.node, s.weight)).collect()
    }

    pub fn public_key(&self, node: NodeId) -> Option<&PublicKey> {
        self.sources
            .iter()
            .find(|s| s.node == node)
            .map(|s| &s.keys.public)
    }

    pub fn generate(&mut self, count: usize) -> Vec<EventData> {
        (0..count).map(|_| self.next_event()).collect()
    }

    pub fn next_event(&mut self) -> EventData {
        let n = self.sources.len();
        let creator = self.rng.gen_range(0..n);

        let own = &self.sources[creator].created;
        let self_parent = match self.forking {
            Some((index, probability))
                if index == creator && own.len() >= 2 && self.rng.gen_bool(probability) =>
            {
                Some(own[self.rng.gen_range(0..own.len() - 1)])
            }
            _ => own.last().copied(),
        };

        let others: Vec<usize> = (0..n)
            .filter(|&i| i != creator && !self.sources[i].created.is_empty())
            .collect();
        let other_parent = if others.is_empty() {
            None
        } else {
            let pick = others[self.rng.gen_range(0..others.len())];
            self.sources[pick].created.last().copied()
        };

        let generation = self_parent
            .iter()
            .chain(other_parent.iter())
            .map(|tip| tip.generation)
            .max()
            .map_or(0, |max| max + 1);
        self.clock
            .advance(self.rng.gen_range(MIN_STEP_NANOS..=MAX_STEP_NANOS));
        let transaction_count = self.rng.gen_range(0..=self.max_transactions);
        let transactions = (0..transaction_count)
            .map(|_| self.rng.gen::<[u8; 8]>().to_vec())
            .collect();

        let hashed = HashedEventData {
            creator: self.sources[creator].node,
            generation,
            birth_round: 1 + generation / (2 * n as u64),
            self_parent: self_parent.map(|tip| tip.hash),
            other_parent: other_parent.map(|tip| tip.hash),
            time_created: self.clock.now(),
            transactions,
        };
        let hash = hash_event(&hashed);
        let source = &mut self.sources[creator];
        let signature = sign_event(&hash, &source.keys.private);
        source.created.push(Tip { hash, generation });
        EventData {
            hashed,
            hash,
            signature,
        }
    }
}
