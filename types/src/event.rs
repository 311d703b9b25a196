//! Gossiped events — the vertices of the hashgraph.

use serde::{Deserialize, Serialize};

use crate::hash::EventHash;
use crate::keys::Signature;
use crate::node::NodeId;
use crate::time::ConsensusTime;

/// The part of an event covered by its hash and signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashedEventData {
    pub creator: NodeId,
    /// `max(parent generations) + 1`, or 0 for an event with no parents.
    pub generation: u64,
    /// Round the creator believed current when it created the event.
    pub birth_round: u64,
    pub self_parent: Option<EventHash>,
    pub other_parent: Option<EventHash>,
    /// Creation time claimed by the creator.
    pub time_created: ConsensusTime,
    /// Opaque application transactions.
    pub transactions: Vec<Vec<u8>>,
}

/// A validated event as handed to consensus by the ingestion pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData {
    pub hashed: HashedEventData,
    pub hash: EventHash,
    pub signature: Signature,
}

impl HashedEventData {
    /// Whether the event declares at least one parent.
    pub fn has_parents(&self) -> bool {
        self.self_parent.is_some() || self.other_parent.is_some()
    }
}

impl EventData {
    pub fn creator(&self) -> NodeId {
        self.hashed.creator
    }

    pub fn generation(&self) -> u64 {
        self.hashed.generation
    }

    pub fn birth_round(&self) -> u64 {
        self.hashed.birth_round
    }

    pub fn time_created(&self) -> ConsensusTime {
        self.hashed.time_created
    }

    pub fn self_parent(&self) -> Option<&EventHash> {
        self.hashed.self_parent.as_ref()
    }

    pub fn other_parent(&self) -> Option<&EventHash> {
        self.hashed.other_parent.as_ref()
    }

    pub fn transaction_count(&self) -> usize {
        self.hashed.transactions.len()
    }
}
