//! Append-only event arena.
//!
//! Events are stored in insertion order and addressed by [`EventId`], a
//! monotonically increasing sequence number. Parents are referenced by id,
//! never by an owning handle, so there are no ownership cycles and expired
//! events can be dropped individually. A lookup of a removed id yields
//! `None`, which the algorithms treat exactly like a parent that never
//! arrived.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use weft_types::{ConsensusTime, EventData, EventHash};

/// Sentinel round for events whose declared parents are all unknown.
pub const ROUND_NEGATIVE_INFINITY: u64 = 0;

/// The first round.
pub const ROUND_FIRST: u64 = 1;

/// Stable identifier of an event inside one [`EventArena`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(u64);

impl EventId {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An event plus all consensus metadata computed for it.
#[derive(Clone, Debug)]
pub struct EventNode {
    pub data: Arc<EventData>,
    /// Roster index of the creator, `None` for a creator outside the roster.
    pub creator_index: Option<usize>,
    pub self_parent: Option<EventId>,
    pub other_parent: Option<EventId>,

    /// Write-once; `ROUND_NEGATIVE_INFINITY` until computed.
    pub round_created: u64,
    /// Max of the parents' rounds.
    pub parent_round: u64,
    pub witness: bool,
    pub fame_decided: bool,
    pub famous: bool,
    pub judge: bool,
    pub consensus: bool,
    pub stale: bool,

    /// Per roster member: the latest event by that member this event can see.
    pub last_see: Vec<Option<EventId>>,
    /// Per roster member: the witness in `parent_round` this event strongly sees.
    pub strongly_see_p: Vec<Option<EventId>>,
    /// The witness self-ancestor in the same round (possibly this event).
    pub first_self_witness: Option<EventId>,
    /// The earliest witness ancestor in the same round (possibly this event).
    pub first_witness: Option<EventId>,

    /// Votes cast by this witness in the current election, by candidate index.
    pub votes: Vec<bool>,
    /// Visited mark of the ancestor search.
    pub mark: u64,
    /// Times at which judges of the round being decided first reached this event.
    pub rec_times: Vec<ConsensusTime>,

    pub round_received: Option<u64>,
    pub consensus_order: Option<u64>,
    pub consensus_timestamp: Option<ConsensusTime>,
}

impl EventNode {
    pub fn new(
        data: Arc<EventData>,
        creator_index: Option<usize>,
        self_parent: Option<EventId>,
        other_parent: Option<EventId>,
    ) -> Self {
        Self {
            data,
            creator_index,
            self_parent,
            other_parent,
            round_created: ROUND_NEGATIVE_INFINITY,
            parent_round: ROUND_NEGATIVE_INFINITY,
            witness: false,
            fame_decided: false,
            famous: false,
            judge: false,
            consensus: false,
            stale: false,
            last_see: Vec::new(),
            strongly_see_p: Vec::new(),
            first_self_witness: None,
            first_witness: None,
            votes: Vec::new(),
            mark: 0,
            rec_times: Vec::new(),
            round_received: None,
            consensus_order: None,
            consensus_timestamp: None,
        }
    }

    pub fn hash(&self) -> &EventHash {
        &self.data.hash
    }

    pub fn generation(&self) -> u64 {
        self.data.generation()
    }

    pub fn time_created(&self) -> ConsensusTime {
        self.data.time_created()
    }
}

/// Arena of events keyed by insertion sequence.
pub struct EventArena {
    /// Sequence number of `slots[0]`.
    base: u64,
    slots: VecDeque<Option<EventNode>>,
    by_hash: HashMap<EventHash, EventId>,
}

impl EventArena {
    pub fn new() -> Self {
        Self {
            base: 0,
            slots: VecDeque::new(),
            by_hash: HashMap::new(),
        }
    }

    /// The id the next inserted event will receive.
    pub fn next_id(&self) -> EventId {
        EventId(self.base + self.slots.len() as u64)
    }

    pub fn insert(&mut self, node: EventNode) -> EventId {
        let id = self.next_id();
        self.by_hash.insert(node.data.hash, id);
        self.slots.push_back(Some(node));
        id
    }

    pub fn id_of(&self, hash: &EventHash) -> Option<EventId> {
        self.by_hash.get(hash).copied()
    }

    pub fn contains(&self, hash: &EventHash) -> bool {
        self.by_hash.contains_key(hash)
    }

    fn slot(&self, id: EventId) -> Option<usize> {
        id.0.checked_sub(self.base).map(|offset| offset as usize)
    }

    pub fn get(&self, id: EventId) -> Option<&EventNode> {
        self.slot(id)
            .and_then(|i| self.slots.get(i))
            .and_then(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, id: EventId) -> Option<&mut EventNode> {
        let i = self.slot(id)?;
        self.slots.get_mut(i).and_then(|s| s.as_mut())
    }

    /// Look up an optional id; `None` in, `None` out.
    pub fn resolve(&self, id: Option<EventId>) -> Option<&EventNode> {
        id.and_then(|id| self.get(id))
    }

    /// Remove an event. Leading empty slots are compacted away.
    pub fn remove(&mut self, id: EventId) -> Option<EventNode> {
        let i = self.slot(id)?;
        let node = self.slots.get_mut(i)?.take()?;
        self.by_hash.remove(&node.data.hash);
        while matches!(self.slots.front(), Some(None)) {
            self.slots.pop_front();
            self.base += 1;
        }
        Some(node)
    }

    /// Live ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = EventId> + '_ {
        let base = self.base;
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(move |(i, _)| EventId(base + i as u64))
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    /// Drop every event. Ids keep increasing so stale ids never alias.
    pub fn clear(&mut self) {
        self.base += self.slots.len() as u64;
        self.slots.clear();
        self.by_hash.clear();
    }
}

impl Default for EventArena {
    fn default() -> Self {
        Self::new()
    }
}
