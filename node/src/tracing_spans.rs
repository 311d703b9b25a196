//! Span constructors for the consensus task.
//!
//! Keeping span names and fields in one place makes traces from different
//! nodes easy to filter and correlate.

use tracing::{debug_span, info_span, Span};
use weft_types::{EventHash, NodeId};

/// Span covering the insertion of one event into the engine.
pub fn consensus_event_span(hash: &EventHash, creator: NodeId) -> Span {
    debug_span!("consensus_event", hash = %hash, creator = %creator)
}

/// Span covering the hand-off of one decided round.
pub fn round_decided_span(round: u64, events: usize) -> Span {
    info_span!("round_decided", round, events)
}

/// Span covering a restart from a snapshot.
pub fn snapshot_load_span(round: u64) -> Span {
    info_span!("snapshot_load", round)
}
