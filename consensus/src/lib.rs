//! Consensus — hashgraph virtual voting.
//!
//! Nodes gossip events that each reference a self-parent and an
//! other-parent. From the shape of that graph alone every node computes the
//! same rounds, the same famous witnesses and the same total order:
//! - Events are grouped into rounds; the first event of a creator in a round
//!   is a witness.
//! - Later witnesses vote on the fame of earlier ones, weighted by stake.
//!   A strict supermajority (> 2/3 of weight) decides.
//! - Once all witnesses of a round are decided, its famous witnesses (the
//!   judges) fix the round received, consensus timestamp and order of every
//!   event they all descend from.
//!
//! ## Module overview
//!
//! - [`engine`] — The [`Consensus`] orchestrator.
//! - [`graph`] — Event arena and per-event consensus metadata.
//! - [`metadata`] — Rounds, strongly-seen witnesses and other memoized fields.
//! - [`ancestors`] — Depth-first ancestor search and common ancestors.
//! - [`rounds`] — Election cursor and ancient/expired thresholds.
//! - [`election`] — Fame election for one round.
//! - [`vote`] — Vote tally outcome.
//! - [`ordering`] — Coin, whitening and timestamp spacing.
//! - [`sorter`] — Total order within a decided round.
//! - [`snapshot`] — Restart checkpoints.
//! - [`round`] — Per-round output.
//! - [`ring_buffer`] — Bounded per-round storage.
//! - [`roster`] — Member weights.
//! - [`config`] — Tuning knobs.
//! - [`error`] — Consensus error types.

pub mod ancestors;
pub mod config;
pub mod election;
pub mod engine;
pub mod error;
pub mod graph;
pub mod metadata;
pub mod ordering;
pub mod ring_buffer;
pub mod round;
pub mod rounds;
pub mod roster;
pub mod snapshot;
pub mod sorter;
pub mod vote;

pub use ancestors::{AncestorSearch, CommonAncestors};
pub use config::{AncientMode, ConsensusConfig};
pub use election::{CandidateWitness, RoundElections};
pub use engine::Consensus;
pub use error::ConsensusError;
pub use graph::{EventArena, EventId, EventNode, ROUND_FIRST, ROUND_NEGATIVE_INFINITY};
pub use ordering::{calc_min_timestamp_for_next_event, coin, whitening, MIN_TRANS_TIMESTAMP_INCR_NANOS};
pub use ring_buffer::SequentialRingBuffer;
pub use round::{ConsensusEvent, ConsensusRound, EventWindow};
pub use rounds::{ConsensusRounds, WitnessOutcome};
pub use roster::Roster;
pub use snapshot::{synthetic_snapshot, InitJudges};
pub use sorter::ConsensusSorter;
pub use vote::CountingVote;
