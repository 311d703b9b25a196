//! Fundamental types for the weft hashgraph consensus engine.
//!
//! This crate defines the plain data shared across every other crate in the
//! workspace: event hashes, creator ids, consensus timestamps, signatures,
//! gossiped events, and the snapshot checkpoint emitted per decided round.

pub mod error;
pub mod event;
pub mod hash;
pub mod keys;
pub mod node;
pub mod snapshot;
pub mod time;

pub use error::TypesError;
pub use event::{EventData, HashedEventData};
pub use hash::EventHash;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use node::NodeId;
pub use snapshot::{ConsensusSnapshot, MinimumJudgeInfo};
pub use time::ConsensusTime;
