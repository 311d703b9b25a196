use thiserror::Error;
use weft_types::EventHash;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("event {0} was already added")]
    DuplicateEvent(EventHash),

    #[error("round {round} is outside the retained window [{oldest}, {newest}]")]
    RoundOutsideWindow { round: u64, oldest: u64, newest: u64 },

    #[error("round {0} was decided without a single famous witness")]
    NoJudges(u64),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("consensus invariant violated: {0}")]
    InvariantViolation(String),
}
