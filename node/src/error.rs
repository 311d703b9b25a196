use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("consensus error: {0}")]
    Consensus(#[from] weft_consensus::ConsensusError),

    #[error("config error: {0}")]
    Config(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("snapshot store error: {0}")]
    SnapshotStore(String),

    #[error("consensus task is no longer running")]
    TaskStopped,

    #[error("consensus task panicked: {0}")]
    TaskPanicked(String),

    #[error("logging already initialised: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
