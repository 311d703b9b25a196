//! Weft node host.
//!
//! Runs the consensus engine the way a node would:
//! - Loads a TOML [`NodeConfig`] and initialises logging
//! - Owns the engine on a single tokio task fed by a bounded queue
//! - Publishes decided rounds, the event window and snapshots
//! - Exports Prometheus metrics

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod shutdown;
pub mod snapshot_store;
pub mod task;
pub mod tracing_spans;

pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::ConsensusMetrics;
pub use shutdown::ShutdownController;
pub use snapshot_store::{InMemorySnapshotStore, SnapshotStore};
pub use task::{ConsensusHandle, ConsensusInput, ConsensusJoin, ConsensusTask, SpawnedConsensus, TaskOutcome};
