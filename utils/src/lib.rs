//! Shared utilities for the weft workspace.

pub mod logging;
pub mod stats;

pub use logging::init_tracing;
pub use stats::StatsCounter;
