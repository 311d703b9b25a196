//! Nullable infrastructure for deterministic testing.
//!
//! Everything here is driven by an explicit seed or an explicit clock:
//! - [`GraphGenerator`] builds signed gossip graphs, optionally with a
//!   forking member.
//! - [`shuffle_topologically`] re-orders a graph the way a different gossip
//!   schedule would deliver it.
//! - [`NullClock`] only advances when told to.
//!
//! Usage: feed generated events to the engine in tests and benchmarks.

pub mod clock;
pub mod generator;
pub mod shuffle;

pub use clock::NullClock;
pub use generator::GraphGenerator;
pub use shuffle::shuffle_topologically;
