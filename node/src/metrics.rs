//! Prometheus metrics for the consensus task.
//!
//! [`ConsensusMetrics`] owns a dedicated [`Registry`]; [`ConsensusMetrics::encode`]
//! renders it in the Prometheus text exposition format for whatever
//! endpoint the host exposes.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge,
    Opts, Registry, TextEncoder,
};
use weft_consensus::ConsensusRound;

use crate::NodeError;

pub struct ConsensusMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Events accepted by the engine.
    pub events_added: IntCounter,
    /// Events rejected because they were already known.
    pub duplicate_events: IntCounter,
    pub rounds_decided: IntCounter,
    /// Events that reached consensus.
    pub consensus_events: IntCounter,
    /// Events that became ancient without reaching consensus.
    pub stale_events: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub latest_decided_round: IntGauge,
    pub ancient_threshold: IntGauge,
    /// Inputs waiting in the consensus task's queue.
    pub queue_depth: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Number of events ordered per decided round.
    pub round_size: Histogram,
}

impl ConsensusMetrics {
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();

        let events_added = register_int_counter_with_registry!(
            Opts::new("weft_events_added_total", "Events added to the consensus engine"),
            registry
        )?;
        let duplicate_events = register_int_counter_with_registry!(
            Opts::new("weft_duplicate_events_total", "Duplicate events ignored"),
            registry
        )?;
        let rounds_decided = register_int_counter_with_registry!(
            Opts::new("weft_rounds_decided_total", "Rounds decided"),
            registry
        )?;
        let consensus_events = register_int_counter_with_registry!(
            Opts::new("weft_consensus_events_total", "Events that reached consensus"),
            registry
        )?;
        let stale_events = register_int_counter_with_registry!(
            Opts::new(
                "weft_stale_events_total",
                "Events that became ancient without reaching consensus"
            ),
            registry
        )?;

        let latest_decided_round = register_int_gauge_with_registry!(
            Opts::new("weft_latest_decided_round", "Latest decided round"),
            registry
        )?;
        let ancient_threshold = register_int_gauge_with_registry!(
            Opts::new("weft_ancient_threshold", "Current ancient threshold"),
            registry
        )?;
        let queue_depth = register_int_gauge_with_registry!(
            Opts::new("weft_queue_depth", "Inputs waiting for the consensus task"),
            registry
        )?;

        // 1 → ~16k events per round.
        let round_size = register_histogram_with_registry!(
            HistogramOpts::new("weft_round_size_events", "Events ordered per decided round")
                .buckets(prometheus::exponential_buckets(1.0, 2.0, 15)?),
            registry
        )?;

        Ok(Self {
            registry,
            events_added,
            duplicate_events,
            rounds_decided,
            consensus_events,
            stale_events,
            latest_decided_round,
            ancient_threshold,
            queue_depth,
            round_size,
        })
    }

    pub fn record_round(&self, round: &ConsensusRound) {
        self.rounds_decided.inc();
        self.consensus_events
            .inc_by(round.consensus_events.len() as u64);
        self.stale_events.inc_by(round.stale_events.len() as u64);
        self.latest_decided_round.set(clamp_i64(round.round));
        self.ancient_threshold
            .set(clamp_i64(round.event_window.ancient_threshold));
        self.round_size.observe(round.consensus_events.len() as f64);
    }

    /// Render every metric in the text exposition format.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| NodeError::Metrics(prometheus::Error::Msg(e.to_string())))
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
