//! The consensus task: one tokio task owns the engine.
//!
//! Producers hold the single [`ConsensusHandle`] and push inputs through a
//! bounded queue, so a slow engine pushes back on gossip instead of growing
//! memory. Decided rounds come out of an mpsc channel in order, and the
//! latest [`EventWindow`] is published on a watch channel for gossip to poll.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use weft_consensus::{Consensus, ConsensusError, ConsensusRound, EventWindow};
use weft_types::{ConsensusSnapshot, EventData};

use crate::metrics::ConsensusMetrics;
use crate::snapshot_store::SnapshotStore;
use crate::tracing_spans::{consensus_event_span, round_decided_span, snapshot_load_span};
use crate::NodeError;

/// Work for the consensus task.
#[derive(Debug)]
pub enum ConsensusInput {
    /// A validated event whose parents were already submitted.
    Event(EventData),
    /// Discard all state and restart from a checkpoint.
    LoadSnapshot(ConsensusSnapshot),
}

/// The producer side of the consensus task. Not `Clone`: the queue has a
/// single producer.
pub struct ConsensusHandle {
    inputs: mpsc::Sender<ConsensusInput>,
    window: watch::Receiver<EventWindow>,
}

impl ConsensusHandle {
    /// Queue an event, waiting while the queue is full.
    pub async fn submit_event(&self, event: EventData) -> Result<(), NodeError> {
        self.submit(ConsensusInput::Event(event)).await
    }

    pub async fn load_snapshot(&self, snapshot: ConsensusSnapshot) -> Result<(), NodeError> {
        self.submit(ConsensusInput::LoadSnapshot(snapshot)).await
    }

    async fn submit(&self, input: ConsensusInput) -> Result<(), NodeError> {
        self.inputs
            .send(input)
            .await
            .map_err(|_| NodeError::TaskStopped)
    }

    /// The most recently published event window.
    pub fn event_window(&self) -> EventWindow {
        *self.window.borrow()
    }

    pub fn watch_event_window(&self) -> watch::Receiver<EventWindow> {
        self.window.clone()
    }
}

/// What the task hands back when it stops cleanly.
pub struct TaskOutcome<S> {
    pub consensus: Consensus,
    pub store: S,
}

/// Everything a caller needs after [`ConsensusTask::spawn`].
pub struct SpawnedConsensus<S> {
    pub handle: ConsensusHandle,
    pub rounds: mpsc::Receiver<ConsensusRound>,
    pub task: ConsensusJoin<S>,
}

pub struct ConsensusJoin<S> {
    join: JoinHandle<Result<TaskOutcome<S>, NodeError>>,
}

impl<S> ConsensusJoin<S> {
    /// Wait for the task to stop. An engine error that stopped it is
    /// returned here.
    pub async fn wait(self) -> Result<TaskOutcome<S>, NodeError> {
        self.join
            .await
            .map_err(|e| NodeError::TaskPanicked(e.to_string()))?
    }
}

pub struct ConsensusTask<S> {
    consensus: Consensus,
    store: S,
    metrics: Option<Arc<ConsensusMetrics>>,
    inputs: mpsc::Receiver<ConsensusInput>,
    rounds: mpsc::Sender<ConsensusRound>,
    output_closed: bool,
    window: watch::Sender<EventWindow>,
    shutdown: broadcast::Receiver<()>,
}

impl<S: SnapshotStore + 'static> ConsensusTask<S> {
    /// Move `consensus` onto a new task. `queue_capacity` bounds both the
    /// input queue and the decided-round channel.
    ///
    /// The task stops when `shutdown` fires, when its sender is dropped, or
    /// when the [`ConsensusHandle`] is dropped and the queue drained.
    pub fn spawn(
        consensus: Consensus,
        store: S,
        metrics: Option<Arc<ConsensusMetrics>>,
        queue_capacity: usize,
        shutdown: broadcast::Receiver<()>,
    ) -> SpawnedConsensus<S> {
        let capacity = queue_capacity.max(1);
        let (input_tx, input_rx) = mpsc::channel(capacity);
        let (round_tx, round_rx) = mpsc::channel(capacity);
        let (window_tx, window_rx) = watch::channel(consensus.event_window());

        let task = Self {
            consensus,
            store,
            metrics,
            inputs: input_rx,
            rounds: round_tx,
            output_closed: false,
            window: window_tx,
            shutdown,
        };
        let join = tokio::spawn(task.run());

        SpawnedConsensus {
            handle: ConsensusHandle {
                inputs: input_tx,
                window: window_rx,
            },
            rounds: round_rx,
            task: ConsensusJoin { join },
        }
    }

    async fn run(mut self) -> Result<TaskOutcome<S>, NodeError> {
        tracing::info!("consensus task started");
        loop {
            let input = tokio::select! {
                biased;
                _ = self.shutdown.recv() => {
                    tracing::info!("consensus task shutting down");
                    break;
                }
                input = self.inputs.recv() => match input {
                    Some(input) => input,
                    None => {
                        tracing::info!("consensus input closed, stopping task");
                        break;
                    }
                },
            };
            if let Some(metrics) = &self.metrics {
                metrics.queue_depth.set(self.inputs.len() as i64);
            }
            if let Err(e) = self.handle(input).await {
                tracing::error!(error = %e, "consensus task stopped by error");
                return Err(e);
            }
        }
        Ok(TaskOutcome {
            consensus: self.consensus,
            store: self.store,
        })
    }

    async fn handle(&mut self, input: ConsensusInput) -> Result<(), NodeError> {
        match input {
            ConsensusInput::Event(event) => {
                let span = consensus_event_span(&event.hash, event.creator());
                let result = span.in_scope(|| self.consensus.add_event(event));
                match result {
                    Ok(decided) => {
                        if let Some(metrics) = &self.metrics {
                            metrics.events_added.inc();
                        }
                        self.publish(decided).await
                    }
                    Err(ConsensusError::DuplicateEvent(hash)) => {
                        tracing::warn!(%hash, "ignoring duplicate event");
                        if let Some(metrics) = &self.metrics {
                            metrics.duplicate_events.inc();
                        }
                        Ok(())
                    }
                    Err(e) => Err(e.into()),
                }
            }
            ConsensusInput::LoadSnapshot(snapshot) => {
                snapshot_load_span(snapshot.round)
                    .in_scope(|| self.consensus.load_snapshot(&snapshot))?;
                self.window.send_replace(self.consensus.event_window());
                Ok(())
            }
        }
    }

    async fn publish(&mut self, decided: Vec<ConsensusRound>) -> Result<(), NodeError> {
        for round in decided {
            round_decided_span(round.round, round.consensus_events.len()).in_scope(|| {
                if let Some(metrics) = &self.metrics {
                    metrics.record_round(&round);
                }
                self.store.save(&round.snapshot)
            })?;
            self.window.send_replace(round.event_window);
            if self.output_closed {
                continue;
            }
            if self.rounds.send(round).await.is_err() {
                tracing::warn!("decided-round receiver dropped, rounds are no longer delivered");
                self.output_closed = true;
            }
        }
        Ok(())
    }
}
