//! Core Limbic System implementation
//!
//! The LimbicSystem owns the state engine and wires the three concurrent
//! activities around it:
//! - the sampling loop (metrics -> arbitration)
//! - the blink loop (per-expression blink schedule)
//! - the ingest consumer (OS events -> temporary expressions)
//!
//! Renderers subscribe through [`StateEngine::subscribe`] and call
//! [`StateEngine::render_state`] when woken.

use crate::blink::BlinkScheduler;
use crate::engine::StateEngine;
use crate::heartbeat::HeartbeatConfig;
use crate::ingest::{ingest_channel, IngestHandle, IngestQueue, INGEST_QUEUE_CAPACITY};
use crate::lifeline::Lifeline;
use crate::sampling::spawn_sampling;
use emotask_core::{BlinkTable, MetricSampler};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Handles of the running loops.
pub struct LimbicTasks {
    pub sampling: JoinHandle<()>,
    pub blink: JoinHandle<()>,
    pub ingest: JoinHandle<()>,
}

impl LimbicTasks {
    /// Wait for every loop to finish (after [`LimbicSystem::shutdown`]).
    pub async fn join(self) {
        for (name, handle) in [
            ("sampling", self.sampling),
            ("blink", self.blink),
            ("ingest", self.ingest),
        ] {
            if let Err(e) = handle.await {
                tracing::error!("{} loop ended abnormally: {}", name, e);
            }
        }
    }
}

/// The face's System 1: fast, non-verbal, always running.
pub struct LimbicSystem {
    engine: Arc<StateEngine>,
    heartbeat: HeartbeatConfig,
    lifeline: Lifeline,
    ingest: IngestHandle,
    queue: Option<IngestQueue>,
}

impl LimbicSystem {
    /// Create a limbic system with the reference cadence
    pub fn new() -> Self {
        Self::with_config(HeartbeatConfig::default())
    }

    /// Create with custom cadence
    pub fn with_config(heartbeat: HeartbeatConfig) -> Self {
        let lifeline = Lifeline::new();
        let (ingest, queue) = ingest_channel(INGEST_QUEUE_CAPACITY, lifeline.clone());
        Self {
            engine: Arc::new(StateEngine::new()),
            heartbeat,
            lifeline,
            ingest,
            queue: Some(queue),
        }
    }

    pub fn engine(&self) -> Arc<StateEngine> {
        Arc::clone(&self.engine)
    }

    /// Sender for event sources and OS callbacks.
    pub fn ingest(&self) -> IngestHandle {
        self.ingest.clone()
    }

    pub fn lifeline(&self) -> Lifeline {
        self.lifeline.clone()
    }

    /// Spawn the sampling, blink and ingest loops. Can only be done once.
    pub fn start<S>(&mut self, sampler: S, blink_table: BlinkTable) -> anyhow::Result<LimbicTasks>
    where
        S: MetricSampler + 'static,
    {
        let queue = self
            .queue
            .take()
            .ok_or_else(|| anyhow::anyhow!("Limbic system already started"))?;

        tracing::info!(
            "Starting limbic loops (sample every {:?}, blink check every {:?}, {} blinking faces)",
            self.heartbeat.sample_interval,
            self.heartbeat.blink_tick,
            blink_table.len()
        );

        let sampling = spawn_sampling(
            self.engine(),
            sampler,
            self.heartbeat.sample_interval,
            self.lifeline(),
        );
        let blink = BlinkScheduler::new(self.engine(), blink_table)
            .spawn(self.heartbeat.blink_tick, self.lifeline());
        let ingest = queue.spawn(self.engine(), self.lifeline());

        Ok(LimbicTasks {
            sampling,
            blink,
            ingest,
        })
    }

    /// Cut the lifeline. The ingest queue refuses new events from here on
    /// and every loop exits at its next check.
    pub fn shutdown(&self) {
        tracing::info!("Limbic system shutting down");
        self.lifeline.kill();
    }
}

impl Default for LimbicSystem {
    fn default() -> Self {
        Self::new()
    }
}
