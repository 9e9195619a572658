//! Event ingest
//!
//! OS callbacks run on threads the engine doesn't own. They don't take the
//! engine lock themselves: they drop an [`IngestEvent`] into a bounded queue
//! and a single consumer task applies it under the engine's exclusion.

use crate::engine::StateEngine;
use crate::lifeline::Lifeline;
use anyhow::Result;
use emotask_core::EmotionalState;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

/// Default queue depth. Events are idempotent-ish (same face, fresh window),
/// so a burst beyond this is safe to drop.
pub const INGEST_QUEUE_CAPACITY: usize = 64;

/// Something happened outside that deserves a reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestEvent {
    /// A device was plugged in or removed.
    DeviceChanged,
    /// An application logged an error.
    ApplicationError,
    /// Show this expression directly.
    Transient(EmotionalState),
}

impl IngestEvent {
    pub fn expression(&self) -> EmotionalState {
        match self {
            IngestEvent::DeviceChanged => EmotionalState::Surprised,
            IngestEvent::ApplicationError => EmotionalState::Grimace,
            IngestEvent::Transient(state) => *state,
        }
    }
}

/// Cloneable, non-blocking sender handed to event sources.
#[derive(Debug, Clone)]
pub struct IngestHandle {
    tx: mpsc::Sender<IngestEvent>,
    lifeline: Lifeline,
}

impl IngestHandle {
    /// Enqueue without blocking. A full queue drops the event; a closed
    /// queue (engine shut down) is an error.
    pub fn notify(&self, event: IngestEvent) -> Result<()> {
        if !self.lifeline.is_alive() {
            anyhow::bail!("Ingest queue closed");
        }
        match self.tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(event)) => {
                tracing::warn!("Ingest queue full, dropping {:?}", event);
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(anyhow::anyhow!("Ingest queue closed")),
        }
    }
}

/// Receiving end; consumed by [`IngestQueue::spawn`].
#[derive(Debug)]
pub struct IngestQueue {
    rx: mpsc::Receiver<IngestEvent>,
}

/// Bounded ingest queue. Cutting `lifeline` closes it to senders at once.
pub fn ingest_channel(capacity: usize, lifeline: Lifeline) -> (IngestHandle, IngestQueue) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (IngestHandle { tx, lifeline }, IngestQueue { rx })
}

impl IngestQueue {
    /// Consume events until every handle is dropped or the lifeline is cut.
    pub fn spawn(mut self, engine: Arc<StateEngine>, lifeline: Lifeline) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::debug!("Ingest consumer started");
            loop {
                tokio::select! {
                    event = self.rx.recv() => match event {
                        Some(event) => {
                            tracing::debug!("Ingest {:?}", event);
                            engine.inject_transient(event.expression());
                        }
                        None => break,
                    },
                    _ = lifeline.stopped() => break,
                }
            }
            self.rx.close();
            tracing::debug!("Ingest consumer stopped");
        })
    }
}
