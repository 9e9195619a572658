//! Sampling loop
//!
//! Turns a [`MetricSampler`] into one [`MetricSnapshot`] per cycle and feeds
//! it to the engine. A failed query never stops the loop: that field keeps
//! its last known value for the cycle.

use crate::engine::StateEngine;
use crate::lifeline::Lifeline;
use emotask_core::{MetricSampler, MetricSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Assembles snapshots, remembering the last good reading of each field.
#[derive(Debug, Clone, Default)]
pub struct SnapshotCollector {
    last: MetricSnapshot,
    failures: u64,
}

impl SnapshotCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queries that failed since construction.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Fields whose query fails (or returns a non-finite value) keep their
    /// previous reading. The result is always sanitized.
    pub fn collect<S: MetricSampler + ?Sized>(&mut self, sampler: &mut S) -> MetricSnapshot {
        match sampler.sample_cpu() {
            Ok(v) if v.is_finite() => self.last.cpu_percent = v,
            Ok(v) => self.reject("cpu", format!("non-finite reading {v}")),
            Err(e) => self.reject("cpu", e.to_string()),
        }
        match sampler.sample_memory() {
            Ok(v) if v.is_finite() => self.last.memory_load_percent = v,
            Ok(v) => self.reject("memory", format!("non-finite reading {v}")),
            Err(e) => self.reject("memory", e.to_string()),
        }
        match sampler.sample_battery() {
            Ok(reading) => {
                self.last.has_battery = reading.has_battery;
                self.last.battery_percent = reading.percent;
            }
            Err(e) => self.reject("battery", e.to_string()),
        }
        self.last = self.last.sanitized();
        self.last
    }

    fn reject(&mut self, field: &str, reason: String) {
        self.failures += 1;
        tracing::warn!("Failed to sample {}, keeping last value: {}", field, reason);
    }
}

/// Sample, arbitrate, sleep; until the lifeline is cut.
pub fn spawn_sampling<S>(
    engine: Arc<StateEngine>,
    mut sampler: S,
    interval: Duration,
    lifeline: Lifeline,
) -> JoinHandle<()>
where
    S: MetricSampler + 'static,
{
    tokio::spawn(async move {
        let mut collector = SnapshotCollector::new();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::debug!("Sampling loop started (every {:?})", interval);

        while lifeline.is_alive() {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = lifeline.stopped() => break,
            }
            let snapshot = collector.collect(&mut sampler);
            tracing::trace!(
                "Sampled cpu={:.1}% mem={:.1}% battery={}/{}%",
                snapshot.cpu_percent,
                snapshot.memory_load_percent,
                snapshot.has_battery,
                snapshot.battery_percent
            );
            engine.update_state(&snapshot);
        }
        tracing::debug!(
            "Sampling loop stopped ({} failed queries)",
            collector.failures()
        );
    })
}
