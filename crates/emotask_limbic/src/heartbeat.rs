//! Heartbeat configuration for the limbic loops
//!
//! The heartbeat sets how often metrics are sampled and arbitrated, and how
//! often the blink loop checks whether the eyes are due to close.

use emotask_core::config::{CadenceConfig, MAX_BLINK_TICK, MAX_SAMPLE_INTERVAL};
use std::time::Duration;

/// Configuration for the limbic heartbeat
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// How often to sample metrics and re-arbitrate (default: 500ms)
    pub sample_interval: Duration,
    /// How often the blink loop wakes up (default: 50ms)
    pub blink_tick: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            sample_interval: MAX_SAMPLE_INTERVAL,
            blink_tick: MAX_BLINK_TICK,
        }
    }
}

impl HeartbeatConfig {
    /// Very fast heartbeat for testing
    pub fn testing() -> Self {
        Self {
            sample_interval: Duration::from_millis(10),
            blink_tick: Duration::from_millis(5),
        }
    }
}

impl From<&CadenceConfig> for HeartbeatConfig {
    fn from(cadence: &CadenceConfig) -> Self {
        Self {
            sample_interval: cadence.sample_interval(),
            blink_tick: cadence.blink_tick(),
        }
    }
}
