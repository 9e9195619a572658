//! Raw system readings and the sampler seam.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Battery state as reported by the power subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryReading {
    pub has_battery: bool,
    /// 0-100. Machines without a battery report 100.
    pub percent: u8,
}

impl BatteryReading {
    /// Reading for a machine on mains power only.
    pub fn absent() -> Self {
        Self {
            has_battery: false,
            percent: 100,
        }
    }

    /// Reading for a present battery, clamping bogus percentages above 100.
    pub fn present(percent: u32) -> Self {
        Self {
            has_battery: true,
            percent: percent.min(100) as u8,
        }
    }
}

impl Default for BatteryReading {
    fn default() -> Self {
        Self::absent()
    }
}

/// One polling cycle's worth of readings. Ephemeral: built, arbitrated, dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    /// Percent busy since the previous sample (0.0 to 100.0)
    pub cpu_percent: f64,
    /// Percent of physical memory in use (0.0 to 100.0)
    pub memory_load_percent: f64,
    pub has_battery: bool,
    /// 0 to 100
    pub battery_percent: u8,
}

impl Default for MetricSnapshot {
    fn default() -> Self {
        Self {
            cpu_percent: 0.0,
            memory_load_percent: 0.0,
            has_battery: false,
            battery_percent: 100,
        }
    }
}

impl MetricSnapshot {
    pub fn new(cpu_percent: f64, memory_load_percent: f64, battery: BatteryReading) -> Self {
        Self {
            cpu_percent,
            memory_load_percent,
            has_battery: battery.has_battery,
            battery_percent: battery.percent,
        }
    }

    pub fn battery(&self) -> BatteryReading {
        BatteryReading {
            has_battery: self.has_battery,
            percent: self.battery_percent,
        }
    }

    /// Clamp every field into its documented range.
    /// Non-finite percentages collapse to 0.
    pub fn sanitized(self) -> Self {
        Self {
            cpu_percent: clamp_percent(self.cpu_percent),
            memory_load_percent: clamp_percent(self.memory_load_percent),
            has_battery: self.has_battery,
            battery_percent: self.battery_percent.min(100),
        }
    }
}

/// Clamp to [0, 100], mapping NaN/inf to 0.
fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Source of CPU, memory and battery readings.
///
/// Each query may fail independently; callers decide what a failure means
/// for the cycle (the engine keeps the last known value).
pub trait MetricSampler: Send {
    /// Percent busy since the last call.
    fn sample_cpu(&mut self) -> Result<f64>;

    /// Percent of physical memory in use.
    fn sample_memory(&mut self) -> Result<f64>;

    fn sample_battery(&mut self) -> Result<BatteryReading>;
}

impl<T: MetricSampler + ?Sized> MetricSampler for Box<T> {
    fn sample_cpu(&mut self) -> Result<f64> {
        (**self).sample_cpu()
    }

    fn sample_memory(&mut self) -> Result<f64> {
        (**self).sample_memory()
    }

    fn sample_battery(&mut self) -> Result<BatteryReading> {
        (**self).sample_battery()
    }
}
