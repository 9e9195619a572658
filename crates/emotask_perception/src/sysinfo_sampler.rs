//! sysinfo-based implementation of the MetricSampler trait.

use crate::power::PowerSupplyReader;
use anyhow::{bail, Result};
use emotask_core::{BatteryReading, MetricSampler};
use sysinfo::System;

/// CPU and memory through `sysinfo`, battery through the power-supply class.
pub struct SysinfoSampler {
    system: System,
    power: PowerSupplyReader,
}

impl SysinfoSampler {
    /// Creates a new SysinfoSampler.
    pub fn new(power: PowerSupplyReader) -> Self {
        let mut system = System::new();
        // Prime the CPU counters so the first real sample measures an interval.
        system.refresh_cpu_usage();
        system.refresh_memory();
        Self { system, power }
    }
}

impl MetricSampler for SysinfoSampler {
    fn sample_cpu(&mut self) -> Result<f64> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            bail!("CPU usage not supported on this platform");
        }
        self.system.refresh_cpu_usage();
        Ok(self.system.global_cpu_usage() as f64)
    }

    fn sample_memory(&mut self) -> Result<f64> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            bail!("Total memory reported as zero");
        }
        Ok(self.system.used_memory() as f64 / total as f64 * 100.0)
    }

    fn sample_battery(&mut self) -> Result<BatteryReading> {
        self.power.read()
    }
}
