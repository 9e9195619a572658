//! Battery status from the Linux power-supply class.
//!
//! Each entry under the directory (usually `/sys/class/power_supply`) has a
//! `type` file; entries of type `Battery` expose `capacity` in percent.
//! A missing directory means no battery, not an error: desktops and
//! non-Linux hosts simply run on mains.

use anyhow::{Context, Result};
use emotask_core::BatteryReading;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct PowerSupplyReader {
    root: PathBuf,
}

impl PowerSupplyReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Average capacity over every present battery.
    pub fn read(&self) -> Result<BatteryReading> {
        if !self.root.is_dir() {
            return Ok(BatteryReading::absent());
        }

        let mut capacities = Vec::new();
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("Failed to list {}", self.root.display()))?;
        for entry in entries {
            let path = entry?.path();
            if !is_battery(&path) {
                continue;
            }
            let capacity = read_trimmed(&path.join("capacity"))
                .and_then(|raw| {
                    raw.parse::<u32>()
                        .with_context(|| format!("Unparseable capacity '{}'", raw))
                })
                .with_context(|| format!("Battery {} has no usable capacity", path.display()))?;
            // Some firmware overreports; anything above full is full.
            capacities.push(capacity.min(100));
        }

        if capacities.is_empty() {
            return Ok(BatteryReading::absent());
        }
        let mean = capacities.iter().sum::<u32>() / capacities.len() as u32;
        Ok(BatteryReading::present(mean))
    }
}

fn is_battery(path: &Path) -> bool {
    let is_type = read_trimmed(&path.join("type"))
        .map(|t| t.eq_ignore_ascii_case("battery"))
        .unwrap_or(false);
    // Absent `present` means the driver doesn't report it; assume present.
    let present = read_trimmed(&path.join("present"))
        .map(|p| p != "0")
        .unwrap_or(true);
    is_type && present
}

fn read_trimmed(path: &Path) -> Result<String> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(raw.trim().to_string())
}
