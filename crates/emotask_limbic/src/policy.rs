//! Arbitration policy
//!
//! Three threshold ladders evaluated in strict priority order: CPU, then
//! battery (only when one is present), then memory. First match wins. The
//! thresholds are fixed; there is no runtime knob.

use emotask_core::{EmotionalState, MetricSnapshot};
use std::time::Duration;

/// How long an injected or relief expression stays on screen.
pub const TEMPORARY_STATE_DURATION: Duration = Duration::from_secs(2);

/// CPU ladder: strictly-greater-than thresholds, highest first.
pub const CPU_LADDER: [(f64, EmotionalState); 3] = [
    (90.0, EmotionalState::AnguishExtremely),
    (70.0, EmotionalState::AnguishVery),
    (50.0, EmotionalState::Anguish),
];

/// Battery ladder: strictly-less-than thresholds, lowest first.
pub const BATTERY_LADDER: [(u8, EmotionalState); 3] = [
    (10, EmotionalState::TiredExtremely),
    (20, EmotionalState::TiredVery),
    (30, EmotionalState::Tired),
];

/// Memory ladder: strictly-greater-than thresholds, highest first.
pub const MEMORY_LADDER: [(f64, EmotionalState); 2] = [
    (95.0, EmotionalState::GrimaceTwoSweat),
    (90.0, EmotionalState::Neutral),
];

/// Outcome of running the ladders over one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// The distress expression the ladders settled on, if any matched.
    pub distress: Option<EmotionalState>,
}

impl Verdict {
    pub fn over_threshold(&self) -> bool {
        self.distress.is_some()
    }
}

/// Run the ladders. Pure: no clock, no history.
pub fn arbitrate(snapshot: &MetricSnapshot) -> Verdict {
    let distress = cpu_ladder(snapshot.cpu_percent)
        .or_else(|| {
            snapshot
                .has_battery
                .then(|| battery_ladder(snapshot.battery_percent))
                .flatten()
        })
        .or_else(|| memory_ladder(snapshot.memory_load_percent));
    Verdict { distress }
}

fn cpu_ladder(cpu_percent: f64) -> Option<EmotionalState> {
    CPU_LADDER
        .iter()
        .find(|(limit, _)| cpu_percent > *limit)
        .map(|(_, state)| *state)
}

fn battery_ladder(percent: u8) -> Option<EmotionalState> {
    BATTERY_LADDER
        .iter()
        .find(|(limit, _)| percent < *limit)
        .map(|(_, state)| *state)
}

fn memory_ladder(memory_percent: f64) -> Option<EmotionalState> {
    MEMORY_LADDER
        .iter()
        .find(|(limit, _)| memory_percent > *limit)
        .map(|(_, state)| *state)
}
