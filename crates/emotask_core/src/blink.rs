//! Per-expression blink schedule.
//!
//! The table is fixed at startup. An expression without an entry has no
//! closed-eye artwork and never blinks.

use crate::state::EmotionalState;
use std::collections::HashMap;
use std::time::Duration;

/// Upper bound on how long the eyes may stay shut.
pub const MAX_BLINK_DURATION: Duration = Duration::from_millis(200);

/// How often an expression blinks, and for how long.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlinkPolicy {
    /// Whole seconds between blinks
    pub interval_seconds: u64,
    /// Seconds the eyes stay closed
    pub blink_duration_seconds: f64,
}

impl BlinkPolicy {
    pub const fn new(interval_seconds: u64, blink_duration_seconds: f64) -> Self {
        Self {
            interval_seconds,
            blink_duration_seconds,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    /// Blink duration, clamped to [`MAX_BLINK_DURATION`].
    pub fn duration(&self) -> Duration {
        if !self.blink_duration_seconds.is_finite() || self.blink_duration_seconds <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.blink_duration_seconds).min(MAX_BLINK_DURATION)
    }
}

impl Default for BlinkPolicy {
    fn default() -> Self {
        Self::new(4, 0.1)
    }
}

/// Read-only mapping from expression to blink policy.
#[derive(Debug, Clone, Default)]
pub struct BlinkTable {
    entries: HashMap<EmotionalState, BlinkPolicy>,
}

impl BlinkTable {
    /// A table where nothing blinks.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The face's stock schedule: every expression with closed-eye artwork
    /// blinks every 4s for 0.1s, except the very tired face which is
    /// slower and droopier.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        for state in [
            EmotionalState::Happy,
            EmotionalState::Neutral,
            EmotionalState::GrimaceTwoSweat,
            EmotionalState::Anguish,
            EmotionalState::AnguishVery,
            EmotionalState::Tired,
        ] {
            table = table.with(state, BlinkPolicy::default());
        }
        table.with(EmotionalState::TiredVery, BlinkPolicy::new(6, 0.2))
    }

    pub fn with(mut self, state: EmotionalState, policy: BlinkPolicy) -> Self {
        self.entries.insert(state, policy);
        self
    }

    pub fn policy(&self, state: EmotionalState) -> Option<&BlinkPolicy> {
        self.entries.get(&state)
    }

    pub fn blinks(&self, state: EmotionalState) -> bool {
        self.entries.contains_key(&state)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
