//! Blink scheduler
//!
//! Keeps one last-blink timestamp per expression, so switching away from a
//! face and back does not reset its clock. The scheduler reads the current
//! expression and toggles the blink flag; it never changes the expression.

use crate::engine::StateEngine;
use crate::lifeline::Lifeline;
use emotask_core::{BlinkTable, EmotionalState};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub struct BlinkScheduler {
    engine: Arc<StateEngine>,
    table: BlinkTable,
    last_blink: HashMap<EmotionalState, Instant>,
}

impl BlinkScheduler {
    /// Every expression's clock starts now.
    pub fn new(engine: Arc<StateEngine>, table: BlinkTable) -> Self {
        let now = Instant::now();
        let last_blink = EmotionalState::ALL.iter().map(|s| (*s, now)).collect();
        Self {
            engine,
            table,
            last_blink,
        }
    }

    #[cfg(test)]
    fn last_blink(&self, state: EmotionalState) -> Option<Instant> {
        self.last_blink.get(&state).copied()
    }

    /// One check. If the face on screen is due, close its eyes for the
    /// policy's duration, then open them. Returns whether a blink happened.
    ///
    /// The pause is local to this task and bounded by
    /// [`MAX_BLINK_DURATION`](emotask_core::MAX_BLINK_DURATION).
    pub async fn tick(&mut self, now: Instant) -> bool {
        let state = self.engine.current_state();
        let Some(policy) = self.table.policy(state).copied() else {
            return false;
        };
        let last = *self.last_blink.entry(state).or_insert(now);
        if now.saturating_duration_since(last) < policy.interval() {
            return false;
        }

        if !self.engine.begin_blink(state) {
            // Face changed between the read and the blink; try again next tick.
            return false;
        }
        tracing::trace!("Blink {} for {:?}", state, policy.duration());
        tokio::time::sleep(policy.duration()).await;
        self.engine.end_blink();
        self.last_blink.insert(state, Instant::now());
        true
    }

    /// Run until the lifeline is cut, checking every `tick`.
    pub fn spawn(mut self, tick: Duration, lifeline: Lifeline) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::debug!("Blink loop started (tick {:?})", tick);
            while lifeline.is_alive() {
                self.tick(Instant::now()).await;
                tokio::select! {
                    _ = tokio::time::sleep(tick) => {}
                    _ = lifeline.stopped() => break,
                }
            }
            self.engine.end_blink();
            tracing::debug!("Blink loop stopped");
        })
    }
}
