//! The state engine
//!
//! Single source of truth for what the face shows. Every read and write of
//! [`StateContext`] goes through one mutex; critical sections are a handful
//! of comparisons and never await.
//!
//! Two writers compete for the context:
//! - the sampling loop, through [`StateEngine::update_state`], which runs the
//!   arbitration ladders unless a temporary expression is still on screen;
//! - event ingest, through [`StateEngine::inject_transient`], which forces an
//!   expression for [`TEMPORARY_STATE_DURATION`].
//!
//! The blink loop only flips `is_blinking`.

use crate::policy::{self, TEMPORARY_STATE_DURATION};
use crate::render::RenderTrigger;
use emotask_core::{EmotionalState, MetricSnapshot, RenderState};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::time::Instant;

/// Everything the engine knows. Only ever touched under the engine's lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StateContext {
    pub current_state: EmotionalState,
    pub is_blinking: bool,
    pub is_temporary: bool,
    /// Meaningful only while `is_temporary` is set.
    pub temporary_state_started_at: Instant,
    /// Whether the previous arbitration matched any ladder.
    pub was_above_threshold: bool,
}

impl StateContext {
    pub fn new(now: Instant) -> Self {
        Self {
            current_state: EmotionalState::Happy,
            is_blinking: false,
            is_temporary: false,
            temporary_state_started_at: now,
            was_above_threshold: false,
        }
    }

    fn render_state(&self) -> RenderState {
        RenderState::new(self.current_state, self.is_blinking)
    }
}

pub struct StateEngine {
    context: Mutex<StateContext>,
    trigger: RenderTrigger,
}

impl StateEngine {
    pub fn new() -> Self {
        Self {
            context: Mutex::new(StateContext::new(Instant::now())),
            trigger: RenderTrigger::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StateContext> {
        // A panic elsewhere can't leave the context half-written: every
        // critical section assigns plain fields.
        self.context.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arbitrate one sampling cycle. Returns whether the expression changed.
    pub fn update_state(&self, snapshot: &MetricSnapshot) -> bool {
        self.update_state_at(snapshot, Instant::now())
    }

    /// [`update_state`](Self::update_state) with an explicit clock reading.
    pub fn update_state_at(&self, snapshot: &MetricSnapshot, now: Instant) -> bool {
        let mut ctx = self.lock();

        if ctx.is_temporary {
            let elapsed = now.saturating_duration_since(ctx.temporary_state_started_at);
            if elapsed < TEMPORARY_STATE_DURATION {
                tracing::trace!(
                    "Holding temporary {} ({}ms left)",
                    ctx.current_state,
                    (TEMPORARY_STATE_DURATION - elapsed).as_millis()
                );
                return false;
            }
            ctx.is_temporary = false;
            tracing::debug!("Temporary {} expired, re-arbitrating", ctx.current_state);
        }

        let verdict = policy::arbitrate(snapshot);
        let candidate = match verdict.distress {
            Some(state) => state,
            None if ctx.was_above_threshold => {
                // Relief: one cycle of PLEASED, held like any temporary state
                ctx.is_temporary = true;
                ctx.temporary_state_started_at = now;
                EmotionalState::Pleased
            }
            None => EmotionalState::Happy,
        };
        ctx.was_above_threshold = verdict.over_threshold();

        if candidate == ctx.current_state {
            return false;
        }

        tracing::debug!(
            "Face {} -> {} ({:?}; cpu={:.1}%, mem={:.1}%, battery={})",
            ctx.current_state,
            candidate,
            candidate.family(),
            snapshot.cpu_percent,
            snapshot.memory_load_percent,
            if snapshot.has_battery {
                format!("{}%", snapshot.battery_percent)
            } else {
                "none".to_string()
            }
        );
        self.switch_to(&mut ctx, candidate);
        true
    }

    /// Force a transient expression for [`TEMPORARY_STATE_DURATION`].
    ///
    /// Leaves `was_above_threshold` alone, so an injection never itself
    /// causes (or suppresses) a relief transition.
    pub fn inject_transient(&self, state: EmotionalState) {
        self.inject_transient_at(state, Instant::now())
    }

    /// [`inject_transient`](Self::inject_transient) with an explicit clock reading.
    pub fn inject_transient_at(&self, state: EmotionalState, now: Instant) {
        if !state.is_transient() {
            tracing::debug!("Injecting {}, which arbitration can also produce", state);
        }
        let mut ctx = self.lock();
        tracing::debug!("Injected {} (was {})", state, ctx.current_state);
        ctx.is_temporary = true;
        ctx.temporary_state_started_at = now;
        if ctx.current_state == state {
            // Same face, fresh window; still redraw.
            self.trigger.invalidate(ctx.render_state());
        } else {
            self.switch_to(&mut ctx, state);
        }
    }

    // New expressions start with open eyes; a blink in flight belongs to the old face.
    fn switch_to(&self, ctx: &mut StateContext, state: EmotionalState) {
        ctx.current_state = state;
        ctx.is_blinking = false;
        self.trigger.invalidate(ctx.render_state());
    }

    /// Close the eyes, but only if `state` is still the one on screen.
    /// Returns whether the flag was set.
    pub fn begin_blink(&self, state: EmotionalState) -> bool {
        let mut ctx = self.lock();
        if ctx.current_state != state || ctx.is_blinking {
            return false;
        }
        ctx.is_blinking = true;
        self.trigger.invalidate(ctx.render_state());
        true
    }

    /// Open the eyes. Returns whether the flag changed.
    pub fn end_blink(&self) -> bool {
        let mut ctx = self.lock();
        if !ctx.is_blinking {
            return false;
        }
        ctx.is_blinking = false;
        self.trigger.invalidate(ctx.render_state());
        true
    }

    /// The two fields the paint routine needs, copied out under the lock.
    pub fn render_state(&self) -> RenderState {
        self.lock().render_state()
    }

    pub fn current_state(&self) -> EmotionalState {
        self.lock().current_state
    }

    pub fn is_temporary(&self) -> bool {
        self.lock().is_temporary
    }

    #[cfg(test)]
    fn context(&self) -> StateContext {
        *self.lock()
    }

    pub fn subscribe(&self) -> watch::Receiver<RenderState> {
        self.trigger.subscribe()
    }
}

impl Default for StateEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emotask_core::BatteryReading;
    use std::time::Duration;

    fn snap(cpu: f64, mem: f64) -> MetricSnapshot {
        MetricSnapshot::new(cpu, mem, BatteryReading::absent())
    }

    fn calm() -> MetricSnapshot {
        snap(5.0, 5.0)
    }

    #[test]
    fn test_initial_context() {
        let engine = StateEngine::new();
        let ctx = engine.context();
        assert_eq!(ctx.current_state, EmotionalState::Happy);
        assert!(!ctx.is_blinking);
        assert!(!ctx.is_temporary);
        assert!(!ctx.was_above_threshold);
    }

    #[test]
    fn test_cpu_drives_anguish() {
        let engine = StateEngine::new();
        assert!(engine.update_state(&snap(95.0, 99.0)));
        assert_eq!(engine.current_state(), EmotionalState::AnguishExtremely);
        assert!(engine.context().was_above_threshold);
    }

    #[test]
    fn test_battery_drives_tired() {
        let engine = StateEngine::new();
        let s = MetricSnapshot::new(10.0, 10.0, BatteryReading::present(5));
        assert!(engine.update_state(&s));
        assert_eq!(engine.current_state(), EmotionalState::TiredExtremely);
    }

    #[test]
    fn test_idempotent_once_settled() {
        let engine = StateEngine::new();
        let s = snap(60.0, 10.0);
        assert!(engine.update_state(&s));
        for _ in 0..5 {
            assert!(!engine.update_state(&s));
        }
        assert_eq!(engine.current_state(), EmotionalState::Anguish);
    }

    #[test]
    fn test_calm_from_start_stays_happy_without_change() {
        let engine = StateEngine::new();
        assert!(!engine.update_state(&calm()));
        assert_eq!(engine.current_state(), EmotionalState::Happy);
    }

    #[test]
    fn test_relief_transition() {
        let engine = StateEngine::new();
        let t0 = Instant::now();
        assert!(engine.update_state_at(&snap(60.0, 5.0), t0));
        assert_eq!(engine.current_state(), EmotionalState::Anguish);

        let t1 = t0 + Duration::from_millis(500);
        assert!(engine.update_state_at(&calm(), t1));
        assert_eq!(engine.current_state(), EmotionalState::Pleased);
        assert!(engine.is_temporary());
        assert!(!engine.context().was_above_threshold);

        // Held while the window is open
        assert!(!engine.update_state_at(&calm(), t1 + Duration::from_millis(1999)));
        assert_eq!(engine.current_state(), EmotionalState::Pleased);

        // Then back to baseline
        assert!(engine.update_state_at(&calm(), t1 + Duration::from_secs(2)));
        assert_eq!(engine.current_state(), EmotionalState::Happy);
        assert!(!engine.is_temporary());
    }

    #[test]
    fn test_relief_fires_only_once() {
        let engine = StateEngine::new();
        let t0 = Instant::now();
        engine.update_state_at(&snap(0.0, 92.0), t0);
        engine.update_state_at(&calm(), t0 + Duration::from_millis(500));
        assert_eq!(engine.current_state(), EmotionalState::Pleased);
        engine.update_state_at(&calm(), t0 + Duration::from_secs(3));
        assert_eq!(engine.current_state(), EmotionalState::Happy);
        assert!(!engine.update_state_at(&calm(), t0 + Duration::from_secs(4)));
        assert_eq!(engine.current_state(), EmotionalState::Happy);
    }

    #[test]
    fn test_relief_skips_straight_to_distress_if_metrics_spike() {
        let engine = StateEngine::new();
        let t0 = Instant::now();
        engine.update_state_at(&snap(60.0, 5.0), t0);
        engine.update_state_at(&calm(), t0 + Duration::from_millis(500));
        assert_eq!(engine.current_state(), EmotionalState::Pleased);
        // Expired, and the CPU is busy again
        assert!(engine.update_state_at(&snap(75.0, 5.0), t0 + Duration::from_secs(3)));
        assert_eq!(engine.current_state(), EmotionalState::AnguishVery);
    }

    #[test]
    fn test_injection_is_sticky_then_rearbitrates() {
        let engine = StateEngine::new();
        let t0 = Instant::now();
        engine.update_state_at(&snap(0.0, 92.0), t0);
        assert_eq!(engine.current_state(), EmotionalState::Neutral);

        engine.inject_transient_at(EmotionalState::Surprised, t0);
        assert_eq!(engine.render_state().state, EmotionalState::Surprised);

        // Metrics are ignored for the whole window
        assert!(!engine.update_state_at(&snap(99.0, 99.0), t0 + Duration::from_millis(1500)));
        assert_eq!(engine.current_state(), EmotionalState::Surprised);

        // After expiry the face comes from live metrics, not from before the injection
        assert!(engine.update_state_at(&snap(80.0, 0.0), t0 + Duration::from_secs(2)));
        assert_eq!(engine.current_state(), EmotionalState::AnguishVery);
    }

    #[test]
    fn test_injection_keeps_relief_flag() {
        let engine = StateEngine::new();
        let t0 = Instant::now();
        engine.update_state_at(&snap(60.0, 5.0), t0);
        engine.inject_transient_at(EmotionalState::Grimace, t0);
        assert!(engine.context().was_above_threshold);
        // Window over, metrics calm: the distress before the injection earns its relief
        engine.update_state_at(&calm(), t0 + Duration::from_secs(2));
        assert_eq!(engine.current_state(), EmotionalState::Pleased);
    }

    #[test]
    fn test_reinjection_extends_window() {
        let engine = StateEngine::new();
        let t0 = Instant::now();
        engine.inject_transient_at(EmotionalState::Surprised, t0);
        engine.inject_transient_at(EmotionalState::Surprised, t0 + Duration::from_millis(1500));
        assert!(!engine.update_state_at(&calm(), t0 + Duration::from_millis(2500)));
        assert_eq!(engine.current_state(), EmotionalState::Surprised);
        assert!(engine.update_state_at(&calm(), t0 + Duration::from_millis(3500)));
        assert_eq!(engine.current_state(), EmotionalState::Happy);
    }

    #[test]
    fn test_injection_overrides_relief() {
        let engine = StateEngine::new();
        let t0 = Instant::now();
        engine.update_state_at(&snap(60.0, 5.0), t0);
        engine.update_state_at(&calm(), t0);
        assert_eq!(engine.current_state(), EmotionalState::Pleased);
        engine.inject_transient_at(EmotionalState::Grimace, t0 + Duration::from_secs(1));
        assert_eq!(engine.current_state(), EmotionalState::Grimace);
        assert!(!engine.update_state_at(&calm(), t0 + Duration::from_millis(2500)));
        assert!(engine.update_state_at(&calm(), t0 + Duration::from_secs(3)));
        assert_eq!(engine.current_state(), EmotionalState::Happy);
    }

    #[test]
    fn test_blink_guarded_by_current_state() {
        let engine = StateEngine::new();
        assert!(!engine.begin_blink(EmotionalState::Neutral));
        assert!(engine.begin_blink(EmotionalState::Happy));
        assert!(engine.render_state().blinking);
        assert!(!engine.begin_blink(EmotionalState::Happy));
        assert!(engine.end_blink());
        assert!(!engine.end_blink());
    }

    #[test]
    fn test_state_change_opens_eyes() {
        let engine = StateEngine::new();
        engine.begin_blink(EmotionalState::Happy);
        engine.inject_transient(EmotionalState::Surprised);
        let frame = engine.render_state();
        assert_eq!(frame.state, EmotionalState::Surprised);
        assert!(!frame.blinking);
    }

    #[tokio::test]
    async fn test_changes_invalidate_subscribers() {
        let engine = StateEngine::new();
        let mut rx = engine.subscribe();
        rx.borrow_and_update();

        engine.update_state(&snap(60.0, 0.0));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), RenderState::new(EmotionalState::Anguish, false));

        // No change, no wake-up
        engine.update_state(&snap(60.0, 0.0));
        assert!(!rx.has_changed().unwrap());

        engine.begin_blink(EmotionalState::Anguish);
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().blinking);

        // Injecting the face already on screen still redraws
        engine.inject_transient(EmotionalState::Grimace);
        rx.borrow_and_update();
        engine.inject_transient(EmotionalState::Grimace);
        assert!(rx.has_changed().unwrap());
    }
}
