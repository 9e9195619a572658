//! Redraw signalling and sprite selection.
//!
//! The engine never paints. It publishes the latest [`RenderState`] on a
//! watch channel; whoever owns the display surface waits on it, then picks a
//! sprite from a [`FaceAtlas`] without touching the engine lock.

use emotask_core::{BlinkTable, EmotionalState, RenderState};
use std::collections::HashMap;
use tokio::sync::watch;

/// Fires an invalidation every time the expression or the blink flag changes.
#[derive(Debug, Clone)]
pub struct RenderTrigger {
    tx: watch::Sender<RenderState>,
}

impl RenderTrigger {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RenderState::default());
        Self { tx }
    }

    /// Publish a new frame. Never blocks, works with zero subscribers.
    pub fn invalidate(&self, frame: RenderState) {
        self.tx.send_replace(frame);
    }

    /// Receiver woken on every invalidation.
    pub fn subscribe(&self) -> watch::Receiver<RenderState> {
        self.tx.subscribe()
    }
}

impl Default for RenderTrigger {
    fn default() -> Self {
        Self::new()
    }
}

/// Anything drawable. Decoding may have failed, so validity is checked at draw time.
pub trait Sprite {
    fn is_valid(&self) -> bool {
        true
    }
}

/// Base and closed-eye sprites for each expression.
#[derive(Debug, Clone)]
pub struct FaceAtlas<S> {
    base: HashMap<EmotionalState, S>,
    blink: HashMap<EmotionalState, S>,
}

impl<S> Default for FaceAtlas<S> {
    fn default() -> Self {
        Self {
            base: HashMap::new(),
            blink: HashMap::new(),
        }
    }
}

impl<S: Sprite> FaceAtlas<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(mut self, state: EmotionalState, sprite: S) -> Self {
        self.base.insert(state, sprite);
        self
    }

    pub fn with_blink(mut self, state: EmotionalState, sprite: S) -> Self {
        self.blink.insert(state, sprite);
        self
    }

    pub fn base(&self, state: EmotionalState) -> Option<&S> {
        self.base.get(&state)
    }

    pub fn blink(&self, state: EmotionalState) -> Option<&S> {
        self.blink.get(&state)
    }

    /// Blink sprite when blinking and it exists and is valid, else the base
    /// sprite when valid, else nothing.
    pub fn select(&self, frame: RenderState) -> Option<&S> {
        if frame.blinking {
            if let Some(sprite) = self.blink(frame.state).filter(|s| s.is_valid()) {
                return Some(sprite);
            }
        }
        self.base(frame.state).filter(|s| s.is_valid())
    }

    /// The HAPPY face is the one sprite the widget cannot run without.
    pub fn has_baseline(&self) -> bool {
        self.base(EmotionalState::Happy)
            .map(|s| s.is_valid())
            .unwrap_or(false)
    }

    /// Narrow a blink table to the expressions that have usable closed-eye artwork.
    pub fn restrict(&self, table: &BlinkTable) -> BlinkTable {
        EmotionalState::ALL
            .iter()
            .fold(BlinkTable::empty(), |acc, state| {
                match (table.policy(*state), self.blink(*state)) {
                    (Some(policy), Some(sprite)) if sprite.is_valid() => acc.with(*state, *policy),
                    _ => acc,
                }
            })
    }
}
