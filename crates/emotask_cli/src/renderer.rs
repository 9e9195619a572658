//! Terminal stand-in for the widget window: redraws one line in place
//! every time the engine invalidates.

use crate::face::Face;
use emotask_core::RenderState;
use emotask_limbic::{FaceAtlas, Lifeline, StateEngine};
use std::io::{self, Write};
use std::sync::Arc;

pub struct TerminalRenderer<W> {
    atlas: FaceAtlas<Face>,
    out: W,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(atlas: FaceAtlas<Face>, out: W) -> Self {
        Self { atlas, out }
    }

    /// Paint one frame. Draws an empty line when no sprite is usable.
    pub fn draw(&mut self, frame: RenderState) -> io::Result<()> {
        write!(self.out, "\r\x1b[2K")?;
        if let Some(face) = self.atlas.select(frame) {
            write!(self.out, "{}  {}", face, frame.state)?;
        }
        self.out.flush()
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send + 'static> TerminalRenderer<W> {
    /// Redraw on every invalidation until shutdown. The frame is re-read from
    /// the engine so the drawing never happens under its lock.
    pub async fn run(mut self, engine: Arc<StateEngine>, lifeline: Lifeline) {
        let mut rx = engine.subscribe();
        if let Err(e) = self.draw(engine.render_state()) {
            tracing::warn!("Failed to draw face: {}", e);
        }
        loop {
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = lifeline.stopped() => break,
            }
            if let Err(e) = self.draw(engine.render_state()) {
                tracing::warn!("Failed to draw face: {}", e);
            }
        }
        if let Err(e) = writeln!(self.out) {
            tracing::warn!("Failed to finish face line: {}", e);
        }
    }
}
