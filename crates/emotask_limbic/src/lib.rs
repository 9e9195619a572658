//! # emotask Limbic System
//!
//! The emotional-state engine behind the face. It decides which of the
//! twelve expressions is on screen and when the eyes close.
//!
//! ## Architecture
//!
//! Three loops share one [`StateEngine`]:
//! 1. Sampling: every 500ms, read CPU/memory/battery and run the
//!    arbitration ladders (CPU > battery > memory > baseline)
//! 2. Blinking: every 50ms, check whether the current face is due a blink
//! 3. Ingest: apply OS events (device change, application error) as
//!    two-second temporary expressions
//!
//! Every change is published on a watch channel so the renderer can redraw
//! without holding the engine lock.

mod blink;
mod engine;
mod heartbeat;
pub mod ingest;
mod lifeline;
pub mod policy;
pub mod render;
mod sampling;
mod system;

pub use blink::BlinkScheduler;
pub use engine::StateEngine;
pub use heartbeat::HeartbeatConfig;
pub use ingest::{ingest_channel, IngestEvent, IngestHandle, IngestQueue};
pub use lifeline::Lifeline;
pub use policy::{arbitrate, Verdict, TEMPORARY_STATE_DURATION};
pub use render::{FaceAtlas, RenderTrigger, Sprite};
pub use sampling::{spawn_sampling, SnapshotCollector};
pub use system::{LimbicSystem, LimbicTasks};
