//! # emotask core
//!
//! Vocabulary shared by every emotask crate: the twelve facial expressions,
//! the per-cycle metric snapshot, the blink schedule and the TOML config.

pub mod blink;
pub mod config;
pub mod metrics;
pub mod state;

pub use blink::{BlinkPolicy, BlinkTable, MAX_BLINK_DURATION};
pub use config::EmotaskConfig;
pub use metrics::{BatteryReading, MetricSampler, MetricSnapshot};
pub use state::{EmotionalState, RenderState, StateFamily};
