//! # emotask perception
//!
//! The engine's senses: metric samplers polled every cycle, and event
//! sources that turn OS happenings into temporary expressions.

pub mod device;
pub mod error_log;
pub mod power;
pub mod source;
pub mod sysinfo_sampler;

pub use device::DeviceWatcher;
pub use error_log::ErrorLogWatcher;
pub use power::PowerSupplyReader;
pub use source::{EventSource, SourceManager};
pub use sysinfo_sampler::SysinfoSampler;

use emotask_core::config::{IngestConfig, SensorConfig};
use std::sync::Arc;

/// The stock sampler for this host.
pub fn sampler_from_config(config: &SensorConfig) -> SysinfoSampler {
    SysinfoSampler::new(PowerSupplyReader::new(config.power_supply_dir.clone()))
}

/// Event sources enabled by the config. A source that can't even be built
/// (bad regex) is logged and left out; the rest still run.
pub fn sources_from_config(config: &IngestConfig) -> Vec<Arc<dyn EventSource>> {
    let mut sources: Vec<Arc<dyn EventSource>> = Vec::new();

    if config.devices && !config.device_dirs.is_empty() {
        sources.push(Arc::new(DeviceWatcher::new(
            config.device_dirs.clone(),
            config.device_poll_interval(),
        )));
    }

    if let Some(path) = &config.error_log {
        match ErrorLogWatcher::new(
            path.clone(),
            &config.error_patterns,
            config.error_poll_interval(),
        ) {
            Ok(watcher) => sources.push(Arc::new(watcher)),
            Err(e) => tracing::warn!("Error log watcher disabled: {:#}", e),
        }
    }

    sources
}
