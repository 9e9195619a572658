use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Slowest allowed sampling cadence.
pub const MAX_SAMPLE_INTERVAL: Duration = Duration::from_millis(500);
/// Slowest allowed blink-check cadence.
pub const MAX_BLINK_TICK: Duration = Duration::from_millis(50);

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmotaskConfig {
    pub cadence: CadenceConfig,
    pub sensors: SensorConfig,
    pub ingest: IngestConfig,
    pub assets: AssetConfig,
    pub logging: LoggingConfig,
}

impl EmotaskConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: EmotaskConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// `<config dir>/emotask/config.toml`, or a relative `emotask.toml` when the
    /// platform has no config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("emotask").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("emotask.toml"))
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("EMOTASK_SAMPLE_MS") {
            if let Ok(n) = v.parse() {
                self.cadence.sample_interval_ms = n;
            }
        }
        if let Ok(v) = std::env::var("EMOTASK_BLINK_TICK_MS") {
            if let Ok(n) = v.parse() {
                self.cadence.blink_tick_ms = n;
            }
        }
        if let Ok(v) = std::env::var("EMOTASK_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = std::env::var("EMOTASK_ERROR_LOG") {
            self.ingest.error_log = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("EMOTASK_ASSETS_DIR") {
            self.assets.dir = Some(PathBuf::from(v));
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    /// Milliseconds between sampling/arbitration cycles. Capped at 500.
    pub sample_interval_ms: u64,
    /// Milliseconds between blink checks. Capped at 50.
    pub blink_tick_ms: u64,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 500,
            blink_tick_ms: 50,
        }
    }
}

impl CadenceConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.max(1)).min(MAX_SAMPLE_INTERVAL)
    }

    pub fn blink_tick(&self) -> Duration {
        Duration::from_millis(self.blink_tick_ms.max(1)).min(MAX_BLINK_TICK)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Linux power-supply class directory, scanned for batteries.
    pub power_supply_dir: PathBuf,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            power_supply_dir: PathBuf::from("/sys/class/power_supply"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Watch for device arrival/removal.
    pub devices: bool,
    pub device_dirs: Vec<PathBuf>,
    pub device_poll_ms: u64,
    /// Log file tailed for application errors. Disabled when unset.
    pub error_log: Option<PathBuf>,
    /// Regexes; a new log line matching any of them counts as an application error.
    pub error_patterns: Vec<String>,
    pub error_poll_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            devices: true,
            device_dirs: vec![PathBuf::from("/sys/bus/usb/devices")],
            device_poll_ms: 1000,
            error_log: None,
            error_patterns: default_error_patterns(),
            error_poll_ms: 1000,
        }
    }
}

fn default_error_patterns() -> Vec<String> {
    vec![r"(?i)\b(error|critical|fatal)\b".to_string()]
}

impl IngestConfig {
    pub fn device_poll_interval(&self) -> Duration {
        Duration::from_millis(self.device_poll_ms.max(1))
    }

    pub fn error_poll_interval(&self) -> Duration {
        Duration::from_millis(self.error_poll_ms.max(1))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory holding `<state>.png` / `<state>_blink.png`. Built-in faces when unset.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` wins when set.
    pub level: String,
    pub json: bool,
    /// Also append logs to this file.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let cfg = EmotaskConfig::default();
        assert_eq!(cfg.cadence.sample_interval(), Duration::from_millis(500));
        assert_eq!(cfg.cadence.blink_tick(), Duration::from_millis(50));
        assert!(cfg.ingest.devices);
        assert!(cfg.ingest.error_log.is_none());
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.assets.dir.is_none());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
[cadence]
sample_interval_ms = 250
"#;
        let cfg: EmotaskConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.cadence.sample_interval(), Duration::from_millis(250));
        // Defaults for unspecified fields
        assert_eq!(cfg.cadence.blink_tick_ms, 50);
        assert_eq!(cfg.ingest.error_patterns.len(), 1);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[cadence]
sample_interval_ms = 400
blink_tick_ms = 20

[sensors]
power_supply_dir = "/tmp/power"

[ingest]
devices = false
device_dirs = ["/dev/input"]
device_poll_ms = 250
error_log = "/var/log/app.log"
error_patterns = ["panicked", "segfault"]
error_poll_ms = 500

[assets]
dir = "/usr/share/emotask"

[logging]
level = "debug"
json = true
file = "/tmp/emotask.log"
"#;
        let cfg: EmotaskConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.cadence.blink_tick(), Duration::from_millis(20));
        assert_eq!(cfg.sensors.power_supply_dir, PathBuf::from("/tmp/power"));
        assert!(!cfg.ingest.devices);
        assert_eq!(cfg.ingest.device_dirs, vec![PathBuf::from("/dev/input")]);
        assert_eq!(cfg.ingest.error_log, Some(PathBuf::from("/var/log/app.log")));
        assert_eq!(cfg.ingest.error_patterns, vec!["panicked", "segfault"]);
        assert_eq!(cfg.ingest.error_poll_interval(), Duration::from_millis(500));
        assert_eq!(cfg.assets.dir, Some(PathBuf::from("/usr/share/emotask")));
        assert!(cfg.logging.json);
        assert_eq!(cfg.logging.file, Some(PathBuf::from("/tmp/emotask.log")));
    }

    #[test]
    fn test_cadence_is_capped() {
        let cadence = CadenceConfig {
            sample_interval_ms: 10_000,
            blink_tick_ms: 0,
        };
        assert_eq!(cadence.sample_interval(), MAX_SAMPLE_INTERVAL);
        assert_eq!(cadence.blink_tick(), Duration::from_millis(1));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"trace\"").unwrap();
        let cfg = EmotaskConfig::load(file.path()).unwrap();
        assert_eq!(cfg.logging.level, "trace");
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cadence\nsample_interval_ms = ").unwrap();
        assert!(EmotaskConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_env_overrides_and_defaults() {
        // Part 1: env overrides
        std::env::set_var("EMOTASK_SAMPLE_MS", "100");
        std::env::set_var("EMOTASK_ERROR_LOG", "/tmp/errors.log");

        let mut cfg = EmotaskConfig::default();
        cfg.apply_env_overrides();

        assert_eq!(cfg.cadence.sample_interval_ms, 100);
        assert_eq!(cfg.ingest.error_log, Some(PathBuf::from("/tmp/errors.log")));

        // Clean up env vars before testing defaults
        std::env::remove_var("EMOTASK_SAMPLE_MS");
        std::env::remove_var("EMOTASK_ERROR_LOG");

        // Part 2: nonexistent path returns defaults (no env interference)
        let cfg = EmotaskConfig::load_or_default("/nonexistent/path.toml");
        assert_eq!(cfg.cadence.sample_interval_ms, 500);
    }
}
