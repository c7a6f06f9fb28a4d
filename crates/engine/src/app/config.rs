use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use super::rendering::{Rgba, DEFAULT_CLEAR_COLOR};

pub const SLOW_FRAME_ENV_VAR: &str = "ARBOR_SLOW_FRAME_MS";

/// Window and fixed-timestep settings. Every field is optional in JSON; the
/// two durations are spelled `*_ms`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    #[serde(rename = "max_frame_delta_ms", deserialize_with = "deserialize_millis")]
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    #[serde(
        rename = "metrics_log_interval_ms",
        deserialize_with = "deserialize_millis"
    )]
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
    pub max_render_fps: Option<u32>,
    pub clear_color: Rgba,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Arbor".to_string(),
            window_width: 1280,
            window_height: 720,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_frame_ms: 0,
            max_render_fps: None,
            clear_color: DEFAULT_CLEAR_COLOR,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config at {location}: {source}")]
    Parse {
        location: String,
        #[source]
        source: serde_json::Error,
    },
}

impl LoopConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
            let path = error.path().to_string();
            let location = if path.is_empty() || path == "." {
                "<root>".to_string()
            } else {
                path
            };
            ConfigError::Parse {
                location,
                source: error.into_inner(),
            }
        })
    }
}

/// Reads a loop config file. A missing file yields the defaults.
pub fn load_loop_config(path: &Path) -> Result<LoopConfig, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(LoopConfig::default()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    LoopConfig::from_json_str(&raw)
}

fn deserialize_millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = LoopConfig::from_json_str("{}").expect("parse");
        assert_eq!(config, LoopConfig::default());
    }

    #[test]
    fn millisecond_fields_become_durations() {
        let config = LoopConfig::from_json_str(
            r#"{ "target_tps": 30, "max_frame_delta_ms": 100, "metrics_log_interval_ms": 5000,
                 "max_render_fps": 144, "clear_color": [1, 2, 3, 255] }"#,
        )
        .expect("parse");

        assert_eq!(config.target_tps, 30);
        assert_eq!(config.max_frame_delta, Duration::from_millis(100));
        assert_eq!(config.metrics_log_interval, Duration::from_secs(5));
        assert_eq!(config.max_render_fps, Some(144));
        assert_eq!(config.clear_color, [1, 2, 3, 255]);
        assert_eq!(config.window_width, 1280);
    }

    #[test]
    fn parse_error_reports_field_path() {
        let error = LoopConfig::from_json_str(r#"{ "window_width": "wide" }"#)
            .expect_err("type mismatch");
        match error {
            ConfigError::Parse { location, .. } => assert_eq!(location, "window_width"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(LoopConfig::from_json_str(r#"{ "window_widht": 10 }"#).is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let temp = TempDir::new().expect("temp dir");
        let config = load_loop_config(&temp.path().join("absent.json")).expect("defaults");
        assert_eq!(config, LoopConfig::default());
    }

    #[test]
    fn config_file_is_loaded() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("loop.json");
        fs::write(&path, r#"{ "window_title": "Demo" }"#).expect("write config");

        let config = load_loop_config(&path).expect("load");
        assert_eq!(config.window_title, "Demo");
    }
}
