use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub analyzer: AnalyzerConfig,
    pub gestures: GestureConfig,
}

impl AppConfig {
    pub fn live_defaults() -> Self {
        Self::default()
    }

    /// Reads a JSON config file. Missing sections fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        tracing::debug!(?path, "loaded configuration");
        Ok(config)
    }
}

/// Location of the remote search/stream service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How many deferred resume attempts are made after the platform blocks
    /// playback before waiting for the next explicit transport command.
    pub max_resume_retries: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_resume_retries: 3,
        }
    }
}

/// Configuration of the spectrum pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Transform size of the analysis tap; yields `fft_size / 2` bins.
    pub fft_size: usize,
    /// Smoothing applied by the tap across successive transforms.
    pub smoothing_time_constant: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
    pub bar_count: usize,
    /// Weight kept from the previous bar height while playing.
    pub bar_smoothing: f32,
    /// Per-frame multiplier applied to every bar while idle.
    pub idle_decay: f32,
    /// Floor for rendered bar heights so idle bars stay visible.
    pub min_bar_height: f32,
    /// Share of the viewport height a full-scale bar occupies.
    pub max_height_ratio: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fft_size: 256,
            smoothing_time_constant: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
            bar_count: 80,
            bar_smoothing: 0.7,
            idle_decay: 0.95,
            min_bar_height: 4.0,
            max_height_ratio: 0.4,
        }
    }
}

/// Thresholds of the swipe recognizer, in CSS pixels / wheel delta units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub threshold: f32,
    pub vertical_tolerance: f32,
    pub wheel_threshold: f32,
    #[serde(with = "millis")]
    pub reset_delay: Duration,
    /// Wheel events whose vertical delta exceeds this multiple of the
    /// horizontal delta are treated as scrolling.
    pub wheel_dominance: f32,
    pub ignore_inputs: bool,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            threshold: 60.0,
            vertical_tolerance: 60.0,
            wheel_threshold: 120.0,
            reset_delay: Duration::from_millis(400),
            wheel_dominance: 1.3,
            ignore_inputs: true,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "gestures": { "reset_delay": 250 } }"#).unwrap();

        assert_eq!(config.gestures.reset_delay, Duration::from_millis(250));
        assert_eq!(config.gestures.threshold, 60.0);
        assert_eq!(config.analyzer.bar_count, 80);
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.session.max_resume_retries, 3);
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "api": { "base_url": "http://music.test" } }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.api.base_url, "http://music.test");
        assert_eq!(config.analyzer.fft_size, 256);
    }
}
