use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    pub capture: CaptureConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Construction-time engine settings. Fixed for the lifetime of an engine.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Per-pixel difference threshold. Kept wide here so that out-of-range
    /// values reach the engine and are rejected there with a proper error.
    #[serde(default = "default_threshold")]
    pub threshold: i64,
    #[serde(default = "default_metric")]
    pub metric: String,
    /// Blur radius for the degraded full-frame pass. Presentation only.
    #[serde(default = "default_blur_px")]
    pub blur_px: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    /// Glob matching the frame images, played back in lexical order.
    pub pattern: String,
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default)]
    pub loop_playback: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    /// Where composited frames are written. Nothing is written when unset.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default = "default_draw_border")]
    pub draw_border: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_analysis_enabled")]
    pub enabled: bool,
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_crops_dir")]
    pub crops_dir: PathBuf,
    #[serde(default = "default_crops_prefix")]
    pub prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// JSON-lines file receiving one record per tick.
    #[serde(default)]
    pub stats_path: Option<PathBuf>,
    /// JSON file rewritten with the running totals at every summary.
    #[serde(default)]
    pub summary_path: Option<PathBuf>,
    #[serde(default = "default_summary_every")]
    pub summary_every: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            metric: default_metric(),
            blur_px: default_blur_px(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            draw_border: default_draw_border(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enabled: default_analysis_enabled(),
            min_interval_ms: default_min_interval_ms(),
            crops_dir: default_crops_dir(),
            prefix: default_crops_prefix(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            stats_path: None,
            summary_path: None,
            summary_every: default_summary_every(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that only make sense on the player side. Engine settings
    /// (threshold, metric) are validated by the engine itself.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.capture.fps.is_finite() && self.capture.fps > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "capture.fps must be positive, got {}",
                self.capture.fps
            )));
        }
        if !(self.engine.blur_px.is_finite() && self.engine.blur_px >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "engine.blur_px must be non-negative, got {}",
                self.engine.blur_px
            )));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_threshold() -> i64 {
    30
}
fn default_metric() -> String {
    "max_channel".into()
}
fn default_blur_px() -> f32 {
    8.0
}
fn default_fps() -> f64 {
    30.0
}
fn default_draw_border() -> bool {
    true
}
fn default_analysis_enabled() -> bool {
    true
}
fn default_min_interval_ms() -> u64 {
    2000
}
fn default_crops_dir() -> PathBuf {
    PathBuf::from("crops")
}
fn default_crops_prefix() -> String {
    "regions/".into()
}
fn default_summary_every() -> u64 {
    100
}
fn default_log_level() -> String {
    "info".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = Config::parse("[capture]\npattern = \"frames/*.png\"\n").unwrap();
        assert_eq!(config.capture.pattern, "frames/*.png");
        assert_eq!(config.capture.fps, 30.0);
        assert!(!config.capture.loop_playback);
        assert_eq!(config.engine.threshold, 30);
        assert_eq!(config.engine.metric, "max_channel");
        assert_eq!(config.engine.blur_px, 8.0);
        assert_eq!(config.analysis.min_interval_ms, 2000);
        assert!(config.render.output_dir.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn out_of_range_threshold_still_parses() {
        let config = Config::parse(
            "[engine]\nthreshold = 300\n\n[capture]\npattern = \"*.png\"\n",
        )
        .unwrap();
        assert_eq!(config.engine.threshold, 300);
    }

    #[test]
    fn missing_capture_section_is_an_error() {
        assert!(matches!(
            Config::parse("[engine]\nthreshold = 10\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn non_positive_fps_rejected() {
        let err = Config::parse("[capture]\npattern = \"*.png\"\nfps = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
