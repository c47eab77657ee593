use fovea_common::config::EngineConfig;

use crate::error::EngineError;

/// Per-pixel difference threshold. A pixel counts as changed only when its
/// score is strictly greater than this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Threshold(u8);

impl Threshold {
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Threshold {
    type Error = EngineError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map(Threshold)
            .map_err(|_| EngineError::InvalidThreshold(value))
    }
}

/// Construction-time settings, fixed for the lifetime of a state machine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub threshold: Threshold,
    pub metric: String,
    /// Blur radius in pixels for the degraded pass. The engine never reads
    /// it; it travels with the settings so the renderer sees the same value.
    pub blur_px: f32,
}

impl EngineSettings {
    pub fn new(threshold: i64, blur_px: f32) -> Result<Self, EngineError> {
        Ok(Self {
            threshold: Threshold::try_from(threshold)?,
            metric: "max_channel".into(),
            blur_px,
        })
    }

    /// Validate an `[engine]` config section. The threshold and the metric
    /// name are both checked here, before any frame is seen.
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        crate::metric::from_name(&config.metric)?;
        Ok(Self {
            threshold: Threshold::try_from(config.threshold)?,
            metric: config.metric.clone(),
            blur_px: config.blur_px,
        })
    }
}
