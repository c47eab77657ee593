use fovea_common::frame::PixelBuffer;
use tracing::{debug, info};

use crate::diff::compute_diff_with;
use crate::error::EngineError;
use crate::metric::{self, DiffMetric};
use crate::plan::RenderPlan;
use crate::settings::EngineSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    /// No baseline yet. The next frame becomes a keyframe.
    Uninitialized,
    /// Frames are compared against the retained baseline.
    Baselined,
}

/// Keyframe/delta decision for a single stream.
///
/// The retained baseline only moves when a frame actually differed. A
/// `NoChange` tick leaves it where it was, so slow motion that stays under
/// the threshold from one frame to the next still adds up against the old
/// baseline until it crosses the threshold.
///
/// `process` takes `&mut self`: one writer at a time. Callers sharing an
/// instance across tasks must hold one lock around the whole call.
pub struct FrameStateMachine {
    settings: EngineSettings,
    metric: Box<dyn DiffMetric>,
    /// Backing store for the baseline. Kept across `reset()` so the next
    /// keyframe at the same resolution does not allocate.
    baseline: PixelBuffer,
    has_baseline: bool,
}

impl FrameStateMachine {
    pub fn new(settings: EngineSettings) -> Result<Self, EngineError> {
        let metric = metric::from_name(&settings.metric)?;
        Ok(Self::with_metric(settings, metric))
    }

    /// Build with a caller-supplied metric, ignoring `settings.metric`.
    pub fn with_metric(settings: EngineSettings, metric: Box<dyn DiffMetric>) -> Self {
        Self {
            settings,
            metric,
            baseline: PixelBuffer::empty(),
            has_baseline: false,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn state(&self) -> MachineState {
        if self.has_baseline {
            MachineState::Baselined
        } else {
            MachineState::Uninitialized
        }
    }

    /// The frame the next one will be compared against.
    pub fn baseline(&self) -> Option<&PixelBuffer> {
        self.has_baseline.then_some(&self.baseline)
    }

    /// Process one captured frame. This is the main entry point.
    ///
    /// On error the baseline is left exactly as it was.
    pub fn process(&mut self, frame: &PixelBuffer) -> Result<RenderPlan, EngineError> {
        if !self.has_baseline {
            debug!(
                width = frame.width(),
                height = frame.height(),
                "no baseline, capturing keyframe"
            );
            self.baseline.copy_from(frame);
            self.has_baseline = true;
            return Ok(RenderPlan::Keyframe);
        }

        if frame.dimensions() != self.baseline.dimensions() {
            debug!(
                baseline_width = self.baseline.width(),
                baseline_height = self.baseline.height(),
                width = frame.width(),
                height = frame.height(),
                "frame does not match baseline resolution"
            );
            return Err(EngineError::mismatch(
                self.baseline.dimensions(),
                frame.dimensions(),
            ));
        }

        let bbox = compute_diff_with(
            frame,
            &self.baseline,
            self.settings.threshold.get(),
            self.metric.as_ref(),
        )?;

        if !bbox.changed {
            debug!(
                threshold = self.settings.threshold.get(),
                metric = self.metric.name(),
                "no change, baseline kept"
            );
            return Ok(RenderPlan::NoChange);
        }

        debug!(
            min_x = bbox.min_x,
            max_x = bbox.max_x,
            min_y = bbox.min_y,
            max_y = bbox.max_y,
            threshold = self.settings.threshold.get(),
            "changed region found, advancing baseline"
        );
        self.baseline.copy_from(frame);
        Ok(RenderPlan::Foveated(bbox))
    }

    /// Forget the baseline. Call on resolution change or stream restart.
    pub fn reset(&mut self) {
        if self.has_baseline {
            info!(
                width = self.baseline.width(),
                height = self.baseline.height(),
                "baseline dropped, next frame is a keyframe"
            );
        }
        self.has_baseline = false;
    }
}
