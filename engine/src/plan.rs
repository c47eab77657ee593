use crate::bbox::BoundingBox;

/// What the renderer should do with the current tick.
///
/// - `Keyframe`: repaint the whole frame at full fidelity.
/// - `NoChange`: repaint nothing; redisplay whatever is already shown.
/// - `Foveated`: cheap pass over the whole frame, then a full-fidelity pass
///   restricted to the box. A degenerate box must be handled as `NoChange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPlan {
    Keyframe,
    NoChange,
    Foveated(BoundingBox),
}

impl RenderPlan {
    /// Short name used in logs and telemetry records.
    pub fn kind(&self) -> &'static str {
        match self {
            RenderPlan::Keyframe => "keyframe",
            RenderPlan::NoChange => "no_change",
            RenderPlan::Foveated(_) => "foveated",
        }
    }

    pub fn bbox(&self) -> Option<&BoundingBox> {
        match self {
            RenderPlan::Foveated(bbox) => Some(bbox),
            _ => None,
        }
    }

    /// Returns true if new pixel data has to reach the display.
    pub fn needs_repaint(&self) -> bool {
        match self {
            RenderPlan::Keyframe => true,
            RenderPlan::NoChange => false,
            RenderPlan::Foveated(bbox) => !bbox.is_degenerate(),
        }
    }
}
