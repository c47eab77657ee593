use crate::bbox::BoundingBox;
use crate::plan::RenderPlan;

/// Share of the frame, in percent, that does not need a full-fidelity redraw.
///
/// `100 * (1 - bbox_area / frame_area)`, clamped to `0..=100`. Returns `None`
/// for a zero-area frame, where the ratio is undefined.
pub fn savings_percent(bbox: &BoundingBox, frame_width: u32, frame_height: u32) -> Option<f64> {
    let frame_area = frame_width as u64 * frame_height as u64;
    if frame_area == 0 {
        return None;
    }
    let ratio = bbox.area() as f64 / frame_area as f64;
    Some((100.0 * (1.0 - ratio)).clamp(0.0, 100.0))
}

/// Savings for a whole plan: a keyframe saves nothing, an unchanged frame
/// saves everything.
pub fn plan_savings(plan: &RenderPlan, frame_width: u32, frame_height: u32) -> Option<f64> {
    if frame_width == 0 || frame_height == 0 {
        return None;
    }
    match plan {
        RenderPlan::Keyframe => Some(0.0),
        RenderPlan::NoChange => Some(100.0),
        RenderPlan::Foveated(bbox) => savings_percent(bbox, frame_width, frame_height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_of_frame() {
        let bbox = BoundingBox::new(0, 50, 0, 50);
        assert_eq!(savings_percent(&bbox, 100, 100), Some(75.0));
    }

    #[test]
    fn full_frame_saves_nothing() {
        let bbox = BoundingBox::new(0, 100, 0, 100);
        assert_eq!(savings_percent(&bbox, 100, 100), Some(0.0));
    }

    #[test]
    fn oversized_box_is_clamped() {
        let bbox = BoundingBox::new(0, 200, 0, 200);
        assert_eq!(savings_percent(&bbox, 100, 100), Some(0.0));
    }

    #[test]
    fn zero_area_frame_unavailable() {
        let bbox = BoundingBox::unchanged();
        assert_eq!(savings_percent(&bbox, 0, 1080), None);
        assert_eq!(savings_percent(&bbox, 1920, 0), None);
        assert_eq!(plan_savings(&RenderPlan::NoChange, 0, 0), None);
    }

    #[test]
    fn plan_savings_by_kind() {
        assert_eq!(plan_savings(&RenderPlan::Keyframe, 10, 10), Some(0.0));
        assert_eq!(plan_savings(&RenderPlan::NoChange, 10, 10), Some(100.0));
        let plan = RenderPlan::Foveated(BoundingBox::new(1, 2, 1, 2));
        let savings = plan_savings(&plan, 10, 10).unwrap();
        assert!((savings - 99.0).abs() < 1e-9);
    }
}
