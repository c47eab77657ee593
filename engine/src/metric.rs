use crate::error::EngineError;

/// Per-pixel difference scoring.
///
/// Implementations receive the RGBA bytes of the same pixel in the current
/// and previous frame and return a score that is compared against the
/// threshold. Two rules every metric must follow:
///
/// - identical pixels score 0;
/// - a strictly larger per-channel delta never lowers the score.
///
/// The diff loop relies on the first rule to skip identical rows wholesale.
pub trait DiffMetric: Send + Sync {
    fn score(&self, current: &[u8], previous: &[u8]) -> u16;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

#[inline(always)]
fn deltas(current: &[u8], previous: &[u8]) -> [u16; 3] {
    [
        current[0].abs_diff(previous[0]) as u16,
        current[1].abs_diff(previous[1]) as u16,
        current[2].abs_diff(previous[2]) as u16,
    ]
}

/// Largest absolute delta across R, G and B. Alpha is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxChannel;

impl DiffMetric for MaxChannel {
    #[inline]
    fn score(&self, current: &[u8], previous: &[u8]) -> u16 {
        let [r, g, b] = deltas(current, previous);
        r.max(g).max(b)
    }

    fn name(&self) -> &str {
        "max_channel"
    }
}

/// Sum of absolute R, G and B deltas (0..=765).
#[derive(Debug, Clone, Copy, Default)]
pub struct SumChannel;

impl DiffMetric for SumChannel {
    #[inline]
    fn score(&self, current: &[u8], previous: &[u8]) -> u16 {
        let [r, g, b] = deltas(current, previous);
        r + g + b
    }

    fn name(&self) -> &str {
        "sum"
    }
}

/// BT.601-weighted sum of absolute channel deltas, in 0..=255.
///
/// Weighting the deltas rather than taking the delta of two luma values keeps
/// the metric monotonic: opposite-signed channel changes cannot cancel out.
#[derive(Debug, Clone, Copy, Default)]
pub struct Luma;

impl DiffMetric for Luma {
    #[inline]
    fn score(&self, current: &[u8], previous: &[u8]) -> u16 {
        let [r, g, b] = deltas(current, previous);
        let weighted = 299 * r as u32 + 587 * g as u32 + 114 * b as u32;
        (weighted / 1000) as u16
    }

    fn name(&self) -> &str {
        "luma"
    }
}

/// Look up a metric by its configuration name.
pub fn from_name(name: &str) -> Result<Box<dyn DiffMetric>, EngineError> {
    match name {
        "max_channel" => Ok(Box::new(MaxChannel)),
        "sum" => Ok(Box::new(SumChannel)),
        "luma" => Ok(Box::new(Luma)),
        other => Err(EngineError::UnknownMetric(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: [u8; 4] = [0, 0, 0, 255];

    fn all() -> Vec<Box<dyn DiffMetric>> {
        vec![Box::new(MaxChannel), Box::new(SumChannel), Box::new(Luma)]
    }

    #[test]
    fn identical_pixels_score_zero() {
        for metric in all() {
            assert_eq!(metric.score(&BLACK, &BLACK), 0, "{}", metric.name());
            assert_eq!(metric.score(&[12, 200, 7, 0], &[12, 200, 7, 0]), 0);
        }
    }

    #[test]
    fn alpha_is_ignored() {
        for metric in all() {
            assert_eq!(metric.score(&[0, 0, 0, 0], &BLACK), 0, "{}", metric.name());
        }
    }

    #[test]
    fn larger_delta_never_scores_lower() {
        for metric in all() {
            let mut last = 0;
            for v in 0..=255u8 {
                let s = metric.score(&[v, v / 2, 0, 255], &BLACK);
                assert!(s >= last, "{} dropped at {v}", metric.name());
                last = s;
            }
        }
    }

    #[test]
    fn red_pixel_scores() {
        let red = [255, 0, 0, 255];
        assert_eq!(MaxChannel.score(&red, &BLACK), 255);
        assert_eq!(SumChannel.score(&red, &BLACK), 255);
        assert_eq!(Luma.score(&red, &BLACK), 76);
        assert_eq!(SumChannel.score(&[255, 255, 255, 255], &BLACK), 765);
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(from_name("luma").unwrap().name(), "luma");
        assert_eq!(from_name("sum").unwrap().name(), "sum");
        assert_eq!(
            from_name("ssim").err(),
            Some(EngineError::UnknownMetric("ssim".into()))
        );
    }
}
