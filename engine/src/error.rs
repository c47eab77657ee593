#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error(
        "frame is {got_width}x{got_height}, expected {expected_width}x{expected_height}; \
         reset and resubmit as a keyframe"
    )]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        got_width: u32,
        got_height: u32,
    },
    #[error("diff threshold {0} is outside 0..=255")]
    InvalidThreshold(i64),
    #[error("unknown diff metric {0:?}, expected 'max_channel', 'sum' or 'luma'")]
    UnknownMetric(String),
}

impl EngineError {
    pub(crate) fn mismatch(expected: (u32, u32), got: (u32, u32)) -> Self {
        Self::DimensionMismatch {
            expected_width: expected.0,
            expected_height: expected.1,
            got_width: got.0,
            got_height: got.1,
        }
    }
}
