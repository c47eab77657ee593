use fovea_common::frame::{PixelBuffer, BYTES_PER_PIXEL};

use crate::bbox::BoundingBox;
use crate::error::EngineError;
use crate::metric::{DiffMetric, MaxChannel};

/// Compare two frames with the default [`MaxChannel`] metric.
///
/// Returns the smallest half-open rectangle enclosing every pixel whose
/// score is strictly greater than `threshold`, or an unchanged box if there
/// is none.
pub fn compute_diff(
    current: &PixelBuffer,
    previous: &PixelBuffer,
    threshold: u8,
) -> Result<BoundingBox, EngineError> {
    compute_diff_with(current, previous, threshold, &MaxChannel)
}

/// Compare two frames under an arbitrary metric.
///
/// Single pass over both buffers, four running extrema, no allocation.
/// Byte-identical rows are skipped with one slice comparison, which is
/// sound because every metric scores identical pixels as 0.
pub fn compute_diff_with<M: DiffMetric + ?Sized>(
    current: &PixelBuffer,
    previous: &PixelBuffer,
    threshold: u8,
    metric: &M,
) -> Result<BoundingBox, EngineError> {
    if current.dimensions() != previous.dimensions() {
        return Err(EngineError::mismatch(
            previous.dimensions(),
            current.dimensions(),
        ));
    }

    if current.is_empty() {
        return Ok(BoundingBox::unchanged());
    }

    let threshold = threshold as u16;
    let mut min_x = u32::MAX;
    let mut max_x = 0u32;
    let mut min_y = u32::MAX;
    let mut max_y = 0u32;

    for (y, (cur_row, prev_row)) in current.rows().zip(previous.rows()).enumerate() {
        if cur_row == prev_row {
            continue;
        }
        let y = y as u32;

        // Leftmost and rightmost changed pixel of this row.
        let mut row_min = u32::MAX;
        let mut row_max = 0u32;
        let pixels = cur_row
            .chunks_exact(BYTES_PER_PIXEL)
            .zip(prev_row.chunks_exact(BYTES_PER_PIXEL));
        for (x, (cur, prev)) in pixels.enumerate() {
            if metric.score(cur, prev) > threshold {
                let x = x as u32;
                if x < row_min {
                    row_min = x;
                }
                row_max = x;
            }
        }

        if row_min == u32::MAX {
            // Row differed, but only below the threshold.
            continue;
        }

        min_x = min_x.min(row_min);
        max_x = max_x.max(row_max);
        if min_y == u32::MAX {
            min_y = y;
        }
        max_y = y;
    }

    if min_y == u32::MAX {
        return Ok(BoundingBox::unchanged());
    }

    // Extrema are inclusive pixel indices; the box is half-open.
    Ok(BoundingBox::new(min_x, max_x + 1, min_y, max_y + 1))
}
