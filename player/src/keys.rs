use chrono::DateTime;
use fovea_engine::Rect;

/// Format a capture time (ms since the epoch, UTC). Out-of-range times
/// collapse to the epoch so keys stay well-formed.
fn utc(ms: i64, pattern: &str) -> String {
    DateTime::from_timestamp_millis(ms)
        .unwrap_or_default()
        .format(pattern)
        .to_string()
}

/// Key for a region handed to the analysis hook.
/// e.g. "regions/2026-02-18/20260218T093000000Z_x120_y64_320x240.jpg"
pub fn region_crop_key(prefix: &str, captured_at_ms: i64, rect: Rect) -> String {
    format!(
        "{prefix}{date}/{ts}_x{x}_y{y}_{w}x{h}.jpg",
        date = utc(captured_at_ms, "%Y-%m-%d"),
        ts = utc(captured_at_ms, "%Y%m%dT%H%M%S%3fZ"),
        x = rect.x,
        y = rect.y,
        w = rect.w,
        h = rect.h,
    )
}

/// File name for the composite written after tick `seq`.
pub fn composite_name(seq: u64) -> String {
    format!("composite_{seq:06}.png")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        // 2025-02-18T09:30:00.000Z
        let ts = 1739871000000i64;
        let rect = Rect { x: 120, y: 64, w: 320, h: 240 };

        let k = region_crop_key("regions/", ts, rect);
        assert_eq!(k, "regions/2025-02-18/20250218T093000000Z_x120_y64_320x240.jpg");
    }

    #[test]
    fn out_of_range_time_falls_back_to_epoch() {
        let rect = Rect { x: 0, y: 0, w: 1, h: 1 };
        let k = region_crop_key("", i64::MAX, rect);
        assert_eq!(k, "1970-01-01/19700101T000000000Z_x0_y0_1x1.jpg");
    }

    #[test]
    fn composite_names_sort_by_tick() {
        assert_eq!(composite_name(7), "composite_000007.png");
        assert!(composite_name(99) < composite_name(100));
    }
}
