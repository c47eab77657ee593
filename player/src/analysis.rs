use fovea_common::config::AnalysisConfig;
use fovea_common::frame::PixelBuffer;
use fovea_engine::{BoundingBox, Rect};
use image::{imageops, DynamicImage, RgbaImage};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::keys::region_crop_key;

/// Lets one call through per `min_interval`.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// Returns `true` and starts a new interval if the previous one is over.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) < self.min_interval {
                return false;
            }
        }
        self.last = Some(now);
        true
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("region {0:?} lies outside the {1}x{2} frame")]
    OutOfBounds(Rect, u32, u32),
    #[error("failed to create {0}: {1}")]
    CreateDir(String, std::io::Error),
    #[error("failed to write crop {0}: {1}")]
    Save(String, image::ImageError),
    #[error("analysis task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A changed region queued for analysis.
pub struct AnalysisRequest {
    pub key: String,
    pub rect: Rect,
    frame: PixelBuffer,
    crops_dir: PathBuf,
}

impl AnalysisRequest {
    /// Cut the region out of the frame and store it under `crops_dir/key`.
    ///
    /// This is where a real model would be called; the crop on disk is the
    /// hand-off point.
    pub async fn submit(self) -> Result<PathBuf, AnalysisError> {
        tokio::task::spawn_blocking(move || {
            let crop = extract_crop(&self.frame, self.rect)?;
            let path = self.crops_dir.join(&self.key);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| AnalysisError::CreateDir(parent.display().to_string(), e))?;
            }
            // JPEG carries no alpha channel.
            DynamicImage::ImageRgba8(crop)
                .to_rgb8()
                .save(&path)
                .map_err(|e| AnalysisError::Save(path.display().to_string(), e))?;
            Ok(path)
        })
        .await?
    }
}

/// Rate-limited hand-off of changed regions to an external analyser.
pub struct AnalysisHook {
    limiter: RateLimiter,
    crops_dir: PathBuf,
    prefix: String,
}

impl AnalysisHook {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            limiter: RateLimiter::new(Duration::from_millis(config.min_interval_ms)),
            crops_dir: config.crops_dir.clone(),
            prefix: config.prefix.clone(),
        }
    }

    /// Build a request for `bbox` unless one went out less than the
    /// minimum interval ago.
    pub fn maybe_analyze(
        &mut self,
        frame: &PixelBuffer,
        bbox: &BoundingBox,
        captured_at_ms: i64,
        now: Instant,
    ) -> Option<AnalysisRequest> {
        let rect = bbox.rect()?;
        if !self.limiter.try_acquire(now) {
            debug!("analysis skipped, interval not elapsed");
            return None;
        }

        let key = region_crop_key(&self.prefix, captured_at_ms, rect);
        info!(
            x = rect.x,
            y = rect.y,
            w = rect.w,
            h = rect.h,
            key,
            "analyzing region"
        );
        Some(AnalysisRequest {
            key,
            rect,
            frame: frame.clone(),
            crops_dir: self.crops_dir.clone(),
        })
    }
}

/// Copy `rect` out of `frame` as an RGBA image.
pub fn extract_crop(frame: &PixelBuffer, rect: Rect) -> Result<RgbaImage, AnalysisError> {
    let (width, height) = frame.dimensions();
    let fits = rect.x.checked_add(rect.w).is_some_and(|r| r <= width)
        && rect.y.checked_add(rect.h).is_some_and(|b| b <= height);
    if !fits {
        return Err(AnalysisError::OutOfBounds(rect, width, height));
    }
    let image = RgbaImage::from_raw(width, height, frame.as_bytes().to_vec())
        .ok_or(AnalysisError::OutOfBounds(rect, width, height))?;
    Ok(imageops::crop_imm(&image, rect.x, rect.y, rect.w, rect.h).to_image())
}
