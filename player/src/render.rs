use fovea_common::frame::PixelBuffer;
use fovea_engine::{Rect, RenderPlan};
use image::{imageops, Rgba, RgbaImage};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

use crate::keys::composite_name;

const BORDER_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);

/// What the compositor did for a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Painted {
    /// Whole frame repainted sharp.
    Full,
    /// Nothing new; the cached canvas stays on screen.
    Cached,
    /// Blurred frame with a sharp region pasted on top.
    Foveated(Rect),
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("frame {0}x{1} could not be wrapped as an RGBA image")]
    Buffer(u32, u32),
    #[error("failed to write composite {0}: {1}")]
    Save(String, image::ImageError),
    #[error("compositor task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Compositor shared with the blocking pool.
pub type SharedCompositor = Arc<Mutex<Compositor>>;

/// Software stand-in for the display surface.
///
/// Keeps the last composited canvas so `NoChange` ticks can redisplay it
/// without touching any pixels.
pub struct Compositor {
    blur_px: f32,
    draw_border: bool,
    output_dir: Option<PathBuf>,
    canvas: Option<RgbaImage>,
}

impl Compositor {
    pub fn new(blur_px: f32, draw_border: bool, output_dir: Option<PathBuf>) -> Self {
        Self {
            blur_px,
            draw_border,
            output_dir,
            canvas: None,
        }
    }

    pub fn canvas(&self) -> Option<&RgbaImage> {
        self.canvas.as_ref()
    }

    pub fn shared(self) -> SharedCompositor {
        Arc::new(Mutex::new(self))
    }

    /// Apply one render plan to the canvas. Blocking for foveated plans.
    pub fn apply(&mut self, frame: PixelBuffer, plan: &RenderPlan) -> Result<Painted, RenderError> {
        match plan {
            RenderPlan::Keyframe => {
                self.canvas = Some(to_image(frame)?);
                Ok(Painted::Full)
            }
            RenderPlan::NoChange => Ok(Painted::Cached),
            RenderPlan::Foveated(bbox) => {
                let Some(rect) = bbox.rect() else {
                    debug!("degenerate region, treating as no change");
                    return Ok(Painted::Cached);
                };
                let sharp = to_image(frame)?;

                let mut canvas = if self.blur_px > 0.0 {
                    imageops::blur(&sharp, self.blur_px)
                } else {
                    sharp.clone()
                };
                let region = imageops::crop_imm(&sharp, rect.x, rect.y, rect.w, rect.h).to_image();
                imageops::replace(&mut canvas, &region, rect.x as i64, rect.y as i64);

                if self.draw_border {
                    draw_outline(&mut canvas, rect);
                }

                self.canvas = Some(canvas);
                Ok(Painted::Foveated(rect))
            }
        }
    }

    /// Write the current canvas to the output directory, if one is set.
    pub fn save(&self, seq: u64) -> Result<Option<PathBuf>, RenderError> {
        let (Some(dir), Some(canvas)) = (&self.output_dir, self.canvas()) else {
            return Ok(None);
        };
        if canvas.width() == 0 || canvas.height() == 0 {
            return Ok(None);
        }
        let path = dir.join(composite_name(seq));
        canvas
            .save(&path)
            .map_err(|e| RenderError::Save(path.display().to_string(), e))?;
        Ok(Some(path))
    }
}

/// Composite `frame` and write the result on the blocking pool, so the blur
/// and PNG encode never run on a runtime worker.
pub async fn paint(
    compositor: SharedCompositor,
    frame: PixelBuffer,
    plan: RenderPlan,
    seq: u64,
) -> Result<Painted, RenderError> {
    tokio::task::spawn_blocking(move || {
        // A panic mid-composite leaves at worst a stale canvas.
        let mut c = compositor.lock().unwrap_or_else(PoisonError::into_inner);
        let painted = c.apply(frame, &plan)?;
        if painted != Painted::Cached {
            match c.save(seq) {
                Ok(Some(out)) => debug!(path = %out.display(), "composite written"),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "failed to write composite"),
            }
        }
        Ok(painted)
    })
    .await?
}

fn to_image(frame: PixelBuffer) -> Result<RgbaImage, RenderError> {
    let (width, height) = frame.dimensions();
    RgbaImage::from_raw(width, height, frame.into_bytes()).ok_or(RenderError::Buffer(width, height))
}

/// 1px diagnostic outline along the inside edge of `rect`.
fn draw_outline(canvas: &mut RgbaImage, rect: Rect) {
    let right = rect.x + rect.w - 1;
    let bottom = rect.y + rect.h - 1;
    for x in rect.x..=right {
        canvas.put_pixel(x, rect.y, BORDER_COLOR);
        canvas.put_pixel(x, bottom, BORDER_COLOR);
    }
    for y in rect.y..=bottom {
        canvas.put_pixel(rect.x, y, BORDER_COLOR);
        canvas.put_pixel(right, y, BORDER_COLOR);
    }
}
