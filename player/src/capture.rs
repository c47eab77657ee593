use fovea_common::frame::{FrameError, PixelBuffer};
use image::ImageReader;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Image-sequence capture source.
///
/// Frames are the files matching a glob pattern, played back in lexical
/// order. Decoding happens on the blocking pool so the next frame can be
/// decoded while the current one is being processed.
pub struct FrameSource {
    paths: Vec<PathBuf>,
    next: usize,
    loop_playback: bool,
}

/// The next file to capture. `restarted` is set when playback wrapped
/// around, which counts as a stream restart.
#[derive(Debug)]
pub struct NextFrame {
    pub path: PathBuf,
    pub restarted: bool,
}

/// One decoded frame with its capture time.
pub struct CapturedFrame {
    pub path: PathBuf,
    pub frame: PixelBuffer,
    pub captured_at_ms: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("invalid frame pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("no frames match {0}")]
    NoFrames(String),
    #[error("failed to open frame {0}: {1}")]
    Open(String, std::io::Error),
    #[error("failed to decode frame {0}: {1}")]
    Decode(String, image::ImageError),
    #[error("frame {0}: {1}")]
    Frame(String, FrameError),
}

impl FrameSource {
    pub fn from_pattern(pattern: &str, loop_playback: bool) -> Result<Self, CaptureError> {
        // Unreadable entries are skipped; an empty result is reported below.
        let mut paths: Vec<PathBuf> = glob::glob(pattern)?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(CaptureError::NoFrames(pattern.to_string()));
        }

        info!(pattern, frames = paths.len(), loop_playback, "frame source ready");
        Ok(Self::from_paths(paths, loop_playback))
    }

    pub fn from_paths(paths: Vec<PathBuf>, loop_playback: bool) -> Self {
        Self {
            paths,
            next: 0,
            loop_playback,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.paths.len()
    }

    /// Pick the next file to capture, or `None` once playback is over.
    pub fn next_frame(&mut self) -> Option<NextFrame> {
        if self.paths.is_empty() {
            return None;
        }

        let mut restarted = false;
        if self.next >= self.paths.len() {
            if !self.loop_playback {
                return None;
            }
            debug!("end of sequence, looping");
            self.next = 0;
            restarted = true;
        }

        let path = self.paths[self.next].clone();
        self.next += 1;
        Some(NextFrame { path, restarted })
    }
}

/// Decode an image file into an RGBA frame. Blocking.
pub fn decode(path: &Path) -> Result<CapturedFrame, CaptureError> {
    let name = path.display().to_string();
    let img = ImageReader::open(path)
        .map_err(|e| CaptureError::Open(name.clone(), e))?
        .with_guessed_format()
        .map_err(|e| CaptureError::Open(name.clone(), e))?
        .decode()
        .map_err(|e| CaptureError::Decode(name.clone(), e))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let frame =
        PixelBuffer::new(width, height, rgba.into_raw()).map_err(|e| CaptureError::Frame(name, e))?;

    Ok(CapturedFrame {
        path: path.to_path_buf(),
        frame,
        captured_at_ms: chrono::Utc::now().timestamp_millis(),
    })
}

/// Decode on the blocking pool.
pub fn spawn_decode(path: PathBuf) -> JoinHandle<Result<CapturedFrame, CaptureError>> {
    tokio::task::spawn_blocking(move || decode(&path))
}

/// Remembers the last resolution the source produced.
#[derive(Debug, Default)]
pub struct ResolutionWatch {
    last: Option<(u32, u32)>,
}

impl ResolutionWatch {
    /// Returns true if `dims` differs from the previously observed resolution.
    /// The very first observation is not a change.
    pub fn observe(&mut self, dims: (u32, u32)) -> bool {
        let changed = matches!(self.last, Some(prev) if prev != dims);
        self.last = Some(dims);
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("frame_{i:03}.png"))).collect()
    }

    #[test]
    fn plays_once_without_loop() {
        let mut source = FrameSource::from_paths(paths(2), false);
        assert_eq!(source.frame_count(), 2);
        let first = source.next_frame().unwrap();
        assert_eq!(first.path, PathBuf::from("frame_000.png"));
        assert!(!first.restarted);
        assert!(source.next_frame().is_some());
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn looping_flags_restart() {
        let mut source = FrameSource::from_paths(paths(2), true);
        source.next_frame().unwrap();
        source.next_frame().unwrap();
        let wrapped = source.next_frame().unwrap();
        assert!(wrapped.restarted);
        assert_eq!(wrapped.path, PathBuf::from("frame_000.png"));
        assert!(!source.next_frame().unwrap().restarted);
    }

    #[test]
    fn empty_pattern_match_is_an_error() {
        let pattern = std::env::temp_dir()
            .join("fovea-no-such-dir-*")
            .join("*.png");
        assert!(matches!(
            FrameSource::from_pattern(&pattern.to_string_lossy(), false),
            Err(CaptureError::NoFrames(_))
        ));
    }

    #[test]
    fn decode_png_round_trip() {
        let dir = std::env::temp_dir().join(format!("fovea-capture-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("frame.png");

        let mut img = image::RgbaImage::from_pixel(3, 2, image::Rgba([0, 0, 0, 255]));
        img.put_pixel(2, 1, image::Rgba([255, 0, 0, 255]));
        img.save(&path).unwrap();

        let captured = decode(&path).unwrap();
        assert_eq!(captured.frame.dimensions(), (3, 2));
        assert_eq!(captured.frame.pixel(2, 1), Some([255, 0, 0, 255]));
        assert_eq!(captured.frame.pixel(0, 0), Some([0, 0, 0, 255]));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn resolution_watch() {
        let mut watch = ResolutionWatch::default();
        assert!(!watch.observe((4, 4)));
        assert!(!watch.observe((4, 4)));
        assert!(watch.observe((8, 8)));
        assert!(!watch.observe((8, 8)));
    }
}
