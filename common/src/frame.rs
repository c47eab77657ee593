/// Bytes per pixel in an interleaved RGBA buffer.
pub const BYTES_PER_PIXEL: usize = 4;

/// One captured frame as raw interleaved RGBA bytes (8 bits per channel).
///
/// Layout:
///   [0..4]   pixel (0, 0)  R G B A
///   [4..8]   pixel (1, 0)  R G B A
///   ...
///   row `y` starts at byte `y * width * 4`
///
/// The fields are private so that `data.len() == width * height * 4` holds
/// for every buffer that exists; the constructors are the only way in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes, checking them against the declared resolution.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
        let expected = byte_len(width, height).ok_or(FrameError::TooLarge { width, height })?;
        if data.len() != expected {
            return Err(FrameError::DimensionMismatch {
                width,
                height,
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A frame filled with one RGBA colour.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, FrameError> {
        let len = byte_len(width, height).ok_or(FrameError::TooLarge { width, height })?;
        let data = rgba.iter().copied().cycle().take(len).collect();
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A zero-area frame. Valid input everywhere; it simply never changes.
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            data: Vec::new(),
        }
    }

    // -- Accessors ---------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns true if the frame has no pixels (either side is zero).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Give the bytes back, e.g. to hand them to an image library.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Bytes in one row of pixels.
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Iterate over rows, top to bottom. Yields nothing for an empty frame.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        // chunks_exact panics on a zero chunk size
        self.data.chunks_exact(self.stride().max(1))
    }

    /// RGBA value at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = y as usize * self.stride() + x as usize * BYTES_PER_PIXEL;
        let px = &self.data[i..i + BYTES_PER_PIXEL];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Return a copy with one pixel replaced. Out-of-bounds writes are ignored.
    pub fn with_pixel(mut self, x: u32, y: u32, rgba: [u8; 4]) -> Self {
        if x < self.width && y < self.height {
            let i = y as usize * self.stride() + x as usize * BYTES_PER_PIXEL;
            self.data[i..i + BYTES_PER_PIXEL].copy_from_slice(&rgba);
        }
        self
    }

    // -- Bulk overwrite ----------------------------------------------------------

    /// Overwrite this buffer with the contents of `src`, reusing the existing
    /// allocation. At a stable resolution this is a single `memcpy`; a new
    /// allocation only happens when `src` is larger than the current capacity.
    pub fn copy_from(&mut self, src: &PixelBuffer) {
        if self.data.len() == src.data.len() {
            self.data.copy_from_slice(&src.data);
        } else {
            self.data.clear();
            self.data.extend_from_slice(&src.data);
        }
        self.width = src.width;
        self.height = src.height;
    }
}

impl Default for PixelBuffer {
    fn default() -> Self {
        Self::empty()
    }
}

fn byte_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(BYTES_PER_PIXEL)
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("pixel data is {got} bytes, but {width}x{height} RGBA needs {expected}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        expected: usize,
        got: usize,
    },
    #[error("frame size {width}x{height} overflows the address space")]
    TooLarge { width: u32, height: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_accepts_matching_length() {
        let frame = PixelBuffer::new(2, 3, vec![0; 24]).unwrap();
        assert_eq!(frame.dimensions(), (2, 3));
        assert_eq!(frame.stride(), 8);
        assert_eq!(frame.rows().count(), 3);
    }

    #[test]
    fn new_rejects_wrong_length() {
        let err = PixelBuffer::new(4, 4, vec![0; 63]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::DimensionMismatch {
                expected: 64,
                got: 63,
                ..
            }
        ));
    }

    #[test]
    fn zero_area_is_valid() {
        let frame = PixelBuffer::new(0, 1080, Vec::new()).unwrap();
        assert!(frame.is_empty());
        assert_eq!(frame.rows().count(), 0);
        assert!(frame.pixel(0, 0).is_none());
    }

    #[test]
    fn pixel_access() {
        let frame = PixelBuffer::filled(4, 4, [0, 0, 0, 255])
            .unwrap()
            .with_pixel(1, 2, [255, 0, 0, 255]);
        assert_eq!(frame.pixel(1, 2), Some([255, 0, 0, 255]));
        assert_eq!(frame.pixel(2, 1), Some([0, 0, 0, 255]));
        assert_eq!(frame.pixel(4, 0), None);
    }

    #[test]
    fn copy_from_reuses_allocation() {
        let mut retained = PixelBuffer::filled(8, 8, [1, 2, 3, 4]).unwrap();
        let before = retained.as_bytes().as_ptr();

        let next = PixelBuffer::filled(8, 8, [9, 9, 9, 9]).unwrap();
        retained.copy_from(&next);
        assert_eq!(retained, next);
        assert_eq!(retained.as_bytes().as_ptr(), before);

        // shrinking keeps the old capacity
        let small = PixelBuffer::filled(2, 2, [5, 5, 5, 5]).unwrap();
        retained.copy_from(&small);
        assert_eq!(retained, small);
        assert_eq!(retained.as_bytes().as_ptr(), before);
    }
}
